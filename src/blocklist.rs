//! Liste de motifs bloqués (correspondance par sous-chaîne littérale).
//!
//! Un motif est un fragment de texte brut : nom d'hôte complet ou partiel,
//! chemin, ou jeton de marqueur DOM utilisé historiquement comme fragment
//! d'URL. Pas de jokers, pas d'expressions régulières, pas de normalisation
//! (casse, schéma) : une URL est bloquée si elle *contient* un motif.
//!
//! La liste intégrée ([`BUILTIN_PATTERNS`]) est complétée au démarrage par
//! la liste utilisateur persistée dans le profil (`bl.json`).

use thiserror::Error;
use tracing::debug;

/// Motifs compilés dans le binaire.
pub const BUILTIN_PATTERNS: &[&str] = &[
    "tpc.googlesyndication.com/simgad/",
    "adclick.g.doubleclick.net/",
    "googleads.g.doubleclick.net",
    "https://s0.2mdn.net/simgad/",
    "https://static.pc-adroute",
    "adroute",
    "https://img.gsspat.jp",
    "ezoic",
    "google_image",
    "ad_unit",
    "google_image_div",
    "GoogleActiveViewElement",
    "amznBanners_assoc_banner",
    "google_ads",
    "gnpbad_",
];

/// Erreur de construction de la liste.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlocklistError {
    /// Un motif vide correspondrait à toutes les URLs.
    #[error("empty blocklist pattern at position {index}")]
    EmptyPattern { index: usize },
}

/// Ensemble immuable de motifs : liste intégrée suivie de la liste utilisateur.
///
/// Les doublons sont tolérés — la correspondance est un OU booléen sur
/// tous les motifs, l'ordre d'insertion n'a pas de poids sémantique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlocklistSet {
    patterns: Vec<String>,
}

impl BlocklistSet {
    /// Construit l'ensemble à partir de la liste intégrée et d'une liste
    /// supplémentaire optionnelle, ajoutée *entrée par entrée* à la suite.
    ///
    /// Rejette tout motif de longueur nulle.
    pub fn build<B, E>(builtin: B, extra: Option<E>) -> Result<Self, BlocklistError>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let mut patterns: Vec<String> = builtin.into_iter().map(Into::into).collect();
        let builtin_len = patterns.len();
        if let Some(extra) = extra {
            patterns.extend(extra.into_iter().map(Into::into));
        }

        if let Some(index) = patterns.iter().position(String::is_empty) {
            return Err(BlocklistError::EmptyPattern { index });
        }

        debug!(
            builtin = builtin_len,
            extra = patterns.len() - builtin_len,
            "Blocklist construite"
        );
        Ok(Self { patterns })
    }

    /// Liste intégrée seule.
    pub fn builtin() -> Self {
        Self {
            patterns: BUILTIN_PATTERNS.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    /// Premier motif contenu dans `url`, s'il y en a un.
    pub fn first_match(&self, url: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| url.contains(p.as_str()))
            .map(String::as_str)
    }

    /// `true` si au moins un motif est une sous-chaîne littérale de `url`.
    pub fn matches(&self, url: &str) -> bool {
        self.first_match(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }
}
