//! Barre d'URL — résolution de la saisie utilisateur.
//!
//! Transforme le texte tapé dans la barre en URL à charger, selon les
//! réglages du profil :
//!
//! - saisie commençant par `https://` → chargée telle quelle ;
//! - sinon, si `treat_bare_text_as_search` → recherche sur le moteur configuré ;
//! - sinon → `https://` est ajouté devant.
//!
//! Aucune dépendance graphique — ce module est purement logique.

use tracing::warn;
use url::Url;

use crate::profile::BrowserConfig;

/// Page d'accueil quand le profil n'en définit pas.
pub const DEFAULT_HOME_URL: &str = "https://zeropointnothing.github.io";

/// Moteurs de recherche connus : (identifiant, préfixe de requête).
const SEARCH_ENGINES: &[(&str, &str)] = &[
    ("google", "https://www.google.com/search?q="),
    ("duckduckgo", "https://duckduckgo.com/?q="),
    ("bing", "https://www.bing.com/search?q="),
];

/// Préfixe de requête pour un identifiant de moteur.
///
/// Un identifiant inconnu retombe sur `google`.
pub fn search_prefix(engine: &str) -> &'static str {
    SEARCH_ENGINES
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(engine))
        .map(|(_, prefix)| *prefix)
        .unwrap_or_else(|| {
            warn!(engine, "Moteur de recherche inconnu, utilisation de google");
            SEARCH_ENGINES[0].1
        })
}

/// URL de la page d'accueil du profil.
pub fn home_url(config: &BrowserConfig) -> &str {
    config
        .home_url
        .as_deref()
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_HOME_URL)
}

/// Résout la saisie de la barre d'URL. `None` si la saisie est vide ou
/// ne donne pas une URL valide.
pub fn resolve_input(input: &str, config: &BrowserConfig) -> Option<Url> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.starts_with("https://") {
        return Url::parse(input).ok();
    }

    let candidate = if config.treat_bare_text_as_search {
        let encoded: String = url::form_urlencoded::byte_serialize(input.as_bytes()).collect();
        format!("{}{encoded}", search_prefix(&config.search_engine))
    } else {
        format!("https://{input}")
    };
    Url::parse(&candidate).ok()
}
