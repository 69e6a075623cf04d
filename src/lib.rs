//! # Navalii — shell de navigation à profil local
//!
//! Le rendu, l'exécution JavaScript et les cookies sont délégués à un moteur
//! externe. Ce crate fournit ce qui se passe *avant* et *autour* du rendu :
//! l'amorçage d'un profil protégé et la décision de filtrage de chaque requête.
//!
//! ## Architecture des modules
//!
//! - [`blocklist`] : ensemble immuable de motifs (sous-chaînes littérales),
//!   liste intégrée + liste utilisateur.
//!
//! - [`privacy`] : moteur de filtrage — `decide(url) → Verdict`, enregistrements
//!   d'audit pour chaque blocage. Sans verrou, appelable depuis plusieurs threads.
//!
//! - [`profile`] : enregistrements persistés (`nava.json`, `config.json`,
//!   `bl.json`), création au premier lancement, écritures atomiques.
//!
//! - [`auth`] : empreinte SHA-256 du mot de passe et vérification à temps constant.
//!
//! - [`bootstrap`] : machine à états du démarrage, produit la [`bootstrap::Session`].
//!
//! - [`prompt`] : assistant de premier lancement et saisie du mot de passe.
//!
//! - [`urlbar`] : résolution de la saisie (adresse ou recherche) et page d'accueil.
//!
//! - [`surface`] : contrat avec le moteur de rendu et surface console.
//!
//! - [`config`] : réglages applicatifs TOML (emplacement du profil, journal d'audit).
//!
//! - [`logging`] : installation du subscriber `tracing`, filtre rechargeable.

pub mod auth;
pub mod blocklist;
pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod privacy;
pub mod profile;
pub mod prompt;
pub mod surface;
pub mod urlbar;
