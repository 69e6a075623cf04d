//! Point d'entrée de Navalii.
//!
//! Usage :
//!   navalii
//!
//! Au premier lancement, l'assistant crée le profil dans le dossier configuré
//! (`[profile] dir` de `navalii.toml`, par défaut le répertoire courant).
//! Ensuite chaque ligne saisie est traitée comme une entrée de barre d'URL.
//!
//! Codes de sortie : 0 fermeture normale, 2 mot de passe refusé,
//! 3 profil incomplet, 4 profil illisible, 5 erreur d'E/S,
//! 6 motif vide dans la liste, 7 saisie interrompue.

use std::io;
use std::process::ExitCode;

use tracing::{error, info};

use navalii::auth::AuthError;
use navalii::bootstrap::{BootstrapCoordinator, BootstrapError};
use navalii::config::Config;
use navalii::logging;
use navalii::profile::ProfileStore;
use navalii::prompt::{Console, Prompter};
use navalii::surface::{ConsoleSurface, Navigator, run_console};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    // ── 1. Logging / Tracing ───────────────────────────────────────────
    // Installé avant la lecture des réglages pour que leurs erreurs soient
    // journalisées ; le filtre `[logging]` est appliqué ensuite.
    let log = logging::init();

    // ── 2. Réglages applicatifs ────────────────────────────────────────
    let (config, config_path) = Config::load();
    log.apply(&config.logging);

    info!(
        version = VERSION,
        config = ?config_path,
        profile_dir = %config.profile.dir.display(),
        "Démarrage de Navalii"
    );

    // ── 3. Amorçage : profil → authentification → moteur de filtrage ──
    let mut console = Console::stdio();
    let mut coordinator = BootstrapCoordinator::new(ProfileStore::new(&config.profile.dir))
        .with_audit_log(config.privacy.audit_log.clone());

    let session = match coordinator.run(&mut console) {
        Ok(session) => session,
        Err(e) => return report(&e),
    };

    let greeting = format!(
        "Welcome to Navalii, {}!\nRunning version v{VERSION}",
        session.account.name
    );
    if let Err(e) = console.notice(&greeting) {
        error!(error = %e, "Console indisponible");
        return ExitCode::from(7);
    }

    // ── 4. Surface de rendu ────────────────────────────────────────────
    let mut navigator = Navigator::new(&session, ConsoleSurface::new(io::stdout()));
    match run_console(&mut navigator, &mut console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Console interrompue");
            ExitCode::from(5)
        }
    }
}

/// Frontière d'erreur unique : message lisible + code par type d'erreur.
fn report(e: &BootstrapError) -> ExitCode {
    error!(kind = e.kind(), error = %e, "Échec de l'amorçage");
    if matches!(e, BootstrapError::Auth(AuthError::Mismatch)) {
        eprintln!("Incorrect password!");
    } else {
        eprintln!("{}: {e}", e.kind());
    }
    ExitCode::from(e.exit_code())
}
