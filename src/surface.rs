//! Couche d'intégration entre la session et la surface de rendu.
//!
//! Le moteur de rendu est un collaborateur opaque : il sait charger une URL
//! et appelle un hook pour chaque requête sortante. Ce module contient :
//!
//! 1. **[`RenderingSurface`]** : le contrat minimal attendu du moteur.
//! 2. **[`Navigator`]** : reçoit la [`Session`] une fois au démarrage,
//!    résout la saisie de la barre d'URL et fait passer chaque destination
//!    par le [`FilteringEngine`](crate::privacy::FilteringEngine).
//! 3. **[`ConsoleSurface`]** / [`run_console`] : surface textuelle utilisée
//!    par le binaire — une ligne lue = une saisie dans la barre d'URL.

use std::io::{self, BufRead, Write};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::bootstrap::Session;
use crate::privacy::{PLACEHOLDER_URL, Verdict};
use crate::prompt::Console;
use crate::urlbar;

/// Ce que le cœur demande au moteur de rendu.
pub trait RenderingSurface {
    /// Charge `url` dans la vue principale.
    fn load(&mut self, url: &Url);
}

/// Pont entre la session authentifiée et la surface de rendu.
pub struct Navigator<'s, S> {
    session: &'s Session,
    surface: S,
    current_url: Option<Url>,
}

impl<'s, S: RenderingSurface> Navigator<'s, S> {
    pub fn new(session: &'s Session, surface: S) -> Self {
        Self {
            session,
            surface,
            current_url: None,
        }
    }

    /// Hook d'interception : destination effective d'une requête sortante.
    ///
    /// Le moteur ne termine jamais partiellement une requête bloquée, il
    /// charge le substitut neutre à la place.
    pub fn intercept<'u>(&self, request_url: &'u str) -> &'u str {
        self.session.engine.decide(request_url).destination(request_url)
    }

    /// Retour à la page d'accueil du profil. `None` si l'adresse enregistrée
    /// dans le profil n'est pas une URL valide.
    pub fn home(&mut self) -> Option<Verdict> {
        let session = self.session;
        let home = urlbar::home_url(&session.config);
        match Url::parse(home) {
            Ok(url) => self.open(url),
            Err(e) => {
                warn!(home, error = %e, "Page d'accueil invalide");
                None
            }
        }
    }

    /// Saisie dans la barre d'URL. `None` si la saisie ne donne rien de chargeable.
    pub fn navigate(&mut self, input: &str) -> Option<Verdict> {
        let url = urlbar::resolve_input(input, &self.session.config)?;
        self.open(url)
    }

    fn open(&mut self, url: Url) -> Option<Verdict> {
        let verdict = self.session.engine.decide(url.as_str());
        debug!(url = %url, %verdict, "Navigation");
        let destination = match verdict {
            Verdict::Allow => url,
            Verdict::Block => match Url::parse(PLACEHOLDER_URL) {
                Ok(placeholder) => placeholder,
                Err(e) => {
                    error!(error = %e, "Substitut illisible, chargement annulé");
                    return Some(verdict);
                }
            },
        };
        self.surface.load(&destination);
        self.current_url = Some(destination);
        Some(verdict)
    }

    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    pub fn bookmarks(&self) -> &[String] {
        &self.session.account.bookmarks
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

/// Surface textuelle : affiche chaque URL chargée.
pub struct ConsoleSurface<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderingSurface for ConsoleSurface<W> {
    fn load(&mut self, url: &Url) {
        // Sortie best-effort : la console n'a pas de canal d'erreur.
        let _ = writeln!(self.out, "→ {url}").and_then(|()| self.out.flush());
    }
}

/// Boucle de la surface console.
///
/// Les lignes sont lues sur la même [`Console`] que l'amorçage.
/// Commandes : `:home`, `:bookmarks`, `:quit`. Toute autre ligne est une
/// saisie de barre d'URL. Se termine sur `:quit` ou fin d'entrée.
pub fn run_console<R, P, W>(
    navigator: &mut Navigator<'_, ConsoleSurface<W>>,
    console: &mut Console<R, P>,
) -> io::Result<()>
where
    R: BufRead,
    P: Write,
    W: Write,
{
    navigator.home();

    while let Some(line) = console.next_line()? {
        match line.as_str() {
            "" => continue,
            ":quit" => break,
            ":home" => {
                navigator.home();
            }
            ":bookmarks" => {
                let bookmarks = navigator.bookmarks().to_vec();
                let out = &mut navigator.surface_mut().out;
                if bookmarks.is_empty() {
                    writeln!(out, "(no bookmarks)")?;
                }
                for bookmark in bookmarks {
                    writeln!(out, "* {bookmark}")?;
                }
            }
            text => {
                if navigator.navigate(text).is_none() {
                    writeln!(navigator.surface_mut().out, "Cannot open {text:?}")?;
                }
            }
        }
    }

    info!("Fermeture de la session");
    Ok(())
}
