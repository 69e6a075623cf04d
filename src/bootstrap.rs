//! Startup sequence: profile → login → filtering engine → session.
//!
//! ```text
//! Uninitialized ─(no profile)→ Creating → Created ─┐
//!       │                                           ├─(password?)→ AwaitingSecret → Authenticated | Rejected
//!       └────────(profile found)────────────────────┘                 (no password) → Authenticated
//! Authenticated → Ready
//! ```
//!
//! Runs once, single-threaded, before any request is filtered. Failures are
//! returned as [`BootstrapError`]; the process entry point is the only place
//! that turns them into an exit code.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{self, AuthError};
use crate::blocklist::{BUILTIN_PATTERNS, BlocklistError, BlocklistSet};
use crate::privacy::{FilteringEngine, WriterAuditSink};
use crate::profile::{AccountRecord, BrowserConfig, ProfileError, ProfileStore};
use crate::prompt::Prompter;

/// Position in the startup state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Creating,
    Created,
    AwaitingSecret,
    Authenticated,
    Rejected,
    Ready,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("ConfigError::EmptyPattern: {0}")]
    Blocklist(#[from] BlocklistError),

    #[error("cannot open audit log {}: {source}", path.display())]
    AuditLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("console prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

impl BootstrapError {
    /// Taxonomy name printed at the process boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            BootstrapError::Profile(e) => e.kind(),
            BootstrapError::Auth(AuthError::Mismatch) => "AuthError::Mismatch",
            BootstrapError::Auth(AuthError::Prompt(_)) | BootstrapError::Prompt(_) => "Prompt",
            BootstrapError::Blocklist(BlocklistError::EmptyPattern { .. }) => {
                "ConfigError::EmptyPattern"
            }
            BootstrapError::AuditLog { .. } => "Io",
        }
    }

    /// Process exit code for this failure. Success is 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            BootstrapError::Auth(AuthError::Mismatch) => 2,
            BootstrapError::Profile(ProfileError::InconsistentState { .. })
            | BootstrapError::Profile(ProfileError::AlreadyExists { .. }) => 3,
            BootstrapError::Profile(ProfileError::CorruptData { .. }) => 4,
            BootstrapError::Profile(ProfileError::NotFound { .. })
            | BootstrapError::Profile(ProfileError::Io { .. })
            | BootstrapError::AuditLog { .. } => 5,
            BootstrapError::Blocklist(_) => 6,
            BootstrapError::Profile(ProfileError::EmptyName)
            | BootstrapError::Auth(AuthError::Prompt(_))
            | BootstrapError::Prompt(_) => 7,
        }
    }
}

/// Authenticated, ready-to-browse state. Never persisted.
#[derive(Debug)]
pub struct Session {
    pub account: AccountRecord,
    pub config: BrowserConfig,
    /// Shared with the request-interception callbacks.
    pub engine: Arc<FilteringEngine>,
    pub authenticated_at: SystemTime,
}

pub struct BootstrapCoordinator {
    store: ProfileStore,
    audit_log: Option<PathBuf>,
    state: BootstrapState,
}

impl BootstrapCoordinator {
    pub fn new(store: ProfileStore) -> Self {
        Self {
            store,
            audit_log: None,
            state: BootstrapState::Uninitialized,
        }
    }

    /// Also append audit records to `path`.
    pub fn with_audit_log(mut self, path: Option<PathBuf>) -> Self {
        self.audit_log = path;
        self
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    fn transition(&mut self, next: BootstrapState) {
        debug!(from = ?self.state, to = ?next, "Bootstrap");
        self.state = next;
    }

    /// Runs the whole startup sequence.
    pub fn run<P: Prompter>(&mut self, prompter: &mut P) -> Result<Session, BootstrapError> {
        let (account, config) = match self.store.load() {
            Ok(profile) => profile,
            Err(ProfileError::NotFound { .. }) => {
                self.transition(BootstrapState::Creating);
                let answers = prompter.first_run().map_err(BootstrapError::Prompt)?;
                let profile = self
                    .store
                    .create(&answers.name, answers.secret.as_deref())?;
                self.transition(BootstrapState::Created);
                prompter
                    .notice(&format!("Done! Welcome, {}, to your Navalii.", answers.name))
                    .map_err(BootstrapError::Prompt)?;
                profile
            }
            Err(e) => return Err(e.into()),
        };

        if account.credential_hash.is_some() {
            self.transition(BootstrapState::AwaitingSecret);
        }
        let grant = match auth::authenticate(&account, || prompter.secret()) {
            Ok(grant) => grant,
            Err(e) => {
                if matches!(e, AuthError::Mismatch) {
                    self.transition(BootstrapState::Rejected);
                }
                return Err(e.into());
            }
        };
        self.transition(BootstrapState::Authenticated);

        let engine = self.build_engine(&config)?;
        self.transition(BootstrapState::Ready);
        info!(
            user = %account.name,
            filtering = config.filtering_enabled,
            "Session ready"
        );

        Ok(Session {
            account,
            config,
            engine: Arc::new(engine),
            authenticated_at: grant.authenticated_at,
        })
    }

    /// Built-in list, plus the profile's `bl.json` when filtering is on.
    fn build_engine(&self, config: &BrowserConfig) -> Result<FilteringEngine, BootstrapError> {
        let extra = if config.filtering_enabled {
            self.store.load_extra_blocklist()?
        } else {
            Vec::new()
        };
        let blocklist = BlocklistSet::build(BUILTIN_PATTERNS.iter().copied(), Some(extra))?;
        let mut engine = FilteringEngine::new(blocklist, config.filtering_enabled);

        if let Some(ref path) = self.audit_log {
            let sink = WriterAuditSink::append_to(path).map_err(|source| {
                BootstrapError::AuditLog {
                    path: path.clone(),
                    source,
                }
            })?;
            engine = engine.with_sink(sink);
        }
        Ok(engine)
    }
}
