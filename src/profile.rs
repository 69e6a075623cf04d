//! Persisted single-user profile.
//!
//! A profile is two JSON records living side by side in one directory:
//!
//! - `nava.json` — the account (`{"user": {"name", "password", "bookmarks"}}`)
//! - `config.json` — browser settings (`{"browser": {...}}`)
//!
//! plus an optional user blocklist `bl.json` (a flat array of patterns).
//!
//! Both records must be present for the profile to load. One without the
//! other is reported as [`ProfileError::InconsistentState`]; nothing here
//! ever regenerates or repairs a record that exists on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::auth;

pub const ACCOUNT_FILE_NAME: &str = "nava.json";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const BLOCKLIST_FILE_NAME: &str = "bl.json";

/// Search engine written into a freshly created profile.
pub const DEFAULT_SEARCH_ENGINE: &str = "google";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("NotFound: no profile in {}", dir.display())]
    NotFound { dir: PathBuf },

    #[error("InconsistentState: {} exists but {} is missing", present.display(), missing.display())]
    InconsistentState { present: PathBuf, missing: PathBuf },

    #[error("CorruptData: {}: {reason}", path.display())]
    CorruptData { path: PathBuf, reason: String },

    #[error("profile already exists in {}", dir.display())]
    AlreadyExists { dir: PathBuf },

    #[error("profile name must not be empty")]
    EmptyName,

    #[error("Io: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProfileError {
    /// Taxonomy name shown to operators.
    pub fn kind(&self) -> &'static str {
        match self {
            ProfileError::NotFound { .. } => "NotFound",
            ProfileError::InconsistentState { .. } => "InconsistentState",
            ProfileError::CorruptData { .. } => "CorruptData",
            ProfileError::AlreadyExists { .. } => "AlreadyExists",
            ProfileError::EmptyName => "EmptyName",
            ProfileError::Io { .. } => "Io",
        }
    }
}

/// Local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub name: String,
    /// Hex SHA-256 of the secret; `None` means no login is required.
    #[serde(rename = "password")]
    pub credential_hash: Option<String>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
}

/// Browser settings stored in the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Falls back to [`crate::urlbar::DEFAULT_HOME_URL`] when absent.
    #[serde(rename = "home")]
    pub home_url: Option<String>,
    #[serde(rename = "s-engine")]
    pub search_engine: String,
    #[serde(rename = "default_search-non-valid")]
    pub treat_bare_text_as_search: bool,
    #[serde(rename = "default_block-ad-urls")]
    pub filtering_enabled: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            home_url: None,
            search_engine: DEFAULT_SEARCH_ENGINE.to_string(),
            treat_bare_text_as_search: true,
            filtering_enabled: false,
        }
    }
}

// On-disk envelopes: each record is nested under a single top-level key.

#[derive(Serialize, Deserialize)]
struct AccountEnvelope {
    user: AccountRecord,
}

#[derive(Serialize, Deserialize)]
struct ConfigEnvelope {
    browser: BrowserConfig,
}

/// Reads and writes the profile records in a fixed directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn account_path(&self) -> PathBuf {
        self.dir.join(ACCOUNT_FILE_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    pub fn blocklist_path(&self) -> PathBuf {
        self.dir.join(BLOCKLIST_FILE_NAME)
    }

    /// `Ok(true)` if both records exist, `Ok(false)` if neither does.
    ///
    /// # Errors
    ///
    /// [`ProfileError::InconsistentState`] when only one of them is present.
    pub fn exists(&self) -> Result<bool, ProfileError> {
        let account = self.account_path();
        let config = self.config_path();
        match (account.is_file(), config.is_file()) {
            (true, true) => Ok(true),
            (false, false) => Ok(false),
            (true, false) => Err(ProfileError::InconsistentState {
                present: account,
                missing: config,
            }),
            (false, true) => Err(ProfileError::InconsistentState {
                present: config,
                missing: account,
            }),
        }
    }

    /// Loads both records.
    ///
    /// # Errors
    ///
    /// - [`ProfileError::NotFound`] if neither record exists
    /// - [`ProfileError::InconsistentState`] if exactly one exists
    /// - [`ProfileError::CorruptData`] if a record does not parse
    pub fn load(&self) -> Result<(AccountRecord, BrowserConfig), ProfileError> {
        if !self.exists()? {
            return Err(ProfileError::NotFound {
                dir: self.dir.clone(),
            });
        }

        let account_path = self.account_path();
        let AccountEnvelope { user: account } = read_json(&account_path)?;
        validate_account(&account).map_err(|reason| ProfileError::CorruptData {
            path: account_path.clone(),
            reason,
        })?;

        let ConfigEnvelope { browser: config } = read_json(&self.config_path())?;

        info!(dir = %self.dir.display(), user = %account.name, "Profile loaded");
        Ok((account, config))
    }

    /// First-run creation: builds both records, writes them, returns them.
    ///
    /// An empty `secret` is treated like `None`. Each record is written to a
    /// temporary file and renamed into place, so a crash never leaves a
    /// half-written record behind. The config is written first: an
    /// interrupted creation shows up as `InconsistentState`, never as a
    /// loadable account without settings.
    pub fn create(
        &self,
        name: &str,
        secret: Option<&str>,
    ) -> Result<(AccountRecord, BrowserConfig), ProfileError> {
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if self.account_path().exists() || self.config_path().exists() {
            return Err(ProfileError::AlreadyExists {
                dir: self.dir.clone(),
            });
        }

        let account = AccountRecord {
            name: name.to_owned(),
            credential_hash: secret.filter(|s| !s.is_empty()).map(auth::credential_hash),
            bookmarks: Vec::new(),
        };
        let config = BrowserConfig::default();

        fs::create_dir_all(&self.dir).map_err(|source| ProfileError::Io {
            path: self.dir.clone(),
            source,
        })?;
        write_json_atomic(
            &self.config_path(),
            &ConfigEnvelope {
                browser: config.clone(),
            },
        )?;
        write_json_atomic(
            &self.account_path(),
            &AccountEnvelope {
                user: account.clone(),
            },
        )?;

        info!(
            dir = %self.dir.display(),
            user = %account.name,
            protected = account.credential_hash.is_some(),
            "Profile created"
        );
        Ok((account, config))
    }

    /// Persisted user blocklist, or an empty list when `bl.json` is absent.
    ///
    /// # Errors
    ///
    /// [`ProfileError::CorruptData`] if the file exists but is not a JSON
    /// array of strings.
    pub fn load_extra_blocklist(&self) -> Result<Vec<String>, ProfileError> {
        let path = self.blocklist_path();
        if !path.is_file() {
            debug!(path = %path.display(), "No user blocklist");
            return Ok(Vec::new());
        }
        let patterns: Vec<String> = read_json(&path)?;
        info!(path = %path.display(), count = patterns.len(), "User blocklist loaded");
        Ok(patterns)
    }
}

fn validate_account(account: &AccountRecord) -> Result<(), String> {
    if account.name.is_empty() {
        return Err("user.name is empty".to_string());
    }
    if let Some(ref hash) = account.credential_hash
        && !auth::is_credential_hash(hash)
    {
        return Err("user.password is not a hex SHA-256 digest".to_string());
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ProfileError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => ProfileError::CorruptData {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        _ => ProfileError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    serde_json::from_str(&content).map_err(|e| ProfileError::CorruptData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Temp file + rename (atomic on POSIX and on NTFS for same-volume renames).
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ProfileError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ProfileError::CorruptData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = fs::File::create(&temp_path).map_err(io_err(&temp_path))?;
    file.write_all(json.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(io_err(&temp_path))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(io_err(path))?;
    debug!(path = %path.display(), "Record written");
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ProfileError + use<> {
    let path = path.to_path_buf();
    move |source| ProfileError::Io { path, source }
}
