//! TOML-based application settings.
//!
//! These are process-level settings (where the profile lives, where audit
//! records go, how verbose logging is). The user's browser preferences live
//! in the profile itself, see [`crate::profile::BrowserConfig`].
//!
//! Every struct implements `Default`, so a missing or partial file behaves
//! like the stock setup: profile records in the working directory, audit
//! records on the log only.
//!
//! ## Config file search order
//!
//! 1. `NAVALII_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/navalii.toml`)
//! 3. Platform config directory (`%APPDATA%\Navalii\navalii.toml` on Windows)
//! 4. Current working directory (`./navalii.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "navalii.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: ProfileConfig,
    pub privacy: PrivacyConfig,
    pub logging: LoggingConfig,
}

/// Location of the profile records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub dir: PathBuf,
}

/// Request filtering extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Append-only file receiving one line per blocked request.
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from the first file found. Never panics — returns
    /// defaults if no file is found or if parsing fails.
    ///
    /// Also returns the path that was used, if any.
    pub fn load() -> (Self, Option<PathBuf>) {
        match find_config_path() {
            Some(path) => {
                let config = Self::load_from(&path);
                (config, Some(path))
            }
            None => {
                info!("No config file found, using defaults");
                (Config::default(), None)
            }
        }
    }

    /// Loads a specific file, falling back to defaults on any error.
    ///
    /// Relative paths, including the default profile dir `.`, are resolved
    /// against the directory holding the file.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
                return Config::default();
            }
        };
        match toml::from_str::<Config>(&content) {
            Ok(config) => {
                info!(path = %path.display(), "Configuration loaded");
                match path.parent() {
                    Some(base) => config.resolved_against(base),
                    None => config,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Config::default()
            }
        }
    }

    fn resolved_against(mut self, base: &Path) -> Self {
        if self.profile.dir.is_relative() {
            self.profile.dir = base.join(&self.profile.dir);
        }
        self.privacy.audit_log = self.privacy.audit_log.map(|log| {
            if log.is_relative() {
                base.join(log)
            } else {
                log
            }
        });
        self
    }
}

/// Searches for a config file in the standard locations.
fn find_config_path() -> Option<PathBuf> {
    // 1. Explicit env var override
    if let Ok(path) = std::env::var("NAVALII_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
        warn!(path = %p.display(), "NAVALII_CONFIG does not point to a file, ignoring");
    }

    // 2. Next to the executable
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join(CONFIG_FILE_NAME);
        if p.is_file() {
            return Some(p);
        }
    }

    // 3. Platform config directory
    if let Some(dir) = platform_config_dir() {
        let p = dir.join(CONFIG_FILE_NAME);
        if p.is_file() {
            return Some(p);
        }
    }

    // 4. Current working directory
    let p = PathBuf::from(CONFIG_FILE_NAME);
    if p.is_file() {
        return Some(p);
    }

    None
}

/// Returns the platform config directory without adding a dependency.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("Navalii"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("navalii"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.profile.dir, PathBuf::from("."));
        assert_eq!(c.privacy.audit_log, None);
        assert_eq!(c.logging.filter, "info");
    }

    #[test]
    fn test_empty_toml_returns_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
[logging]
filter = "navalii=debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.filter, "navalii=debug");
        assert_eq!(config.profile.dir, PathBuf::from(".")); // default
    }

    #[test]
    fn test_load_from_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[profile]\ndir = \"profile\"\n[privacy]\naudit_log = \"audit.log\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.profile.dir, dir.path().join("profile"));
        assert_eq!(config.privacy.audit_log, Some(dir.path().join("audit.log")));
    }

    #[test]
    fn test_absolute_paths_untouched() {
        let dir = TempDir::new().unwrap();
        let abs = dir.path().join("elsewhere");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, format!("[profile]\ndir = {:?}\n", abs.display().to_string())).unwrap();
        assert_eq!(Config::load_from(&path).profile.dir, abs);
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[profile\ndir = ").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            Config::load_from(&dir.path().join("nope.toml")),
            Config::default()
        );
    }
}
