//! Login gate for a password-protected profile.
//!
//! The profile stores only the hex SHA-256 of the secret. At startup the
//! gate asks for the secret once, hashes it, and compares digests in
//! constant time. There is no retry: a mismatch ends the run.

use std::io;
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::profile::AccountRecord;

/// Length of a hex-encoded SHA-256 digest.
pub const CREDENTIAL_HASH_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("AuthError::Mismatch: incorrect password")]
    Mismatch,

    #[error("password prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

/// Proof that the gate was passed; turned into a `Session` by the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthGrant {
    pub authenticated_at: SystemTime,
    /// `false` when the account has no credential and no prompt was shown.
    pub verified: bool,
}

/// Hex SHA-256 of `secret`.
pub fn credential_hash(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// `true` if `value` looks like the output of [`credential_hash`].
pub fn is_credential_hash(value: &str) -> bool {
    value.len() == CREDENTIAL_HASH_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Checks `account` against a secret obtained from `prompt`.
///
/// `prompt` is called at most once, and only if the account has a
/// credential hash.
pub fn authenticate<F>(account: &AccountRecord, prompt: F) -> Result<AuthGrant, AuthError>
where
    F: FnOnce() -> io::Result<String>,
{
    let Some(expected) = account.credential_hash.as_deref() else {
        debug!(user = %account.name, "No password required");
        return Ok(AuthGrant {
            authenticated_at: SystemTime::now(),
            verified: false,
        });
    };

    let secret = prompt().map_err(AuthError::Prompt)?;
    let actual = credential_hash(&secret);

    if !constant_time_eq(actual.as_bytes(), expected.to_ascii_lowercase().as_bytes()) {
        warn!(user = %account.name, "Incorrect password");
        return Err(AuthError::Mismatch);
    }

    info!(user = %account.name, "Authenticated");
    Ok(AuthGrant {
        authenticated_at: SystemTime::now(),
        verified: true,
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn account(hash: Option<String>) -> AccountRecord {
        AccountRecord {
            name: "alice".into(),
            credential_hash: hash,
            bookmarks: vec![],
        }
    }

    #[test]
    fn test_credential_hash_known_vector() {
        assert_eq!(
            credential_hash("secret"),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
        assert!(is_credential_hash(&credential_hash("")));
        assert!(!is_credential_hash("abc"));
        assert!(!is_credential_hash(&"z".repeat(64)));
    }

    #[test]
    fn test_no_credential_never_prompts() {
        let called = Cell::new(false);
        let grant = authenticate(&account(None), || {
            called.set(true);
            Ok(String::new())
        })
        .unwrap();
        assert!(!called.get());
        assert!(!grant.verified);
    }

    #[test]
    fn test_correct_secret_accepted() {
        let calls = Cell::new(0);
        let grant = authenticate(&account(Some(credential_hash("hunter2"))), || {
            calls.set(calls.get() + 1);
            Ok("hunter2".to_string())
        })
        .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(grant.verified);
    }

    #[test]
    fn test_uppercase_stored_hash_accepted() {
        let stored = credential_hash("pw").to_ascii_uppercase();
        assert!(authenticate(&account(Some(stored)), || Ok("pw".into())).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let result = authenticate(&account(Some(credential_hash("hunter2"))), || {
            Ok("hunter3".to_string())
        });
        assert!(matches!(result, Err(AuthError::Mismatch)));
    }

    #[test]
    fn test_prompt_failure_propagates() {
        let result = authenticate(&account(Some(credential_hash("x"))), || {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"))
        });
        assert!(matches!(result, Err(AuthError::Prompt(_))));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
