//! Assistant API key storage.
//!
//! The key lives in the platform keyring under a single entry. When the
//! keyring has nothing (or is unavailable), `OPENAI_API_KEY` is used instead.

use crate::core::keyring::KeyringAccessError;
use keyring::Entry;
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

pub mod ui;

const KEYRING_SERVICE: &str = "storyteller";
const KEYRING_ACCOUNT: &str = "assistant-api-key";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

const QUICK_FIXES: &[&str] = &[
    "storyteller auth                # Store a key in the system keyring",
    "export OPENAI_API_KEY=sk-...    # Use an environment variable",
];

#[derive(Debug)]
pub struct MissingApiKey;

impl MissingApiKey {
    pub fn quick_fixes(&self) -> &'static [&'static str] {
        QUICK_FIXES
    }

    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl fmt::Display for MissingApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "❌ No assistant API key found in the keyring and {ENV_API_KEY} is not set"
        )
    }
}

impl Error for MissingApiKey {}

/// Where a resolved key came from; shown by `storyteller auth --status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keyring,
    Environment,
}

pub struct AuthManager {
    use_keyring: bool,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access (useful for tests)
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn store_key(&self, key: &str) -> Result<(), KeyringAccessError> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        entry.set_password(key.trim())?;
        debug!("stored assistant API key in keyring");
        Ok(())
    }

    pub fn stored_key(&self) -> Result<Option<String>, KeyringAccessError> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        match entry.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns true when a key was removed.
    pub fn remove_key(&self) -> Result<bool, KeyringAccessError> {
        if !self.use_keyring {
            return Ok(false);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn resolve_api_key(&self) -> Result<(String, KeySource), MissingApiKey> {
        self.resolve_api_key_with_env(|key| std::env::var(key).ok())
    }

    /// Keyring first, then the environment. A keyring outage is logged and
    /// treated like an empty keyring so the environment can still be used.
    pub fn resolve_api_key_with_env<F>(
        &self,
        lookup: F,
    ) -> Result<(String, KeySource), MissingApiKey>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self.stored_key() {
            Ok(Some(key)) if !key.trim().is_empty() => return Ok((key, KeySource::Keyring)),
            Ok(_) => {}
            Err(err) if err.is_recoverable() => {
                warn!("keyring unavailable, falling back to environment: {err}");
            }
            Err(err) => {
                warn!("keyring lookup failed: {err}");
            }
        }

        lookup(ENV_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .map(|key| (key, KeySource::Environment))
            .ok_or(MissingApiKey)
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_key_is_used_without_keyring() {
        let auth = AuthManager::new_with_keyring(false);
        let (key, source) = auth
            .resolve_api_key_with_env(|name| {
                (name == ENV_API_KEY).then(|| "sk-test".to_string())
            })
            .expect("key from env");
        assert_eq!(key, "sk-test");
        assert_eq!(source, KeySource::Environment);
    }

    #[test]
    fn blank_environment_key_is_missing() {
        let auth = AuthManager::new_with_keyring(false);
        let err = auth
            .resolve_api_key_with_env(|_| Some("  ".to_string()))
            .expect_err("blank key");
        assert_eq!(err.exit_code(), 2);
        assert!(!err.quick_fixes().is_empty());
    }

    #[test]
    fn disabled_keyring_is_a_no_op() {
        let auth = AuthManager::new_with_keyring(false);
        auth.store_key("sk-ignored").expect("store");
        assert_eq!(auth.stored_key().expect("lookup"), None);
        assert!(!auth.remove_key().expect("remove"));
    }
}
