use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_HOST: &str = "http://localhost:3000";
pub const DEFAULT_ASSISTANT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const ENV_SERVER_HOST: &str = "STORYTELLER_SERVER_HOST";
pub const ENV_ASSISTANT_BASE_URL: &str = "OPENAI_BASE_URL";

/// The signed-in account as reported by the external sign-in provider.
///
/// Sign-in itself happens elsewhere; this is the handful of fields needed to
/// create or look up the matching backend profile.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Identity {
    pub auth_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_img: Option<String>,
    /// Backend profile id once one has been created for this account.
    #[serde(default)]
    pub profile_id: Option<String>,
}

/// Assistant ids for each job the hosted assistant performs.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AssistantIds {
    pub suggestions: Option<String>,
    pub setup: Option<String>,
    pub storyteller: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the story backend
    pub server_host: Option<String>,
    /// Base URL of the assistant API (OpenAI-compatible)
    pub assistant_base_url: Option<String>,
    /// Model used for every assistant run
    pub model: Option<String>,
    /// Interval between run status checks when not streaming
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub assistants: AssistantIds,
    pub identity: Option<Identity>,
}

/// Settings after defaults and environment overrides have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub server_host: String,
    pub assistant_base_url: String,
    pub model: String,
    pub poll_interval_ms: u64,
    pub assistants: AssistantIds,
}

impl Config {
    pub fn resolve(&self) -> ResolvedConfig {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// Environment values win over the file, which wins over built-in defaults.
    pub fn resolve_with_env<F>(&self, lookup: F) -> ResolvedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        ResolvedConfig {
            server_host: env(ENV_SERVER_HOST)
                .or_else(|| self.server_host.clone())
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            assistant_base_url: env(ENV_ASSISTANT_BASE_URL)
                .or_else(|| self.assistant_base_url.clone())
                .unwrap_or_else(|| DEFAULT_ASSISTANT_BASE_URL.to_string()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            poll_interval_ms: self
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            assistants: self.assistants.clone(),
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(|identity| identity.profile_id.as_deref())
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
