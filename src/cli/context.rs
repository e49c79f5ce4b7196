//! Clients and account state shared by the commands that talk to services.

use std::error::Error;
use std::fmt;

use tracing::info;

use crate::api::Profile;
use crate::auth::{AuthManager, MissingApiKey};
use crate::core::assistant::AssistantClient;
use crate::core::backend::BackendClient;
use crate::core::config::data::{Config, ResolvedConfig};
use crate::core::profile::ProfileCache;

#[derive(Debug)]
pub struct NotSignedIn;

impl fmt::Display for NotSignedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "❌ No account configured. Run 'storyteller set auth-id <id>' after signing in."
        )
    }
}

impl Error for NotSignedIn {}

pub struct CliContext {
    pub config: Config,
    pub resolved: ResolvedConfig,
    pub client: reqwest::Client,
    pub backend: BackendClient,
}

impl CliContext {
    pub fn load() -> Result<Self, Box<dyn Error>> {
        Ok(Self::from_config(Config::load()?))
    }

    pub fn from_config(config: Config) -> Self {
        let resolved = config.resolve();
        let client = reqwest::Client::new();
        let backend = BackendClient::new(client.clone(), resolved.server_host.clone());
        Self {
            config,
            resolved,
            client,
            backend,
        }
    }

    /// Assistant client using the stored or exported API key. Exits with the
    /// key's quick fixes when none is available.
    pub fn assistant(&self) -> AssistantClient {
        match AuthManager::new().resolve_api_key() {
            Ok((api_key, _)) => {
                AssistantClient::from_config(self.client.clone(), api_key, &self.resolved)
            }
            Err(err) => exit_missing_key(&err),
        }
    }

    /// Backend profile for the configured account, creating it on first use.
    pub async fn profile(&mut self) -> Result<Profile, Box<dyn Error>> {
        let identity = self.config.identity.clone().ok_or(NotSignedIn)?;
        let mut cache = ProfileCache::load()?;
        let ensured = cache.ensure_profile(&self.backend, &identity).await?;
        cache.save()?;

        if ensured.created {
            info!(profile_id = %ensured.profile.id, "remembering new profile");
            if let Some(identity) = self.config.identity.as_mut() {
                identity.profile_id = Some(ensured.profile.id.clone());
            }
            self.config.save()?;
        }
        Ok(ensured.profile)
    }
}

pub fn exit_missing_key(err: &MissingApiKey) -> ! {
    eprintln!("{err}");
    let fixes = err.quick_fixes();
    if !fixes.is_empty() {
        eprintln!();
        eprintln!("💡 Quick fixes:");
        for fix in fixes {
            eprintln!("  • {fix}");
        }
    }
    std::process::exit(err.exit_code());
}
