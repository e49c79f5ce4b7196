//! Backend profile for the signed-in account, cached between runs.

use std::error::Error;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{CreateProfileRequest, Profile};
use crate::core::backend::{BackendClient, BackendError};
use crate::core::config::data::Identity;
use crate::core::state::{load_json, remove_state, save_json, state_path, StateError};

const CACHE_FILE: &str = "profile.json";
pub const DEFAULT_FIRST_NAME: &str = "User";

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    async fn create_profile(&self, request: &CreateProfileRequest) -> Result<Profile, Self::Error>;
    async fn get_profile(&self, profile_id: &str) -> Result<Profile, Self::Error>;
}

#[async_trait]
impl ProfileDirectory for BackendClient {
    type Error = BackendError;

    async fn create_profile(&self, request: &CreateProfileRequest) -> Result<Profile, BackendError> {
        BackendClient::create_profile(self, request).await
    }

    async fn get_profile(&self, profile_id: &str) -> Result<Profile, BackendError> {
        BackendClient::get_profile(self, profile_id).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileCache {
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// The profile plus whether it was created by this call, in which case the
/// caller should remember its id.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredProfile {
    pub profile: Profile,
    pub created: bool,
}

impl ProfileCache {
    pub fn cache_path() -> Result<PathBuf, StateError> {
        state_path(CACHE_FILE)
    }

    pub fn load() -> Result<Self, StateError> {
        Self::load_from_path(&Self::cache_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, StateError> {
        load_json(path)
    }

    pub fn save(&self) -> Result<(), StateError> {
        self.save_to_path(&Self::cache_path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), StateError> {
        save_json(path, self)
    }

    /// Cached profile if it belongs to `identity`.
    pub fn cached_for(&self, identity: &Identity) -> Option<&Profile> {
        self.profile.as_ref().filter(|profile| {
            profile.auth_id.as_deref() == Some(identity.auth_id.as_str())
                && identity
                    .profile_id
                    .as_deref()
                    .is_none_or(|id| id == profile.id)
        })
    }

    /// Resolve the backend profile for `identity`.
    ///
    /// Uses the cache when it matches, creates a profile when the identity has
    /// none yet, and fetches it by id otherwise.
    pub async fn ensure_profile<D>(
        &mut self,
        directory: &D,
        identity: &Identity,
    ) -> Result<EnsuredProfile, D::Error>
    where
        D: ProfileDirectory + ?Sized,
    {
        if let Some(profile) = self.cached_for(identity) {
            return Ok(EnsuredProfile {
                profile: profile.clone(),
                created: false,
            });
        }

        let (profile, created) = match identity.profile_id.as_deref() {
            None => {
                let request = create_request(identity);
                info!(auth_id = %identity.auth_id, "creating profile");
                (directory.create_profile(&request).await?, true)
            }
            Some(profile_id) => (directory.get_profile(profile_id).await?, false),
        };

        self.profile = Some(profile.clone());
        Ok(EnsuredProfile { profile, created })
    }

    pub fn sign_out(&mut self) {
        self.profile = None;
    }

    /// Clear the cache and remove its file.
    pub fn sign_out_at(&mut self, path: &Path) -> Result<(), StateError> {
        self.sign_out();
        remove_state(path)
    }
}

fn create_request(identity: &Identity) -> CreateProfileRequest {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    CreateProfileRequest {
        first_name: identity
            .first_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FIRST_NAME.to_string()),
        last_name: text(&identity.last_name),
        auth_id: identity.auth_id.clone(),
        email: text(&identity.email),
        profile_img: text(&identity.profile_img),
    }
}
