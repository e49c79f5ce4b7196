//! Handlers for the signed-in account.
//!
//! Sign-in happens outside this client; these keys record the resulting
//! account so a backend profile can be created or looked up.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{joined_value, success_set, success_unset};
use crate::cli::settings::SettingHandler;
use crate::core::config::data::{Config, Identity};

/// Handler for `auth-id`. Setting it to a different account starts a fresh
/// identity; unsetting it forgets the account entirely.
pub struct AuthIdHandler;

impl SettingHandler for AuthIdHandler {
    fn key(&self) -> &'static str {
        "auth-id"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let auth_id = joined_value(
            args,
            "To record the signed-in account, provide its id:",
            "storyteller set auth-id 3f9a1c",
        )?;
        let same_account = config
            .identity
            .as_ref()
            .is_some_and(|identity| identity.auth_id == auth_id);
        if !same_account {
            config.identity = Some(Identity {
                auth_id: auth_id.clone(),
                ..Identity::default()
            });
        }
        Ok(success_set(self.key(), &auth_id))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.identity = None;
        Ok(success_unset(self.key()))
    }

    fn format(&self, config: &Config) -> String {
        match &config.identity {
            Some(identity) => format!("  auth-id: {}", identity.auth_id),
            None => "  auth-id: (not signed in)".to_string(),
        }
    }
}

/// Data-driven handler for optional identity fields.
pub struct IdentityFieldHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    field: fn(&mut Identity) -> &mut Option<String>,
    get: fn(&Identity) -> Option<&str>,
}

impl SettingHandler for IdentityFieldHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let value = joined_value(args, self.hint, self.example)?;
        let identity = config
            .identity
            .as_mut()
            .ok_or(SettingError::NotSignedIn { key: self.key })?;
        let message = success_set(self.key, &value);
        *(self.field)(identity) = Some(value);
        Ok(message)
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        if let Some(identity) = config.identity.as_mut() {
            *(self.field)(identity) = None;
        }
        Ok(success_unset(self.key))
    }

    fn format(&self, config: &Config) -> String {
        match config.identity.as_ref().and_then(self.get) {
            Some(value) => format!("  {}: {value}", self.key),
            None => format!("  {}: (unset)", self.key),
        }
    }
}

pub fn identity_handlers() -> Vec<IdentityFieldHandler> {
    vec![
        IdentityFieldHandler {
            key: "profile-id",
            hint: "To use an existing backend profile, provide its id:",
            example: "storyteller set profile-id 65f0c0ffee",
            field: |i| &mut i.profile_id,
            get: |i| i.profile_id.as_deref(),
        },
        IdentityFieldHandler {
            key: "first-name",
            hint: "To set the first name used for a new profile, provide it:",
            example: "storyteller set first-name Ruth",
            field: |i| &mut i.first_name,
            get: |i| i.first_name.as_deref(),
        },
        IdentityFieldHandler {
            key: "last-name",
            hint: "To set the last name used for a new profile, provide it:",
            example: "storyteller set last-name Moab",
            field: |i| &mut i.last_name,
            get: |i| i.last_name.as_deref(),
        },
        IdentityFieldHandler {
            key: "email",
            hint: "To set the email used for a new profile, provide it:",
            example: "storyteller set email ruth@example.com",
            field: |i| &mut i.email,
            get: |i| i.email.as_deref(),
        },
    ]
}
