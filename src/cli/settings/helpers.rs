//! Helper functions for settings operations.

use std::path::Path;

use crate::core::config::data::Config;

use super::error::SettingError;
use super::registry::SettingRegistry;

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// Join the words after the key, rejecting an empty value.
pub fn joined_value(
    args: &[String],
    hint: &'static str,
    example: &'static str,
) -> Result<String, SettingError> {
    let value = args.join(" ");
    if value.trim().is_empty() {
        return Err(SettingError::MissingArgs { hint, example });
    }
    Ok(value.trim().to_string())
}

/// Load the config at `path`, apply one set/unset, and save it back.
///
/// `args == None` means unset.
pub fn update_config_file(
    registry: &SettingRegistry,
    path: &Path,
    key: &str,
    args: Option<&[String]>,
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    let mut config =
        Config::load_from_path(path).map_err(|e| SettingError::ConfigError(e.to_string()))?;

    let message = match args {
        Some(args) => handler.set(args, &mut config)?,
        None => handler.unset(&mut config)?,
    };

    config
        .save_to_path(path)
        .map_err(|e| SettingError::ConfigError(e.to_string()))?;
    Ok(message)
}
