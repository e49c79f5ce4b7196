//! Settings management for CLI set/unset commands.
//!
//! Each configuration key is served by a [`SettingHandler`]:
//!
//! - Text settings (e.g., `server-host`, `storyteller-assistant`)
//! - Numeric settings (e.g., `poll-interval-ms`)
//! - Identity settings (e.g., `auth-id`, `profile-id`)

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;

/// Trait for handling a configuration setting.
///
/// Handlers edit the in-memory config; the caller loads and saves it.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the arguments given after the key.
    ///
    /// Returns a success message to display.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Unset (clear) the configuration value.
    fn unset(&self, config: &mut Config) -> Result<String, SettingError>;

    /// Format the current value for display in `storyteller set` output.
    fn format(&self, config: &Config) -> String;
}
