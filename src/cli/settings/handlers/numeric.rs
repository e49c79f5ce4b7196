use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{joined_value, success_set};
use crate::cli::settings::SettingHandler;
use crate::core::config::data::{Config, DEFAULT_POLL_INTERVAL_MS};

/// Handler for the `poll-interval-ms` setting.
pub struct PollIntervalHandler;

impl SettingHandler for PollIntervalHandler {
    fn key(&self) -> &'static str {
        "poll-interval-ms"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = joined_value(
            args,
            "To set how often runs are polled, give a number of milliseconds:",
            "storyteller set poll-interval-ms 500",
        )?;
        let value = input
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or(SettingError::InvalidValue {
                key: "poll-interval-ms",
                input,
                expected: "a positive number of milliseconds",
            })?;
        config.poll_interval_ms = Some(value);
        Ok(success_set(self.key(), &value.to_string()))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.poll_interval_ms = None;
        Ok(format!(
            "✅ Unset poll-interval-ms (will use default: {DEFAULT_POLL_INTERVAL_MS})"
        ))
    }

    fn format(&self, config: &Config) -> String {
        match config.poll_interval_ms {
            Some(ms) => format!("  poll-interval-ms: {ms}"),
            None => format!("  poll-interval-ms: (unset, default: {DEFAULT_POLL_INTERVAL_MS})"),
        }
    }
}
