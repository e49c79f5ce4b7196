use crate::core::config::data::{Config, ResolvedConfig};

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

impl Config {
    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }

    /// Human-readable dump of the effective settings, one line each.
    pub fn describe(&self) -> Vec<String> {
        let ResolvedConfig {
            server_host,
            assistant_base_url,
            model,
            poll_interval_ms,
            assistants,
        } = self.resolve();

        let mut lines = vec![
            "Current configuration:".to_string(),
            format!("  server-host: {server_host}"),
            format!("  assistant-base-url: {assistant_base_url}"),
            format!("  model: {model}"),
            format!("  poll-interval-ms: {poll_interval_ms}"),
            format!(
                "  suggestion-assistant: {}",
                or_unset(assistants.suggestions.as_deref())
            ),
            format!(
                "  setup-assistant: {}",
                or_unset(assistants.setup.as_deref())
            ),
            format!(
                "  storyteller-assistant: {}",
                or_unset(assistants.storyteller.as_deref())
            ),
        ];

        match &self.identity {
            Some(identity) => {
                lines.push(format!("  auth-id: {}", identity.auth_id));
                lines.push(format!(
                    "  profile-id: {}",
                    or_unset(identity.profile_id.as_deref())
                ));
            }
            None => lines.push("  identity: (not signed in)".to_string()),
        }
        lines
    }
}
