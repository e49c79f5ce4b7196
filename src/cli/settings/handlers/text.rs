//! Text setting handlers for URLs, the model and assistant ids.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{joined_value, success_set, success_unset};
use crate::cli::settings::SettingHandler;
use crate::core::config::data::{
    Config, DEFAULT_ASSISTANT_BASE_URL, DEFAULT_MODEL, DEFAULT_SERVER_HOST,
};

/// Data-driven handler for optional string settings.
pub struct TextHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: Option<&'static str>,
    get: fn(&Config) -> Option<&str>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for TextHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let value = joined_value(args, self.hint, self.example)?;
        let message = success_set(self.key, &value);
        (self.set_field)(config, Some(value));
        Ok(message)
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        (self.set_field)(config, None);
        Ok(match self.default_display {
            Some(default) => format!("{} (will use default: {default})", success_unset(self.key)),
            None => success_unset(self.key),
        })
    }

    fn format(&self, config: &Config) -> String {
        match ((self.get)(config), self.default_display) {
            (Some(value), _) => format!("  {}: {value}", self.key),
            (None, Some(default)) => format!("  {}: (unset, default: {default})", self.key),
            (None, None) => format!("  {}: (unset)", self.key),
        }
    }
}

pub fn server_host_handler() -> TextHandler {
    TextHandler {
        key: "server-host",
        hint: "To set the story backend, provide its base URL:",
        example: "storyteller set server-host https://stories.example.com",
        default_display: Some(DEFAULT_SERVER_HOST),
        get: |c| c.server_host.as_deref(),
        set_field: |c, v| c.server_host = v,
    }
}

pub fn assistant_base_url_handler() -> TextHandler {
    TextHandler {
        key: "assistant-base-url",
        hint: "To set the assistant API, provide its base URL:",
        example: "storyteller set assistant-base-url https://api.openai.com/v1",
        default_display: Some(DEFAULT_ASSISTANT_BASE_URL),
        get: |c| c.assistant_base_url.as_deref(),
        set_field: |c, v| c.assistant_base_url = v,
    }
}

pub fn model_handler() -> TextHandler {
    TextHandler {
        key: "model",
        hint: "To set the model used for assistant runs, specify it:",
        example: "storyteller set model gpt-4o",
        default_display: Some(DEFAULT_MODEL),
        get: |c| c.model.as_deref(),
        set_field: |c, v| c.model = v,
    }
}

pub fn suggestion_assistant_handler() -> TextHandler {
    TextHandler {
        key: "suggestion-assistant",
        hint: "To set the assistant that suggests stories, provide its id:",
        example: "storyteller set suggestion-assistant asst_abc123",
        default_display: None,
        get: |c| c.assistants.suggestions.as_deref(),
        set_field: |c, v| c.assistants.suggestions = v,
    }
}

pub fn setup_assistant_handler() -> TextHandler {
    TextHandler {
        key: "setup-assistant",
        hint: "To set the assistant that prepares story setups, provide its id:",
        example: "storyteller set setup-assistant asst_abc123",
        default_display: None,
        get: |c| c.assistants.setup.as_deref(),
        set_field: |c, v| c.assistants.setup = v,
    }
}

pub fn storyteller_assistant_handler() -> TextHandler {
    TextHandler {
        key: "storyteller-assistant",
        hint: "To set the assistant that writes chapters, provide its id:",
        example: "storyteller set storyteller-assistant asst_abc123",
        default_display: None,
        get: |c| c.assistants.storyteller.as_deref(),
        set_field: |c, v| c.assistants.storyteller = v,
    }
}

pub fn text_handlers() -> Vec<TextHandler> {
    vec![
        server_host_handler(),
        assistant_base_url_handler(),
        model_handler(),
        suggestion_assistant_handler(),
        setup_assistant_handler(),
        storyteller_assistant_handler(),
    ]
}
