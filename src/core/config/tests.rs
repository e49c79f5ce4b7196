use super::data::{
    AssistantIds, Config, Identity, DEFAULT_ASSISTANT_BASE_URL, DEFAULT_MODEL,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SERVER_HOST, ENV_ASSISTANT_BASE_URL, ENV_SERVER_HOST,
};
use std::collections::HashMap;
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        server_host: Some("https://stories.example.com".to_string()),
        poll_interval_ms: Some(250),
        assistants: AssistantIds {
            storyteller: Some("asst_teller".to_string()),
            ..AssistantIds::default()
        },
        identity: Some(Identity {
            auth_id: "user_123".to_string(),
            profile_id: Some("65abc".to_string()),
            ..Identity::default()
        }),
        ..Config::default()
    };
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded, config);
    assert_eq!(loaded.profile_id(), Some("65abc"));

    let mut modified = loaded;
    modified.identity = None;
    modified.save_to_path(&config_path).expect("second save failed");

    let reloaded = Config::load_from_path(&config_path).expect("reload failed");
    assert_eq!(reloaded.identity, None);
    assert_eq!(reloaded.profile_id(), None);
}

#[test]
fn parse_errors_name_the_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "server_host = [").expect("write");

    let err = Config::load_from_path(&config_path).expect_err("invalid toml");
    let message = err.to_string();
    assert!(message.starts_with("Failed to parse config at"), "{message}");
    assert!(message.contains("config.toml"), "{message}");
}

#[test]
fn resolve_uses_defaults_when_unset() {
    let resolved = Config::default().resolve_with_env(env_from(&[]));

    assert_eq!(resolved.server_host, DEFAULT_SERVER_HOST);
    assert_eq!(resolved.assistant_base_url, DEFAULT_ASSISTANT_BASE_URL);
    assert_eq!(resolved.model, DEFAULT_MODEL);
    assert_eq!(resolved.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
}

#[test]
fn resolve_prefers_environment_over_file() {
    let config = Config {
        server_host: Some("https://file.example.com".to_string()),
        assistant_base_url: Some("https://file-llm.example.com/v1".to_string()),
        ..Config::default()
    };

    let resolved = config.resolve_with_env(env_from(&[
        (ENV_SERVER_HOST, "https://env.example.com"),
        (ENV_ASSISTANT_BASE_URL, "   "),
    ]));

    assert_eq!(resolved.server_host, "https://env.example.com");
    // Blank environment values do not shadow the file.
    assert_eq!(resolved.assistant_base_url, "https://file-llm.example.com/v1");
}

#[test]
fn zero_poll_interval_falls_back_to_default() {
    let config = Config {
        poll_interval_ms: Some(0),
        ..Config::default()
    };
    assert_eq!(
        config.resolve_with_env(env_from(&[])).poll_interval_ms,
        DEFAULT_POLL_INTERVAL_MS
    );
}

#[test]
fn describe_reports_identity_state() {
    let lines = Config::default().describe();
    assert!(lines.iter().any(|line| line == "  identity: (not signed in)"));
    assert!(lines
        .iter()
        .any(|line| line == "  storyteller-assistant: (unset)"));
}
