use graft_core::config::Settings;
use graft_core::conversation::{Conversation, ConversationMessage, ConversationStorage};
use graft_core::llm::{ServiceConfig, ServiceKind};
use tempfile::TempDir;

// ========================================================================
// Settings (config/mod.rs)
// ========================================================================

#[test]
fn settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.service, ServiceKind::Ollama);
    assert!(settings.services.is_empty());
    assert_eq!(settings.configuration.max_tokens, 8192);
    assert!((settings.configuration.temperature - 0.1).abs() < f32::EPSILON);
    assert!(settings.configuration.check_for_updates);
    assert!(settings.configuration.auto_formatting_enabled);
    assert!(settings.configuration.chat.editor_context_enabled);
    assert!(settings.configuration.code_completion.git_diff_enabled);
    assert!(!settings.configuration.code_completion.context_aware_enabled);
}

#[test]
fn settings_save_and_reload_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("graft").join("config.toml");

    let mut settings = Settings::default();
    settings.service = ServiceKind::Anthropic;
    settings.configuration.max_tokens = 4096;
    settings.services.push(ServiceConfig {
        kind: ServiceKind::Anthropic,
        api_key_env: "MY_KEY".to_string(),
        base_url: "https://proxy.example.com".to_string(),
        model: "claude-test".to_string(),
    });

    settings.save_to(&config_path).unwrap();
    let loaded = Settings::load_from(&config_path);

    assert_eq!(loaded.service, ServiceKind::Anthropic);
    assert_eq!(loaded.configuration.max_tokens, 4096);
    assert_eq!(loaded.services.len(), 1);
    assert_eq!(loaded.services[0].model, "claude-test");
}

#[test]
fn settings_load_returns_default_for_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let loaded = Settings::load_from(&temp_dir.path().join("nope.toml"));
    assert_eq!(loaded.service, Settings::default().service);
}

#[test]
fn settings_load_tolerates_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "this is { not toml").unwrap();

    let loaded = Settings::load_from(&path);
    assert_eq!(loaded.configuration.max_tokens, 8192);
}

#[test]
fn temperature_is_clamped_when_read() {
    let mut settings = Settings::default();
    settings.configuration.temperature = 3.5;
    assert!((settings.configuration.clamped_temperature() - 1.0).abs() < f32::EPSILON);

    settings.configuration.temperature = -0.5;
    assert!(settings.configuration.clamped_temperature().abs() < f32::EPSILON);
}

#[test]
fn service_config_falls_back_to_defaults() {
    let settings = Settings::default();
    let config = settings.service_config(ServiceKind::Anthropic);

    assert_eq!(config.kind, ServiceKind::Anthropic);
    assert_eq!(config.api_key_env, "ANTHROPIC_API_KEY");
    assert_eq!(config.base_url, "https://api.anthropic.com");
}

#[test]
fn stored_service_entry_wins_over_defaults() {
    let mut settings = Settings::default();
    settings.services.push(ServiceConfig {
        kind: ServiceKind::OpenAi,
        api_key_env: "ALT_OPENAI_KEY".to_string(),
        base_url: "https://gateway.internal".to_string(),
        model: "gpt-custom".to_string(),
    });

    let config = settings.service_config(ServiceKind::OpenAi);
    assert_eq!(config.api_key_env, "ALT_OPENAI_KEY");
    assert_eq!(config.base_url, "https://gateway.internal");
    assert_eq!(config.model, "gpt-custom");
}

#[test]
fn local_services_need_no_api_key() {
    assert!(!ServiceKind::Ollama.needs_api_key());
    assert!(!ServiceKind::LlamaCpp.needs_api_key());
    assert!(ServiceKind::Anthropic.needs_api_key());

    // Local services build clients without any environment setup.
    let config = ServiceConfig::defaults_for(ServiceKind::Ollama);
    assert!(config.build_client().is_ok());
}

#[test]
fn missing_api_key_is_a_config_error() {
    let config = ServiceConfig {
        kind: ServiceKind::Anthropic,
        api_key_env: "GRAFT_TEST_DEFINITELY_UNSET".to_string(),
        base_url: "https://api.anthropic.com".to_string(),
        model: "claude-test".to_string(),
    };
    assert!(config.build_client().is_err());
}

// ========================================================================
// Conversations (conversation/mod.rs)
// ========================================================================

#[test]
fn conversation_tracks_exchanges() {
    let mut conversation = Conversation::new();
    let message = ConversationMessage::new("What does this function do?");
    let message_id = message.id;
    conversation.add_message(message);

    assert!(conversation.last_message().unwrap().response.is_none());

    conversation.set_response(message_id, "It parses the config file.");
    assert_eq!(
        conversation.last_message().unwrap().response.as_deref(),
        Some("It parses the config file.")
    );
}

#[test]
fn conversation_storage_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let storage = ConversationStorage::new(temp_dir.path().join("conversations.json"));

    let mut conversation = Conversation::new();
    conversation.add_message(ConversationMessage::new("hello"));
    storage.save(&conversation).unwrap();

    let found = storage.find(conversation.id).unwrap();
    assert_eq!(found.messages.len(), 1);
    assert_eq!(found.messages[0].prompt, "hello");

    // Saving again updates in place instead of duplicating.
    conversation.add_message(ConversationMessage::new("again"));
    storage.save(&conversation).unwrap();
    assert_eq!(storage.load_all().len(), 1);
    assert_eq!(storage.find(conversation.id).unwrap().messages.len(), 2);
}

#[test]
fn conversation_storage_tolerates_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let storage = ConversationStorage::new(temp_dir.path().join("absent.json"));
    assert!(storage.load_all().is_empty());
}
