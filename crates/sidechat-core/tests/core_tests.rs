use sidechat_core::config::Settings;
use sidechat_core::project::{list_workspace_files, FileSelection};
use sidechat_core::*;
use tempfile::TempDir;

// ========================================================================
// Settings Tests (config/mod.rs)
// ========================================================================

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.llm.model, "gpt-4o");
    assert_eq!(settings.llm.base_url, "https://api.openai.com/v1");
    assert_eq!(settings.llm.api_key_env, "OPENAI_API_KEY");
    assert!(settings.llm.stream);

    assert!(settings.chat.system_prompt.is_none());
    assert!(!settings.chat.fallback_message.is_empty());
    assert_eq!(settings.chat.max_file_bytes, 256 * 1024);
}

#[test]
fn test_settings_save_and_reload_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut settings = Settings::default();
    settings.llm.model = "test-model".to_string();
    settings.llm.stream = false;
    settings.chat.system_prompt = Some("You are a code assistant.".to_string());

    settings.save_to(&config_path).unwrap();
    let loaded = Settings::load_from(&config_path).unwrap();

    assert_eq!(loaded, settings);
}

#[test]
fn test_settings_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[llm]\nmodel = \"local-model\"\n").unwrap();

    let loaded = Settings::load_from(&config_path).unwrap();

    assert_eq!(loaded.llm.model, "local-model");
    assert_eq!(loaded.llm.api_key_env, "OPENAI_API_KEY");
    assert_eq!(loaded.chat, Settings::default().chat);
}

#[test]
fn test_settings_invalid_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[llm\nmodel = ").unwrap();

    let err = Settings::load_from(&config_path).unwrap_err();
    assert!(matches!(err, SidechatError::Config(_)));
}

#[test]
fn test_settings_api_key_reads_from_env() {
    std::env::set_var("TEST_API_KEY_SIDECHAT", "test-key-12345");

    let mut settings = Settings::default();
    settings.llm.api_key_env = "TEST_API_KEY_SIDECHAT".to_string();

    assert_eq!(settings.api_key(), Some("test-key-12345".to_string()));
    assert!(settings.build_llm_client().is_ok());

    std::env::remove_var("TEST_API_KEY_SIDECHAT");
}

#[test]
fn test_settings_missing_api_key_is_config_error() {
    let mut settings = Settings::default();
    settings.llm.api_key_env = "NONEXISTENT_KEY_SIDECHAT_TEST".to_string();

    assert!(settings.api_key().is_none());
    let err = settings.build_llm_client().err().unwrap();
    assert!(err.to_string().contains("NONEXISTENT_KEY_SIDECHAT_TEST"));
}

#[test]
fn test_settings_build_session_applies_chat_settings() {
    let mut settings = Settings::default();
    settings.chat.system_prompt = Some("sys".to_string());

    let session = settings.build_session(Box::new(OpenAIClient::new("k").with_model("m")));

    assert_eq!(session.history().system_prompt(), Some("sys"));
    assert_eq!(session.model(), "m");
}

// ========================================================================
// ConversationHistory Tests (context/history.rs)
// ========================================================================

#[test]
fn test_conversation_history_add_messages() {
    let mut history = ConversationHistory::new();

    history.add_user_message("Hello");
    history.add_assistant_message("Hi there!");
    history.add_user_message("How are you?");

    let messages = history.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].text(), "Hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[2].text(), "How are you?");
}

// ========================================================================
// Workspace Tests (project/workspace.rs)
// ========================================================================

#[test]
fn test_selected_workspace_files_attach_to_session() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    std::fs::write(tmp.path().join("src/lib.rs"), "pub fn f() {}\n").unwrap();
    std::fs::write(tmp.path().join("README.md"), "# readme\n").unwrap();

    let entries = list_workspace_files(tmp.path());
    let mut selection = FileSelection::new();
    for entry in entries.iter().filter(|e| !e.is_dir()) {
        selection.toggle(&entry.path);
    }
    assert_eq!(selection.labels(), "README.md, lib.rs");

    let mut pending = PendingAttachments::new();
    for path in selection.selected() {
        pending.add_file(FileAttachment::read(tmp.path(), path, 1024).unwrap());
    }
    assert_eq!(pending.files.len(), 2);
    assert_eq!(pending.files[1].path, "src/lib.rs");
    assert_eq!(pending.files[1].contents, "pub fn f() {}\n");
}
