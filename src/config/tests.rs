use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn invalid_toml_handling() {
    let invalid_toml = r#"
        [provider
        chat_model = "gpt-4o-mini"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}

#[test]
fn wrong_field_type_is_rejected() {
    let invalid_toml = r#"
        [retrieval]
        top_k = "four"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}

#[test]
fn complete_valid_config() {
    let valid_toml = r#"
        [provider]
        base_url = "http://localhost:8080/v1"
        api_key_env = "LOCAL_KEY"
        chat_model = "llama3"
        embedding_model = "nomic-embed-text"
        temperature = 0.2
        batch_size = 16
        timeout_secs = 90

        [chunking]
        chunk_size = 2000
        chunk_overlap = 200

        [retrieval]
        top_k = 3
        index_name = "papers"

        [notes]
        database_id = "0123abcd"
        index_name = "my_notes"

        [tutor]
        system_prompt = "You are a patient chemistry tutor."
    "#;

    let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
    assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
    assert_eq!(config.provider.api_key_env, "LOCAL_KEY");
    assert_eq!(config.provider.batch_size, 16);
    assert_eq!(config.provider.timeout_secs, Some(90));
    assert_eq!(
        config.chunking,
        ChunkingConfig {
            chunk_size: 2000,
            chunk_overlap: 200
        }
    );
    assert_eq!(config.retrieval.index_name, "papers");
    assert_eq!(config.notes.database_id.as_deref(), Some("0123abcd"));
    assert_eq!(config.notes.token_env, "NOTION_TOKEN");
    assert_eq!(config.tutor.system_prompt, "You are a patient chemistry tutor.");
    assert!(config.validate().is_ok());
}

#[test]
fn saved_file_is_readable_toml() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_dir = temp_dir.path().join("pdf-chat");

    Config::with_base_dir(&config_dir)
        .save()
        .expect("config should save");

    let content = fs::read_to_string(config_dir.join("config.toml"))
        .expect("should read from config path successfully");
    assert!(content.contains("[provider]"));
    assert!(content.contains("[retrieval]"));
    assert!(!content.contains("base_dir"));
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::InvalidUrl("invalid-url".to_string()),
        ConfigError::InvalidBatchSize(0),
        ConfigError::InvalidModel(String::new()),
        ConfigError::InvalidTopK(0),
        ConfigError::OverlapTooLarge(10, 5),
        ConfigError::MissingDatabaseId("NOTION_DATABASE_ID".to_string()),
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10);
    }
}
