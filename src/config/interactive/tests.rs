use serial_test::serial;
use std::env;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

use super::*;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let config = load_existing_config(temp_dir.path());

    assert_eq!(config, Config::with_base_dir(temp_dir.path()));
    assert!(!config.provider.chat_model.is_empty());
    assert!(config.provider.batch_size > 0);
}

#[test]
fn load_existing_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let mut saved = Config::with_base_dir(temp_dir.path());
    saved.retrieval.top_k = 9;
    saved.save().expect("config should save");

    let config = load_existing_config(temp_dir.path());

    assert_eq!(config.retrieval.top_k, 9);
}

#[test]
fn show_config_with_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    assert!(show_config(temp_dir.path()).is_ok());
}

#[tokio::test]
#[serial]
async fn connection_check_uses_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer sk-check"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    // SAFETY: serialized with every other test that touches the environment
    unsafe {
        env::set_var("PDF_CHAT_CHECK_KEY", "sk-check");
    }

    let provider = ProviderConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key_env: "PDF_CHAT_CHECK_KEY".to_string(),
        ..ProviderConfig::default()
    };
    let result = tokio::task::spawn_blocking(move || test_provider_connection(&provider))
        .await
        .expect("blocking task should finish");

    // SAFETY: see above
    unsafe {
        env::remove_var("PDF_CHAT_CHECK_KEY");
    }

    assert_eq!(result, Ok(()));
}

#[test]
fn connection_check_without_key() {
    let provider = ProviderConfig {
        api_key_env: "PDF_CHAT_CHECK_KEY_SURELY_UNSET".to_string(),
        ..ProviderConfig::default()
    };

    assert_eq!(
        test_provider_connection(&provider),
        Err(ProviderError::MissingApiKey(
            "PDF_CHAT_CHECK_KEY_SURELY_UNSET".to_string()
        ))
    );
}
