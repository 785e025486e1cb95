use crate::completion::ChatBackend;
use crate::model::{ModelConfig, ModelProvider};
use crate::provider::{gemini, openai, test_provider};
use anyhow::{Context, Result};
use tracing::instrument;

/// Creates the backend for `model_config`. Fails when the backend cannot be configured, e.g. a
/// missing credential.
#[instrument(skip(model_config), fields(model = %model_config.name, provider = model_config.provider.as_str()))]
pub fn get_chat_backend(model_config: ModelConfig) -> Result<Box<dyn ChatBackend>> {
    let name = model_config.name.clone();
    let backend: Box<dyn ChatBackend> = match model_config.provider {
        ModelProvider::Gemini => Box::new(gemini::GeminiBackend::new(model_config)?),
        ModelProvider::Openai => Box::new(openai::OpenAIBackend::new(model_config)?),
        ModelProvider::Test => Box::new(
            test_provider::TestProviderModel::new(model_config)
                .context("Failed to create test backend")?,
        ),
    };
    tracing::debug!(model = %name, "Chat backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_get_chat_backend_openai_provider() {
        let model_config = ModelConfig {
            name: "gpt-4o-mini".to_string(),
            provider: ModelProvider::Openai,
            settings: HashMap::from([
                ("base_url".to_string(), "http://localhost:1234".into()),
                ("api_key".to_string(), "sk-dummy".into()),
            ]),
        };
        let backend = get_chat_backend(model_config).unwrap();
        assert_eq!(backend.name(), "gpt-4o-mini");
        assert_eq!(backend.dialect().agent_role, "assistant");
    }

    #[test]
    fn test_get_chat_backend_gemini_provider() {
        let model_config = ModelConfig {
            name: "gemini-2.5-flash".to_string(),
            provider: ModelProvider::Gemini,
            settings: HashMap::from([("api_key".to_string(), "dummy".into())]),
        };
        let backend = get_chat_backend(model_config).unwrap();
        assert_eq!(backend.dialect().agent_role, "model");
        assert_eq!(backend.dialect().system_role, Some("system"));
    }

    #[test]
    fn test_get_chat_backend_missing_credential_error() {
        let model_config = ModelConfig {
            name: "gemini-2.5-flash".to_string(),
            provider: ModelProvider::Gemini,
            settings: HashMap::from([(
                "api_key".to_string(),
                "env:NUTRITRACK_TEST_ABSENT_KEY".into(),
            )]),
        };
        let err = get_chat_backend(model_config).err().unwrap();
        assert!(
            err.to_string()
                .contains("Environment variable NUTRITRACK_TEST_ABSENT_KEY not found")
        );
    }

    #[test]
    fn test_get_chat_backend_openai_requires_base_url() {
        let model_config = ModelConfig {
            name: "gpt".to_string(),
            provider: ModelProvider::Openai,
            settings: HashMap::from([("api_key".to_string(), "sk".into())]),
        };
        assert!(get_chat_backend(model_config).is_err());
    }
}
