use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model configuration for a chat backend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "type")]
    pub provider: ModelProvider,
    #[serde(default, flatten)]
    pub settings: HashMap<String, serde_yaml::Value>,
}

impl ModelConfig {
    /// Reads a provider specific setting, returning `None` when absent or of another type.
    pub fn get_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.settings
            .get(key)
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
    }
}

/// Supported backend integrations (serialized as lowercase strings).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini,
    Openai,
    Test,
}

impl From<ModelProvider> for String {
    fn from(val: ModelProvider) -> Self {
        val.as_str().into()
    }
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match &self {
            ModelProvider::Gemini => "gemini",
            ModelProvider::Openai => "openai",
            ModelProvider::Test => "test",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_flattens_settings() {
        let yaml = r#"
name: gemini-2.5-flash
type: gemini
api_key: env:GEMINI_API_KEY
persona_as_user_turn: true
"#;
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.provider, ModelProvider::Gemini);
        assert_eq!(
            config.get_setting::<String>("api_key").as_deref(),
            Some("env:GEMINI_API_KEY")
        );
        assert_eq!(config.get_setting::<bool>("persona_as_user_turn"), Some(true));
        assert_eq!(config.get_setting::<bool>("missing"), None);
    }

    #[test]
    fn test_model_provider_as_str() {
        assert_eq!(ModelProvider::Openai.as_str(), "openai");
        let s: String = ModelProvider::Test.into();
        assert_eq!(s, "test");
    }
}
