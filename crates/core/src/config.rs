use std::{
    collections::HashMap,
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    assets::{DEFAULT_CONFIG, get_config_dir},
    model::ModelConfig,
};

const DEFAULT_GREETING: &str = "Olá! Eu sou seu assistente NutriTrack IA. Informe-me o que você comeu (ex: 'Lentilha, arroz e salada de tomate') para receber a análise e dicas vegetarianas.";

const DEFAULT_INSTRUCTION: &str = "Você é o NutriTrack AI, um especialista em nutrição focado em dietas vegetarianas. \
1. Analise o alimento ou refeição fornecida pelo usuário. \
2. Retorne uma tabela formatada em MARKDOWN com 7 colunas (Calorias, Açúcar, Vitamina C, Proteína, Ferro, Carboidratos, Gorduras). \
3. Sempre adicione uma breve dica de alimentação focada em vegetarianos, especialmente sobre como obter nutrientes como Ferro e Proteína. \
4. Mantenha um tom profissional e amigável.";

const DEFAULT_ERROR_REPLY: &str =
    "Erro na comunicação com a IA. Tente novamente ou verifique sua chave de API.";

#[derive(Error, Debug)]
pub enum NutriConfigError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YAMLError(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Generation parameters sent with every request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProfileConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1024,
        }
    }
}

/// Fixed texts that shape the assistant.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PersonaConfig {
    /// Seeded as the first agent turn of every session.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Sent ahead of the history on every request.
    #[serde(default = "default_instruction")]
    pub instruction: String,
    /// Shown and recorded in place of a reply when the backend fails.
    #[serde(default = "default_error_reply")]
    pub error_reply: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            instruction: default_instruction(),
            error_reply: default_error_reply(),
        }
    }
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_instruction() -> String {
    DEFAULT_INSTRUCTION.to_string()
}

fn default_error_reply() -> String {
    DEFAULT_ERROR_REPLY.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModeConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub models: HashMap<String, ModelConfig>,
    pub profiles: HashMap<String, ProfileConfig>,
    pub chat: ModeConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Config {
    /// Resolves a model by its key in `models`, or the chat model when `None`.
    pub fn model_or_default(&self, key: Option<&str>) -> Result<ModelConfig, NutriConfigError> {
        match key {
            Some(k) => self
                .models
                .get(k)
                .cloned()
                .ok_or_else(|| NutriConfigError::Config(format!("Model '{k}' not found"))),
            None => Ok(self.chat.model.clone()),
        }
    }
}

fn default_theme() -> String {
    "light".to_string()
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum StringOrObject<T> {
    String(String),
    Object(T),
}

#[derive(Deserialize, Debug)]
struct RawConfig {
    models: HashMap<String, ModelConfig>,
    #[serde(default)]
    profiles: HashMap<String, ProfileConfig>,
    chat: RawModeConfig,
    #[serde(default)]
    persona: Option<PersonaConfig>,
    theme: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawModeConfig {
    model: StringOrObject<ModelConfig>,
    #[serde(default)]
    profile: Option<StringOrObject<ProfileConfig>>,
}

impl RawConfig {
    #[instrument]
    fn to_config(&self) -> Result<Config, NutriConfigError> {
        let mut models_with_names = HashMap::new();
        for (k, v) in &self.models {
            // Model name defaults to its key
            let model_name = if v.name.is_empty() {
                k.clone()
            } else {
                v.name.clone()
            };
            let model = ModelConfig {
                name: model_name,
                ..v.clone()
            };
            models_with_names.insert(k.clone(), model);
        }

        let chat_model = match &self.chat.model {
            StringOrObject::String(s) => models_with_names
                .get(s)
                .cloned()
                .ok_or_else(|| NutriConfigError::Config(format!("Model '{s}' not found")))?,
            StringOrObject::Object(m) => m.clone(),
        };

        let chat_profile = match &self.chat.profile {
            Some(StringOrObject::String(s)) => self
                .profiles
                .get(s)
                .cloned()
                .ok_or_else(|| NutriConfigError::Config(format!("Profile '{s}' not found")))?,
            Some(StringOrObject::Object(p)) => p.clone(),
            None => ProfileConfig::default(),
        };

        let persona = self.persona.clone().unwrap_or_default();
        if persona.instruction.trim().is_empty() {
            return Err(NutriConfigError::Config(
                "Persona instruction must not be empty".to_string(),
            ));
        }

        Ok(Config {
            models: models_with_names,
            profiles: self.profiles.clone(),
            chat: ModeConfig {
                model: chat_model,
                profile: chat_profile,
            },
            persona,
            theme: self.theme.clone().unwrap_or_else(default_theme),
        })
    }
}

#[instrument(skip(config_path))]
pub fn create_or_get_config_file(
    config_path: Option<PathBuf>,
) -> Result<(bool, PathBuf), NutriConfigError> {
    let actual_path = config_path.unwrap_or_else(|| get_config_dir().join("nutritrack.yml"));

    let parent_dir = actual_path.parent().ok_or_else(|| {
        NutriConfigError::IO(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Config path has no parent directory",
        ))
    })?;

    if !parent_dir.exists() {
        fs::create_dir_all(parent_dir)?;
    }

    if actual_path.exists() {
        Ok((true, actual_path))
    } else {
        File::create(&actual_path)?.write_all(DEFAULT_CONFIG.as_bytes())?;
        Ok((false, actual_path))
    }
}

#[instrument(skip(config_path))]
pub fn get_config(config_path: Option<PathBuf>) -> Result<Config, NutriConfigError> {
    let (_, config_file) = create_or_get_config_file(config_path)?;
    let content = fs::read_to_string(&config_file)?;
    let raw: RawConfig = serde_yaml::from_str(&content)?;
    raw.to_config()
}
