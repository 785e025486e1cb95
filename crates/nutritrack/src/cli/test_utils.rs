//! Test helpers shared by the cli and service tests.
use anyhow::Result;
use nutritrack_core::config::{Config, get_config};
use tempfile::NamedTempFile;

/// Loads a config from YAML `content` via a temporary file.
pub fn get_test_config_from_str(content: &str) -> Result<Config> {
    let mut file = NamedTempFile::new()?;
    std::io::Write::write_all(&mut file, content.as_bytes())?;
    get_config(Some(file.path().to_path_buf()))
        .map_err(|e| anyhow::anyhow!("Failed to create temp config file. Error {}", e))
}

/// A config with `test` provider models: `default`, `echo`, `error` and `mid`.
pub const BASE_TEST_CONFIG: &str = r#"
models:
  default:
    provider: test
  echo:
    provider: test
    response_mode: echo
  error:
    provider: test
    response_mode: error
  mid:
    provider: test
    response_mode: mid_stream_error
chat:
  model: default
persona:
  greeting: "Olá! O que você comeu hoje?"
  instruction: "Você é o NutriTrack AI."
  error_reply: "Erro de API."
"#;
