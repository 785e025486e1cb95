pub(crate) mod gemini;
pub mod llm;
pub(crate) mod openai;
mod openai_types;
pub(crate) mod test_provider;

use anyhow::{Result, anyhow};

/// Resolves an `api_key` setting. `env:NAME` reads the key from the environment variable `NAME`.
pub(crate) fn resolve_api_key(value: &str) -> Result<String> {
    let key = match value.strip_prefix("env:") {
        Some(var) => {
            let var = var.trim();
            std::env::var(var).map_err(|_| anyhow!("Environment variable {} not found", var))?
        }
        None => value.to_string(),
    };

    if key.trim().is_empty() {
        return Err(anyhow!("API key is empty"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_key_literal() {
        assert_eq!(resolve_api_key("sk-123").unwrap(), "sk-123");
    }

    #[test]
    fn test_resolve_api_key_from_env() {
        unsafe {
            std::env::set_var("NUTRITRACK_TEST_RESOLVE_KEY", "from-env");
        }
        assert_eq!(
            resolve_api_key("env:NUTRITRACK_TEST_RESOLVE_KEY").unwrap(),
            "from-env"
        );
        unsafe {
            std::env::remove_var("NUTRITRACK_TEST_RESOLVE_KEY");
        }
    }

    #[test]
    fn test_resolve_api_key_missing_env() {
        let err = resolve_api_key("env:NUTRITRACK_TEST_UNSET_KEY").unwrap_err();
        assert!(
            err.to_string()
                .contains("Environment variable NUTRITRACK_TEST_UNSET_KEY not found")
        );
    }

    #[test]
    fn test_resolve_api_key_empty() {
        assert!(resolve_api_key("  ").is_err());
    }
}
