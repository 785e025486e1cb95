//! Locations of the config file and the log data.
use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "nutritrack";

/// Config written on first run.
pub const DEFAULT_CONFIG: &str = include_str!("../data/config.yml");

/// `$XDG_CONFIG_HOME/nutritrack`, else the platform config directory.
pub fn get_config_dir() -> PathBuf {
    app_dir(std::env::var_os("XDG_CONFIG_HOME"), dirs::config_dir)
}

/// `$XDG_DATA_HOME/nutritrack`, else the platform local data directory. Created if missing.
pub fn get_data_dir() -> std::io::Result<PathBuf> {
    let path = app_dir(std::env::var_os("XDG_DATA_HOME"), dirs::data_local_dir);
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn app_dir(xdg_home: Option<OsString>, platform_dir: fn() -> Option<PathBuf>) -> PathBuf {
    xdg_home
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(platform_dir)
        .unwrap_or_default()
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_dir_prefers_xdg_home() {
        let dir = app_dir(Some("/tmp/xdg".into()), || Some(PathBuf::from("/home/u/.config")));
        assert_eq!(dir, PathBuf::from("/tmp/xdg/nutritrack"));
    }

    #[test]
    fn test_app_dir_falls_back_to_platform_dir() {
        let dir = app_dir(Some(OsString::new()), || Some(PathBuf::from("/home/u/.config")));
        assert_eq!(dir, PathBuf::from("/home/u/.config/nutritrack"));

        assert_eq!(app_dir(None, || None), PathBuf::from("nutritrack"));
    }

    #[test]
    fn test_default_config_reads_keys_from_env() {
        assert!(DEFAULT_CONFIG.contains("persona:"));
        assert!(DEFAULT_CONFIG.contains("env:GEMINI_API_KEY"));
        assert!(DEFAULT_CONFIG.contains("env:OPENAI_API_KEY"));
    }
}
