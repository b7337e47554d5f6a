//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service settings, deserialized from the TOML config file.
///
/// Every field has a compiled default so a missing or partial config file
/// still yields a runnable service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bind address for the HTTP listener
    pub host: String,
    /// Bind port for the HTTP listener
    pub port: u16,
    /// Base URL prefixed onto stored-image paths to form durable URLs
    pub public_base_url: String,
    /// Remote meter-recognition endpoint
    pub ocr_url: String,
    /// Hard deadline for one recognition attempt, in seconds
    pub ocr_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            public_base_url: "http://127.0.0.1:5780".to_string(),
            ocr_url: "https://water-meter-api-732977633142.asia-southeast1.run.app/api/read-meter"
                .to_string(),
            ocr_timeout_secs: 60,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults when the
    /// file is absent. A present-but-malformed file is a hard error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match find_config_file() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))
    }
}

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file `data_root` key
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_root(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_root) = config.get("data_root").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_root);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_root()
}

/// Ensure the data folder and its media subdirectory exist
pub fn ensure_data_root(data_root: &Path) -> Result<()> {
    std::fs::create_dir_all(data_root.join("meter-images"))?;
    Ok(())
}

/// Database file path inside the data folder
pub fn database_path(data_root: &Path) -> PathBuf {
    data_root.join("wmtr.db")
}

/// Locate the platform config file, if one exists
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("wmtr").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/wmtr/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder path
fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wmtr"))
        .unwrap_or_else(|| PathBuf::from("./wmtr_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.port, 5780);
        assert_eq!(settings.ocr_timeout_secs, 60);
        assert!(settings.ocr_url.starts_with("https://"));
    }

    #[test]
    fn cli_arg_wins_over_env() {
        std::env::set_var("WMTR_TEST_ROOT_A", "/tmp/from-env");
        let root = resolve_data_root(Some("/tmp/from-cli"), "WMTR_TEST_ROOT_A");
        assert_eq!(root, PathBuf::from("/tmp/from-cli"));
        std::env::remove_var("WMTR_TEST_ROOT_A");
    }

    #[test]
    fn env_wins_when_no_cli_arg() {
        std::env::set_var("WMTR_TEST_ROOT_B", "/tmp/from-env");
        let root = resolve_data_root(None, "WMTR_TEST_ROOT_B");
        assert_eq!(root, PathBuf::from("/tmp/from-env"));
        std::env::remove_var("WMTR_TEST_ROOT_B");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("port = 9000").unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.ocr_timeout_secs, 60);
    }
}
