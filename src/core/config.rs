use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

/// Environment variable holding the upstream API credential. Read once at
/// startup; requests made without it fail with a non-stream error response.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Address the relay server binds to
    pub listen_addr: Option<String>,
    /// Model used when a request or command does not name one
    pub default_model: Option<String>,
    /// Override for the upstream Gemini API base URL
    pub provider_base_url: Option<String>,
    /// Relay endpoint the `say` command talks to
    pub relay_base_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("org", "permacommons", "chatrelay") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }

    pub fn listen_addr(&self) -> String {
        self.listen_addr
            .clone()
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
    }

    pub fn default_model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn relay_base_url(&self) -> String {
        self.relay_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string())
    }

    /// Upstream credential from the environment. Empty values count as unset
    /// so an accidental `GEMINI_API_KEY=` does not look configured.
    pub fn api_key() -> Option<String> {
        env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.listen_addr(), DEFAULT_LISTEN_ADDR);
        assert_eq!(config.default_model(), DEFAULT_MODEL);
        assert_eq!(config.relay_base_url(), DEFAULT_RELAY_URL);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "listen_addr = \"0.0.0.0:8080\"").unwrap();
        writeln!(file, "default_model = \"gemini-2.5-pro\"").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.default_model(), "gemini-2.5-pro");
        assert!(config.provider_base_url.is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "listen_addr = [not toml").unwrap();

        assert!(Config::load_from_path(&path).is_err());
    }
}
