use crate::error::ConfigError;
use crate::types::{KeywordSet, INVESTMENT_KEYWORDS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "NEYNAR_API_KEY";
pub const API_BASE_ENV: &str = "CASTLENS_API_BASE";
pub const SESSION_DIR_ENV: &str = "CASTLENS_SESSION_DIR";
pub const CONFIG_PATH_ENV: &str = "CASTLENS_CONFIG";

pub const DEFAULT_API_BASE: &str = "https://api.neynar.com";
/// Largest page the search endpoint serves in one call.
pub const MAX_FETCH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub neynar_api_key: Option<String>,
    pub api_base_url: String,
    pub keywords: Vec<String>,
    pub request_timeout_secs: u64,
    pub fetch_limit: u32,
    pub session_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            neynar_api_key: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            keywords: INVESTMENT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            request_timeout_secs: 30,
            fetch_limit: MAX_FETCH_LIMIT,
            session_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the optional TOML file, then the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(env_path);
        Self::from_sources(path.as_deref(), |name| std::env::var(name).ok())
    }

    pub fn from_sources<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(key) = env(API_KEY_ENV) {
            config.neynar_api_key = Some(key);
        }
        if let Some(base) = env(API_BASE_ENV) {
            config.api_base_url = base;
        }
        if let Some(dir) = env(SESSION_DIR_ENV) {
            config.session_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        debug!(
            "Loaded configuration (api key present: {})",
            config.api_key().is_some()
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        info!("Reading configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keyword_set().is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one keyword is required".to_string(),
            });
        }
        if self.fetch_limit == 0 || self.fetch_limit > MAX_FETCH_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "fetch_limit".to_string(),
                value: self.fetch_limit.to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_base_url".to_string(),
            });
        }
        Ok(())
    }

    /// The credential, treating an empty value as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.neynar_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn keyword_set(&self) -> KeywordSet {
        KeywordSet::new(&self.keywords)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = AppConfig::from_sources(None, env_from(&[])).unwrap();
        assert!(config.api_key().is_none());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE);
        assert_eq!(config.fetch_limit, 100);
        assert_eq!(config.keyword_set(), KeywordSet::investment());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "neynar_api_key = \"from-file\"\nrequest_timeout_secs = 5\nkeywords = [\"SAFE\", \"seed\"]"
        )
        .unwrap();

        let config = AppConfig::from_sources(
            Some(file.path()),
            env_from(&[(API_KEY_ENV, "from-env"), (API_BASE_ENV, "http://localhost:9")]),
        )
        .unwrap();

        assert_eq!(config.api_key(), Some("from-env"));
        assert_eq!(config.api_base_url, "http://localhost:9");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.keyword_set().query_param(), "safe,seed");
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = AppConfig::from_sources(None, env_from(&[(API_KEY_ENV, "  ")])).unwrap();
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = AppConfig::from_sources(Some(Path::new("/nonexistent/castlens.toml")), env_from(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = AppConfig {
            fetch_limit: 250,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let config = AppConfig {
            keywords: vec!["  ".to_string()],
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let err = AppConfig::from_toml_str("fetch_limit = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
