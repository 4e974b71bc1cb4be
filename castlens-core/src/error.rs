use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cast API error: {0}")]
    CastApi(#[from] CastApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CastApiError {
    #[error("Cast search returned HTTP status {status_code}")]
    RemoteStatus { status_code: u16 },

    #[error("Transport failure: {details}")]
    Transport { details: String },

    #[error("Request timeout")]
    RequestTimeout,
}

impl CastApiError {
    /// Status code carried by a non-2xx response, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CastApiError::RemoteStatus { status_code } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CastApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CastApiError::RequestTimeout
        } else {
            CastApiError::Transport {
                details: e.to_string(),
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage backend failure for {key}: {reason}")]
    Backend { key: String, reason: String },

    #[error("Failed to encode entry {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}
