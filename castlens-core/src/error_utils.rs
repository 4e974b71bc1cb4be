use crate::error::*;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::CastApi(e) => {
                error!("Cast API error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Cache(e) => {
                error!("Session cache error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::CastApi(e) => e.is_retryable(),
            CoreError::Cache(e) => e.is_retryable(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::CastApi(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::CastApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Cache(e) => e.user_friendly_message(),
            CoreError::InvalidInput { message } => {
                format!("Invalid input: {}. Please check your input and try again.", message)
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::Cancelled => "The operation was cancelled.".to_string(),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::CastApi(_) => "CAST_API".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Cache(_) => "CACHE".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Cancelled => "CANCELLED".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for CastApiError {
    fn log_error(&self) -> &Self {
        error!("CastApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CastApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CastApiError::RemoteStatus { status_code } => {
                *status_code == 429 || *status_code >= 500
            }
            CastApiError::Transport { .. } => true,
            CastApiError::RequestTimeout => true,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CastApiError::RemoteStatus { status_code: 429 } => Some(Duration::from_secs(30)),
            _ if self.is_retryable() => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CastApiError::RemoteStatus { status_code: 401 | 403 } => {
                "The cast search API rejected the API key. Please check NEYNAR_API_KEY."
                    .to_string()
            }
            CastApiError::RemoteStatus { status_code: 429 } => {
                "Too many requests to the cast search API. Please wait and try again.".to_string()
            }
            CastApiError::RemoteStatus { status_code } => format!(
                "Failed to analyze casts (API status {}). Please try again.",
                status_code
            ),
            CastApiError::Transport { .. } => {
                "Failed to analyze casts. Please check your connection and try again.".to_string()
            }
            CastApiError::RequestTimeout => {
                "Request to the cast search API timed out. Please try again.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            CastApiError::RemoteStatus { .. } => "CAST_API_REMOTE_STATUS".to_string(),
            CastApiError::Transport { .. } => "CAST_API_TRANSPORT".to_string(),
            CastApiError::RequestTimeout => "CAST_API_TIMEOUT".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

impl ErrorExt for CacheError {
    fn log_error(&self) -> &Self {
        error!("CacheError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CacheError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Backend { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_millis(100))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        "Could not access the session cache. Results were not saved.".to_string()
    }

    fn error_code(&self) -> String {
        match self {
            CacheError::Backend { .. } => "CACHE_BACKEND".to_string(),
            CacheError::Encode { .. } => "CACHE_ENCODE".to_string(),
            CacheError::LockPoisoned => "CACHE_LOCK_POISONED".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                if let Some(retry_after) = error.retry_after() {
                    info!("Error is retryable. Retry after: {:?}", retry_after);
                }
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `max_retries` retries have been spent. The delay doubles after each
/// attempt unless the error supplies its own `retry_after`.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorExt,
{
    let mut attempt = 0;
    let mut delay = initial_delay;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= max_retries || !error.is_retryable() {
                    return Err(error);
                }

                if let Some(retry_delay) = error.retry_after() {
                    delay = retry_delay;
                }

                info!(
                    "Retrying operation (attempt {}/{}) after {:?}",
                    attempt + 1,
                    max_retries,
                    delay
                );

                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(60));
                attempt += 1;
            }
        }
    }
}
