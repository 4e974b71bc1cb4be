//! Client for the Neynar cast search API.
//!
//! One call, one request: `CastClient::fetch_casts` issues a single GET and
//! either returns the parsed casts or an error. Retrying is left to callers.

pub mod api;


pub use api::{CastApiClient, CastSearchResponse, CastSearchResult, CAST_SEARCH_ENDPOINT};

use castlens_core::{
    AppConfig, Cast, ConfigError, CoreError, KeywordSet, API_KEY_ENV, DEFAULT_API_BASE,
    MAX_FETCH_LIMIT,
};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct CastClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub keywords: KeywordSet,
    pub limit: u32,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl CastClientConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_keywords(mut self, keywords: KeywordSet) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for CastClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE.to_string(),
            keywords: KeywordSet::investment(),
            limit: MAX_FETCH_LIMIT,
            request_timeout: Duration::from_secs(30),
            user_agent: format!("castlens/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&AppConfig> for CastClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key().map(str::to_string),
            base_url: config.api_base_url.clone(),
            keywords: config.keyword_set(),
            limit: config.fetch_limit,
            request_timeout: config.request_timeout(),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct CastClient {
    api: CastApiClient,
    api_key: Option<String>,
    keywords: KeywordSet,
    limit: u32,
}

impl CastClient {
    pub fn new(config: CastClientConfig) -> Result<Self, CoreError> {
        let base_url = parse_base_url(&config.base_url)?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::ValidationFailed {
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        let api_key = config
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            api: CastApiClient::new(http_client, base_url),
            api_key,
            keywords: config.keywords,
            limit: config.limit.clamp(1, MAX_FETCH_LIMIT),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Fetches up to `limit` keyword-filtered casts authored by `fid`.
    pub async fn fetch_casts(&self, fid: &str) -> Result<Vec<Cast>, CoreError> {
        let fid = validate_fid(fid)?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            warn!("Cast fetch attempted without {}", API_KEY_ENV);
            ConfigError::MissingEnvironmentVariable {
                var_name: API_KEY_ENV.to_string(),
            }
        })?;

        info!("Fetching casts for fid {}", fid);
        self.api
            .search_casts(api_key, fid, self.limit, &self.keywords.query_param())
            .await
    }

    pub async fn fetch_casts_with_timeout(
        &self,
        fid: &str,
        timeout: Duration,
    ) -> Result<Vec<Cast>, CoreError> {
        match tokio::time::timeout(timeout, self.fetch_casts(fid)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Cast fetch for fid {} exceeded {:?}", fid, timeout);
                Err(CoreError::Timeout {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    /// Races the fetch against `cancel`; the in-flight request is dropped
    /// if `cancel` resolves first.
    pub async fn fetch_casts_until<C>(&self, fid: &str, cancel: C) -> Result<Vec<Cast>, CoreError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                info!("Cast fetch for fid {} cancelled", fid);
                Err(CoreError::Cancelled)
            }
            result = self.fetch_casts(fid) => result,
        }
    }
}

/// Parses the API base so endpoints resolve beneath its path. A base of
/// `https://proxy/neynar` is treated as `https://proxy/neynar/`.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: "api_base_url".to_string(),
        value: raw.to_string(),
    };

    let mut base_url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if base_url.cannot_be_a_base() {
        return Err(invalid());
    }
    if !base_url.path().ends_with('/') {
        let with_slash = format!("{}/", base_url.path());
        base_url.set_path(&with_slash);
    }
    Ok(base_url)
}

fn validate_fid(fid: &str) -> Result<&str, CoreError> {
    let fid = fid.trim();
    if fid.is_empty() || !fid.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidInput {
            message: format!("fid must be a non-empty number, got '{}'", fid),
        });
    }
    Ok(fid)
}
