use castlens_core::{Cast, CastApiError, CoreError};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};
use url::Url;

pub const CAST_SEARCH_ENDPOINT: &str = "/v2/farcaster/cast/search";
pub const API_KEY_HEADER: &str = "api_key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastSearchResponse {
    pub result: CastSearchResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastSearchResult {
    pub casts: Vec<Cast>,
}

#[derive(Debug)]
pub struct CastApiClient {
    http_client: Client,
    base_url: Url,
}

impl CastApiClient {
    pub fn new(http_client: Client, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        api_key: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        // Relative join keeps any path prefix on the base, e.g. a proxy mount.
        let url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| CoreError::Internal {
            message: format!("Invalid endpoint {}: {}", endpoint, e),
        })?;
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .header(API_KEY_HEADER, api_key)
            .header("accept", "application/json");

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making cast API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                return Err(CoreError::CastApi(CastApiError::from(e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("Request failed with status: {} for {}", status, endpoint);
            return Err(CoreError::CastApi(CastApiError::RemoteStatus {
                status_code: status.as_u16(),
            }));
        }

        debug!(
            "Request successful: {} {} in {:?}",
            status,
            endpoint,
            start_time.elapsed()
        );
        Ok(response)
    }

    pub async fn search_casts(
        &self,
        api_key: &str,
        fid: &str,
        limit: u32,
        keywords: &str,
    ) -> Result<Vec<Cast>, CoreError> {
        let limit_str = limit.to_string();
        let params = [
            ("fid", fid),
            ("limit", limit_str.as_str()),
            ("keyword", keywords),
        ];

        let response = self
            .make_request(Method::GET, CAST_SEARCH_ENDPOINT, api_key, Some(&params[..]))
            .await?;

        let body = response.text().await.map_err(|e| {
            error!("Failed to read cast search body: {}", e);
            CoreError::CastApi(CastApiError::from(e))
        })?;

        let parsed: CastSearchResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse cast search response: {}", e);
            CoreError::CastApi(CastApiError::Transport {
                details: format!("Malformed cast search response for fid {}: {}", fid, e),
            })
        })?;

        info!(
            "Retrieved {} casts for fid {}",
            parsed.result.casts.len(),
            fid
        );
        Ok(parsed.result.casts)
    }
}
