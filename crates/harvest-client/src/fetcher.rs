use std::time::Duration;

use harvest_core::config::{DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use harvest_core::error::AppError;
use harvest_core::models::{CrawlRequest, PageResult};
use harvest_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue};

/// HTTP fetcher using reqwest.
///
/// Sends the request's own headers on top of client defaults (a desktop
/// Chrome User-Agent and a French Accept-Language). Non-success statuses
/// become [`AppError::HttpStatus`]; the body is not read for them.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut defaults = HeaderMap::new();
        defaults.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(defaults)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn request_headers(request: &CrawlRequest) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Generic(format!("Invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Generic(format!("Invalid value for header {name}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &CrawlRequest) -> Result<PageResult, AppError> {
        let headers = Self::request_headers(request)?;

        let response = self
            .client
            .get(&request.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::NetworkError(format!("Failed to read response body: {e}"))
            }
        })?;

        tracing::debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "Fetched");
        Ok(PageResult::new(request.clone(), status.as_u16(), body))
    }
}
