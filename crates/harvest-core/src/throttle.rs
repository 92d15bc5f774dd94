//! Request pacing for polite fetching.
//!
//! Wraps any [`Fetcher`] and delays requests before they reach it:
//! detail pages wait a random interval drawn from `[detail_min,
//! detail_max]`, and requests to the same host are spaced at least
//! `domain_spacing` apart. Listing pages are never jittered.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use harvest_core::throttle::{ThrottleConfig, ThrottledFetcher};
//!
//! # use harvest_core::traits::Fetcher;
//! # use harvest_core::models::{CrawlRequest, PageResult};
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &CrawlRequest) -> Result<PageResult, harvest_core::AppError> { todo!() }
//! # }
//! let config = ThrottleConfig::new(Duration::from_millis(1000), Duration::from_millis(2500))
//!     .with_domain_spacing(Duration::from_millis(500));
//! let fetcher = ThrottledFetcher::new(MyFetcher, config);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::models::{CrawlRequest, PageResult, RequestLabel};
use crate::traits::Fetcher;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Lower bound of the pre-fetch delay for detail pages.
    pub detail_min: Duration,
    /// Upper bound of the pre-fetch delay for detail pages.
    pub detail_max: Duration,
    /// Minimum gap between two requests to the same host. Zero disables it.
    pub domain_spacing: Duration,
}

impl ThrottleConfig {
    pub fn new(detail_min: Duration, detail_max: Duration) -> Self {
        Self {
            detail_min,
            detail_max,
            domain_spacing: Duration::ZERO,
        }
    }

    pub fn with_domain_spacing(mut self, spacing: Duration) -> Self {
        self.domain_spacing = spacing;
        self
    }

    /// No delays at all.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Random delay for one detail request, uniform in `[min, max]`.
    fn detail_delay(&self) -> Duration {
        let min = self.detail_min.as_millis() as u64;
        let max = self.detail_max.as_millis() as u64;
        if max <= min {
            return self.detail_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_millis(2500))
    }
}

impl From<&CrawlConfig> for ThrottleConfig {
    fn from(config: &CrawlConfig) -> Self {
        Self::new(config.detail_delay_min, config.detail_delay_max)
    }
}

/// A [`Fetcher`] wrapper that paces requests.
///
/// Thread-safe: concurrent callers to the same host are serialised by the
/// spacing map, callers to different hosts are independent.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    /// Last request time per host key.
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            last_request: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Host key of a URL (scheme://host:port).
    fn domain_key(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?;
        let port = url
            .port_or_known_default()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Some(format!("{}://{}{}", url.scheme(), host, port))
    }

    /// Reserve the next slot for `domain` and sleep until it comes.
    async fn wait_for_domain(&self, domain: &str) {
        let slot = {
            let mut map = self.last_request.lock().await;
            let now = Instant::now();
            let slot = match map.get(domain) {
                Some(&last) => (last + self.config.domain_spacing).max(now),
                None => now,
            };
            map.insert(domain.to_string(), slot);
            slot
        };
        if slot > Instant::now() {
            tracing::debug!(
                domain = %domain,
                sleep_ms = %(slot - Instant::now()).as_millis(),
                "Spacing request"
            );
            tokio::time::sleep_until(slot).await;
        }
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, request: &CrawlRequest) -> Result<PageResult, AppError> {
        if request.label == RequestLabel::Detail {
            let delay = self.config.detail_delay();
            if !delay.is_zero() {
                tracing::debug!(url = %request.url, delay_ms = %delay.as_millis(), "Detail jitter");
                tokio::time::sleep(delay).await;
            }
        }
        if !self.config.domain_spacing.is_zero() {
            if let Some(domain) = Self::domain_key(&request.url) {
                self.wait_for_domain(&domain).await;
            }
        }
        self.inner.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourcePlatform;
    use crate::testutil::MockFetcher;

    fn listing(url: &str) -> CrawlRequest {
        CrawlRequest::listing(url, SourcePlatform::Indeed, 10)
    }

    fn detail(url: &str) -> CrawlRequest {
        CrawlRequest::detail(url, SourcePlatform::Indeed, "1")
    }

    #[test]
    fn domain_key_extracts_correctly() {
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::domain_key("https://example.com/path?q=1"),
            Some("https://example.com:443".to_string())
        );
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::domain_key("http://example.com:8080/page"),
            Some("http://example.com:8080".to_string())
        );
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::domain_key("not-a-url"),
            None
        );
    }

    #[test]
    fn detail_delay_is_bounded() {
        let config = ThrottleConfig::default();
        for _ in 0..200 {
            let d = config.detail_delay();
            assert!(d >= Duration::from_millis(1000));
            assert!(d <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn degenerate_range_uses_min() {
        let config = ThrottleConfig::new(Duration::from_millis(300), Duration::from_millis(300));
        assert_eq!(config.detail_delay(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn detail_requests_are_jittered() {
        let inner = MockFetcher::new().with_page("http://example.com/job/1", "<html>ok</html>");
        let fetcher = ThrottledFetcher::new(inner, ThrottleConfig::default());

        let start = Instant::now();
        fetcher.fetch(&detail("http://example.com/job/1")).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "elapsed: {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(2600), "elapsed: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn listing_requests_are_not_jittered() {
        let inner = MockFetcher::new().with_page("http://example.com/jobs", "<html>ok</html>");
        let fetcher = ThrottledFetcher::new(inner, ThrottleConfig::default());

        let start = Instant::now();
        fetcher.fetch(&listing("http://example.com/jobs")).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn same_domain_requests_are_spaced() {
        let inner = MockFetcher::new()
            .with_page("http://example.com/a", "<html>a</html>")
            .with_page("http://example.com/b", "<html>b</html>")
            .with_page("http://other.com/a", "<html>c</html>");
        let config = ThrottleConfig::disabled().with_domain_spacing(Duration::from_millis(200));
        let fetcher = ThrottledFetcher::new(inner, config);

        let start = Instant::now();
        fetcher.fetch(&listing("http://example.com/a")).await.unwrap();
        fetcher.fetch(&listing("http://other.com/a")).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));

        fetcher.fetch(&listing("http://example.com/b")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let inner = MockFetcher::new().with_status("http://example.com/gone", 404);
        let fetcher = ThrottledFetcher::new(inner, ThrottleConfig::disabled());

        let err = fetcher.fetch(&listing("http://example.com/gone")).await.unwrap_err();
        assert!(matches!(err, AppError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn crawl_config_bounds_carry_over() {
        let config = CrawlConfig::default()
            .with_detail_delay(Duration::from_millis(10), Duration::from_millis(20));
        let throttle = ThrottleConfig::from(&config);
        assert_eq!(throttle.detail_min, Duration::from_millis(10));
        assert_eq!(throttle.detail_max, Duration::from_millis(20));
    }
}
