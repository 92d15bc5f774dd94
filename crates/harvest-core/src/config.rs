use std::time::Duration;

use crate::error::AppError;

/// Desktop Chrome User-Agent sent when a seed does not override it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Accept-Language sent when a seed does not override it.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7";

/// Run-level configuration for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Number of concurrent fetch-and-handle workers.
    pub max_concurrency: usize,
    /// Default result cap per listing root (seeds may carry their own).
    pub max_results_per_root: usize,
    /// How many times a blocked listing URL is re-enqueued before it is abandoned.
    pub max_block_retries: u32,
    /// Budget for one handler invocation (fetch + route).
    pub request_timeout: Duration,
    /// Total number of requests accepted into the frontier in one run.
    pub max_requests_per_run: usize,
    /// Lower bound of the random delay before detail pages.
    pub detail_delay_min: Duration,
    /// Upper bound of the random delay before detail pages.
    pub detail_delay_max: Duration,
    /// Anti-bot phrases matched in addition to the built-in list.
    pub extra_block_phrases: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            max_results_per_root: 50,
            max_block_retries: 3,
            request_timeout: Duration::from_secs(120),
            max_requests_per_run: 500,
            detail_delay_min: Duration::from_millis(1000),
            detail_delay_max: Duration::from_millis(2500),
            extra_block_phrases: Vec::new(),
        }
    }
}

impl CrawlConfig {
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_max_results_per_root(mut self, n: usize) -> Self {
        self.max_results_per_root = n;
        self
    }

    pub fn with_max_block_retries(mut self, n: u32) -> Self {
        self.max_block_retries = n;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_requests_per_run(mut self, n: usize) -> Self {
        self.max_requests_per_run = n;
        self
    }

    pub fn with_detail_delay(mut self, min: Duration, max: Duration) -> Self {
        self.detail_delay_min = min;
        self.detail_delay_max = max;
        self
    }

    pub fn with_block_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.extra_block_phrases.push(phrase.into());
        self
    }

    /// Reject configurations the crawler cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_concurrency == 0 {
            return Err(AppError::ConfigError(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.max_requests_per_run == 0 {
            return Err(AppError::ConfigError(
                "max_requests_per_run must be at least 1".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "request_timeout must be greater than zero".into(),
            ));
        }
        if self.detail_delay_min > self.detail_delay_max {
            return Err(AppError::ConfigError(format!(
                "detail delay range is inverted ({:?} > {:?})",
                self.detail_delay_min, self.detail_delay_max
            )));
        }
        Ok(())
    }

    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// - `HARVEST_MAX_CONCURRENCY`
    /// - `HARVEST_MAX_RESULTS`
    /// - `HARVEST_MAX_BLOCK_RETRIES`
    /// - `HARVEST_REQUEST_TIMEOUT_SECS`
    /// - `HARVEST_MAX_REQUESTS`
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let config = Self {
            max_concurrency: env_or("HARVEST_MAX_CONCURRENCY", defaults.max_concurrency)?,
            max_results_per_root: env_or("HARVEST_MAX_RESULTS", defaults.max_results_per_root)?,
            max_block_retries: env_or("HARVEST_MAX_BLOCK_RETRIES", defaults.max_block_retries)?,
            request_timeout: Duration::from_secs(env_or(
                "HARVEST_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_requests_per_run: env_or("HARVEST_MAX_REQUESTS", defaults.max_requests_per_run)?,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {name} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CrawlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_block_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert!(config.max_concurrency <= 2);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = CrawlConfig::default()
            .with_max_concurrency(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert!(
            CrawlConfig::default()
                .with_max_requests_per_run(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let config = CrawlConfig::default()
            .with_detail_delay(Duration::from_secs(3), Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_or_parses_and_rejects() {
        assert_eq!(env_or("HARVEST_TEST_UNSET_VARIABLE", 7usize).unwrap(), 7);

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("HARVEST_TEST_BAD_NUMBER", "-3") };
        assert!(env_or::<usize>("HARVEST_TEST_BAD_NUMBER", 1).is_err());
        unsafe { std::env::remove_var("HARVEST_TEST_BAD_NUMBER") };
    }
}
