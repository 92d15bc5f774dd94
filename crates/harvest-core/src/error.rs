use thiserror::Error;

/// Application-wide error types for Harvest.
#[derive(Error, Debug)]
pub enum AppError {
    /// The server answered with a non-success status code.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// An anti-bot interstitial was served instead of the page.
    #[error("Blocked by anti-bot page at {url} (matched {signature:?})")]
    Blocked { url: String, signature: String },

    /// An extraction rule (e.g. a job id pattern) cannot be applied.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// An embedded structured-data block could not be parsed.
    #[error("Malformed structured block: {0}")]
    MalformedBlock(String),

    /// A CSS selector failed to parse.
    #[error("Invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    /// The record sink rejected a write or could not be opened.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Invalid run configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the fetch itself failed (status, timeout, network).
    ///
    /// Transport errors skip the single request; they never abort the run.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpStatus { .. } | AppError::Timeout(_) | AppError::NetworkError(_)
        )
    }

    /// Returns true for 403/404 answers, which are skipped and logged.
    pub fn is_skip_status(&self) -> bool {
        matches!(self, AppError::HttpStatus { status: 403 | 404, .. })
    }

    /// Returns true if this error must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::ConfigError(_) | AppError::SinkError(_))
    }
}
