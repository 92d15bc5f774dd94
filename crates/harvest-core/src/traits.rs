use std::future::Future;

use crate::error::AppError;
use crate::models::{CrawlRequest, NormalizedJob, PageResult};

/// Fetches a page for a crawl request.
///
/// Implementations map non-success statuses to [`AppError::HttpStatus`],
/// timeouts to [`AppError::Timeout`] and connection problems to
/// [`AppError::NetworkError`].
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        request: &CrawlRequest,
    ) -> impl Future<Output = Result<PageResult, AppError>> + Send;
}

/// Receives normalized job records.
///
/// `push` must not block the crawl for long: buffer or hand off.
/// Records may arrive in any order.
pub trait Sink: Send + Sync + Clone {
    fn push(&self, record: NormalizedJob) -> Result<(), AppError>;

    /// Flush buffered records. Called once when the run ends.
    fn flush(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// A Sink that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn push(&self, _record: NormalizedJob) -> Result<(), AppError> {
        Ok(())
    }
}
