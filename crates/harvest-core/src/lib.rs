pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod models;
pub mod normalize;
pub mod router;
pub mod sources;
pub mod throttle;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use config::CrawlConfig;
pub use crawler::{CrawlEvent, CrawlReport, CrawlReporter, Crawler, TracingCrawlReporter};
pub use error::AppError;
pub use models::{
    CrawlFailure, CrawlRequest, EducationLevel, ExperienceLevel, NormalizedJob, PageResult,
    RawJobFields, RequestLabel, SourcePlatform,
};
pub use throttle::{ThrottleConfig, ThrottledFetcher};
pub use traits::{Fetcher, NullSink, Sink};
