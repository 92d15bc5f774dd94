//! Extraction strategies: turn a parsed page into raw job fields or links.
//!
//! Detail pages run an ordered chain of [`DetailStrategy`] functions; the
//! first one returning `Ok(Some(_))` wins and later ones are not invoked.

pub mod block;
pub mod dom;
pub mod links;
pub mod structured;

use scraper::{Html, Selector};

use crate::error::AppError;
use crate::models::{CrawlRequest, RawJobFields};

pub use block::{BLOCK_SIGNATURES, detect_block};
pub use dom::FieldSelectors;
pub use links::{JobLink, LinkPattern, extract_job_links};

/// One way of reading a detail page.
///
/// `Ok(None)` means "nothing here, try the next strategy". An `Err` stops
/// the chain and fails the request.
pub type DetailStrategy = fn(&Html, &CrawlRequest) -> Result<Option<RawJobFields>, AppError>;

/// Run strategies in order; the first with a titled result wins.
pub fn run_chain(
    strategies: &[DetailStrategy],
    document: &Html,
    request: &CrawlRequest,
) -> Result<Option<RawJobFields>, AppError> {
    for (index, strategy) in strategies.iter().enumerate() {
        if let Some(fields) = strategy(document, request)? {
            if fields.has_title() {
                tracing::debug!(url = %request.url, strategy = index, "Strategy produced fields");
                return Ok(Some(fields));
            }
        }
    }
    Ok(None)
}

/// Parse a CSS selector, reporting failures as [`AppError::Selector`].
pub fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| AppError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
