//! Per-site knowledge: seed URLs, pagination, link patterns, selector
//! fallbacks and native vocabularies.
//!
//! Everything site-specific lives here; the router and crawler only see a
//! [`SourceProfile`].

pub mod indeed;
pub mod linkedin;
pub mod wttj;

use url::Url;

use crate::error::AppError;
use crate::extract::{DetailStrategy, LinkPattern};
use crate::models::{CrawlRequest, SourcePlatform};
use crate::normalize::Vocabulary;

/// How a listing URL encodes its position in the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `param` carries the zero-based result offset.
    Offset { param: &'static str },
    /// `param` carries a one-based page number of `per_page` results.
    Page {
        param: &'static str,
        per_page: usize,
    },
}

impl Pagination {
    fn param(&self) -> &'static str {
        match self {
            Pagination::Offset { param } | Pagination::Page { param, .. } => *param,
        }
    }

    /// Offset of the page after the one at `offset`, given how many unseen
    /// jobs it listed.
    ///
    /// Offset sources move by the new jobs only. Page sources always move a
    /// whole page, since a page that repeats a known job still occupies its
    /// page number.
    pub fn next_offset(&self, offset: usize, new_jobs: usize) -> usize {
        match self {
            Pagination::Offset { .. } => offset + new_jobs,
            Pagination::Page { per_page, .. } => {
                let per_page = (*per_page).max(1);
                (offset / per_page + 1) * per_page
            }
        }
    }

    fn value(&self, offset: usize) -> String {
        match self {
            Pagination::Offset { .. } => offset.to_string(),
            Pagination::Page { per_page, .. } => (offset / (*per_page).max(1) + 1).to_string(),
        }
    }
}

pub struct SourceProfile {
    pub platform: SourcePlatform,
    /// Listing endpoint without query string.
    pub search_base: &'static str,
    pub query_param: &'static str,
    pub location_param: &'static str,
    pub pagination: Pagination,
    pub links: LinkPattern,
    /// Tried in order on detail pages; structured data comes first.
    pub detail_strategies: &'static [DetailStrategy],
    pub vocabulary: Vocabulary,
}

impl SourceProfile {
    /// Root listing URL for a keyword search at offset zero.
    pub fn seed_url(&self, query: &str, location: Option<&str>) -> Result<String, AppError> {
        let mut url = parse(self.search_base)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(self.query_param, query.trim());
            if let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) {
                pairs.append_pair(self.location_param, location);
            }
            pairs.append_pair(self.pagination.param(), &self.pagination.value(0));
        }
        Ok(url.to_string())
    }

    /// Seed listing request for a keyword search, capped at `max_results`.
    pub fn seed_request(
        &self,
        query: &str,
        location: Option<&str>,
        max_results: usize,
    ) -> Result<CrawlRequest, AppError> {
        let url = self.seed_url(query, location)?;
        Ok(CrawlRequest::listing(url, self.platform, max_results))
    }

    /// The listing URL for `root` moved to `offset`.
    pub fn page_url(&self, root: &str, offset: usize) -> Result<String, AppError> {
        with_query_param(root, self.pagination.param(), &self.pagination.value(offset))
    }
}

/// Static profile for a platform.
pub fn profile(platform: SourcePlatform) -> &'static SourceProfile {
    match platform {
        SourcePlatform::LinkedIn => &linkedin::PROFILE,
        SourcePlatform::Indeed => &indeed::PROFILE,
        SourcePlatform::WelcomeToTheJungle => &wttj::PROFILE,
    }
}

/// Set `key=value` on `url`, replacing any existing values for `key` and
/// keeping the other parameters in place.
pub fn with_query_param(url: &str, key: &str, value: &str) -> Result<String, AppError> {
    let mut parsed = parse(url)?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
    Ok(parsed.to_string())
}

fn parse(url: &str) -> Result<Url, AppError> {
    Url::parse(url).map_err(|e| AppError::Generic(format!("invalid URL {url}: {e}")))
}
