//! Label-dispatched handling of fetched pages.
//!
//! A handler never touches the queue or the sink directly: it reads the
//! page, updates per-key frontier bookkeeping, and returns a
//! [`RouteOutcome`] the crawler applies.

use scraper::Html;
use serde_json::Value;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::extract::{detect_block, extract_job_links, run_chain};
use crate::frontier::Frontier;
use crate::models::{
    BLOCK_RETRIES_KEY, CrawlFailure, CrawlRequest, MAX_RESULTS_KEY, NormalizedJob, OFFSET_KEY,
    PageResult, ROOT_KEY, RequestLabel,
};
use crate::normalize::normalize_job;
use crate::sources;

/// What handling one page produced.
#[derive(Debug, Default)]
pub struct RouteOutcome {
    /// Follow-up requests: detail pages, the next listing page, or a retry.
    pub enqueue: Vec<CrawlRequest>,
    pub record: Option<NormalizedJob>,
    /// Set when the request is abandoned for good.
    pub failure: Option<CrawlFailure>,
    /// A detail page that yielded no usable record.
    pub dropped: bool,
}

impl RouteOutcome {
    fn abandoned(request: &CrawlRequest, error: &AppError) -> Self {
        Self {
            failure: Some(CrawlFailure {
                url: request.url.clone(),
                label: request.label,
                reason: error.to_string(),
            }),
            ..Self::default()
        }
    }
}

type Handler = fn(&Router, &PageResult, &Html, &Frontier) -> Result<RouteOutcome, AppError>;

fn handler_for(label: RequestLabel) -> Handler {
    match label {
        RequestLabel::Listing => Router::handle_listing,
        RequestLabel::Detail => Router::handle_detail,
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    max_block_retries: u32,
    default_max_results: usize,
    extra_block_phrases: Vec<String>,
}

impl Router {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            max_block_retries: config.max_block_retries,
            default_max_results: config.max_results_per_root,
            extra_block_phrases: config.extra_block_phrases.clone(),
        }
    }

    /// Handle one fetched page.
    ///
    /// Non-success statuses are returned as [`AppError::HttpStatus`];
    /// extraction errors (bad selectors) propagate. Everything else,
    /// including blocks and title-less pages, is an `Ok` outcome.
    pub fn route(&self, page: &PageResult, frontier: &Frontier) -> Result<RouteOutcome, AppError> {
        if page.status_code >= 400 {
            return Err(AppError::HttpStatus {
                status: page.status_code,
                url: page.request.url.clone(),
            });
        }
        let document = Html::parse_document(&page.content);
        handler_for(page.request.label)(self, page, &document, frontier)
    }

    fn handle_listing(
        &self,
        page: &PageResult,
        document: &Html,
        frontier: &Frontier,
    ) -> Result<RouteOutcome, AppError> {
        let request = &page.request;

        if let Some(signature) = detect_block(document, &self.extra_block_phrases) {
            let attempts = frontier.record_block(&request.url);
            if attempts <= self.max_block_retries {
                tracing::warn!(
                    url = %request.url,
                    %signature,
                    attempt = attempts,
                    max = self.max_block_retries,
                    "Listing blocked, re-enqueueing"
                );
                let retry = request
                    .clone()
                    .forced()
                    .with_user_data(BLOCK_RETRIES_KEY, Value::from(attempts));
                return Ok(RouteOutcome {
                    enqueue: vec![retry],
                    ..RouteOutcome::default()
                });
            }
            let error = AppError::Blocked {
                url: request.url.clone(),
                signature,
            };
            tracing::warn!(url = %request.url, attempts, "Listing still blocked, abandoning");
            return Ok(RouteOutcome::abandoned(request, &error));
        }

        let profile = sources::profile(request.source);
        let root = request.root().to_string();
        let max_results = request.max_results().unwrap_or(self.default_max_results);

        let mut enqueue = Vec::new();
        for link in extract_job_links(document, &profile.links)? {
            if !frontier.mark_job_seen(request.source, &link.id) {
                continue;
            }
            enqueue.push(
                CrawlRequest::detail(link.url, request.source, &link.id)
                    .with_user_data(ROOT_KEY, Value::String(root.clone()))
                    .inherit_headers(&request.headers),
            );
        }
        let found = enqueue.len();

        if found == 0 {
            tracing::info!(url = %request.url, "No new jobs on listing page, stopping pagination");
            return Ok(RouteOutcome::default());
        }

        let next_offset =
            frontier.advance_cursor(&root, profile.pagination.next_offset(request.offset(), found));
        tracing::info!(url = %request.url, found, next_offset, max_results, "Listing page processed");

        if next_offset < max_results {
            let next_url = profile.page_url(&root, next_offset)?;
            enqueue.push(
                CrawlRequest::new(next_url, RequestLabel::Listing, request.source)
                    .with_user_data(ROOT_KEY, Value::String(root))
                    .with_user_data(OFFSET_KEY, Value::from(next_offset as u64))
                    .with_user_data(MAX_RESULTS_KEY, Value::from(max_results as u64))
                    .inherit_headers(&request.headers),
            );
        }

        Ok(RouteOutcome {
            enqueue,
            ..RouteOutcome::default()
        })
    }

    fn handle_detail(
        &self,
        page: &PageResult,
        document: &Html,
        _frontier: &Frontier,
    ) -> Result<RouteOutcome, AppError> {
        let request = &page.request;

        if let Some(signature) = detect_block(document, &self.extra_block_phrases) {
            let error = AppError::Blocked {
                url: request.url.clone(),
                signature,
            };
            tracing::warn!(url = %request.url, error = %error, "Detail page blocked");
            return Ok(RouteOutcome::abandoned(request, &error));
        }

        let profile = sources::profile(request.source);
        let Some(fields) = run_chain(profile.detail_strategies, document, request)? else {
            tracing::debug!(url = %request.url, "No strategy produced a titled record");
            return Ok(RouteOutcome {
                dropped: true,
                ..RouteOutcome::default()
            });
        };

        match normalize_job(fields, request.source, &profile.vocabulary, &request.url) {
            Some(record) => Ok(RouteOutcome {
                record: Some(record),
                ..RouteOutcome::default()
            }),
            None => {
                tracing::debug!(url = %request.url, "Record dropped after normalization");
                Ok(RouteOutcome {
                    dropped: true,
                    ..RouteOutcome::default()
                })
            }
        }
    }
}
