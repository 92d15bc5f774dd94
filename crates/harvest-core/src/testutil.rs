//! Test utilities: mock implementations of the core traits and page fixtures.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::crawler::{CrawlEvent, CrawlReporter};
use crate::error::AppError;
use crate::models::{CrawlRequest, NormalizedJob, PageResult, SourcePlatform};
use crate::traits::{Fetcher, Sink};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// One scripted answer of [`MockFetcher`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    Html(String),
    Status(u16),
    Timeout,
}

impl MockResponse {
    pub fn html(body: impl Into<String>) -> Self {
        MockResponse::Html(body.into())
    }
}

/// Mock fetcher keyed by URL.
///
/// Each URL has a sequence of responses; every call consumes the first one
/// except the last, which repeats. Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<CrawlRequest>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with_sequence(url, vec![MockResponse::html(html)])
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_sequence(url, vec![MockResponse::Status(status)])
    }

    pub fn with_sequence(self, url: &str, responses: Vec<MockResponse>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), responses);
        self
    }

    /// Every request fetched so far, in call order.
    pub fn calls(&self) -> Vec<CrawlRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &CrawlRequest) -> Result<PageResult, AppError> {
        self.calls.lock().unwrap().push(request.clone());

        let response = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&request.url) {
                Some(seq) if seq.len() > 1 => Some(seq.remove(0)),
                Some(seq) => seq.first().cloned(),
                None => None,
            }
        };

        match response {
            Some(MockResponse::Html(body)) => Ok(PageResult::new(request.clone(), 200, body)),
            Some(MockResponse::Status(status)) => Err(AppError::HttpStatus {
                status,
                url: request.url.clone(),
            }),
            Some(MockResponse::Timeout) => Err(AppError::Timeout(30)),
            None => Err(AppError::HttpStatus {
                status: 404,
                url: request.url.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Sink that keeps records in memory.
#[derive(Clone, Default)]
pub struct MemorySink {
    pub records: Arc<Mutex<Vec<NormalizedJob>>>,
    flushes: Arc<Mutex<usize>>,
    push_error: Arc<Mutex<Option<AppError>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose next push fails with `error`.
    pub fn with_push_error(error: AppError) -> Self {
        let sink = Self::default();
        *sink.push_error.lock().unwrap() = Some(error);
        sink
    }

    pub fn records(&self) -> Vec<NormalizedJob> {
        self.records.lock().unwrap().clone()
    }

    pub fn flush_count(&self) -> usize {
        *self.flushes.lock().unwrap()
    }
}

impl Sink for MemorySink {
    fn push(&self, record: NormalizedJob) -> Result<(), AppError> {
        if let Some(e) = self.push_error.lock().unwrap().take() {
            return Err(e);
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    fn flush(&self) -> Result<(), AppError> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Crawl reporter that records event names.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == name)
            .count()
    }
}

impl CrawlReporter for MockReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        let label = match &event {
            CrawlEvent::Started { .. } => "Started",
            CrawlEvent::RequestClaimed { .. } => "RequestClaimed",
            CrawlEvent::RequestCompleted { .. } => "RequestCompleted",
            CrawlEvent::RecordEmitted { .. } => "RecordEmitted",
            CrawlEvent::RequestFailed { .. } => "RequestFailed",
            CrawlEvent::BudgetExhausted { .. } => "BudgetExhausted",
            CrawlEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Page fixtures
// ---------------------------------------------------------------------------

/// Indeed-style listing with one `a[data-jk]` anchor per key.
pub fn indeed_listing(job_keys: &[&str]) -> String {
    let items: String = job_keys
        .iter()
        .map(|jk| {
            format!(
                r#"<li><h2><a class="jcs-JobTitle" data-jk="{jk}" href="/rc/clk?jk={jk}">Job {jk}</a></h2></li>"#
            )
        })
        .collect();
    format!("<html><head><title>Emplois</title></head><body><ul>{items}</ul></body></html>")
}

/// Hex job keys `start..start+count`, formatted like Indeed keys.
pub fn job_keys(start: usize, count: usize) -> Vec<String> {
    (start..start + count).map(|n| format!("{n:016x}")).collect()
}

/// Detail page with a JSON-LD `JobPosting` and no DOM markup.
pub fn job_posting_page(title: &str, company: &str) -> String {
    let block = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "JobPosting",
        "title": title,
        "hiringOrganization": {"@type": "Organization", "name": company},
        "jobLocation": {"@type": "Place", "address": {"addressLocality": "Paris"}},
        "employmentType": "FULL_TIME",
        "datePosted": "2024-03-15T10:00:00Z",
        "description": "<p>Nous recherchons un profil junior.</p>",
    });
    format!(
        r#"<html><head><title>{title}</title><script type="application/ld+json">{block}</script></head><body></body></html>"#
    )
}

/// Anti-bot interstitial.
pub fn blocked_page() -> String {
    "<html><head><title>Just a moment...</title></head><body><p>Checking your browser before accessing.</p></body></html>".to_string()
}

/// A normalized record with plausible values.
pub fn sample_job() -> NormalizedJob {
    NormalizedJob {
        source_platform: SourcePlatform::WelcomeToTheJungle,
        title: "Backend Engineer".to_string(),
        company: Some("Acme".to_string()),
        location: Some("Paris".to_string()),
        contract: Some("CDI".to_string()),
        remote: Some("Télétravail partiel".to_string()),
        salary: Some(45000),
        currency: Some("EUR".to_string()),
        description: Some("Build services, in Rust.\n\nProfil : 3-5 ans".to_string()),
        requirements: Some("3-5 ans".to_string()),
        experience_level: Some(crate::models::ExperienceLevel::Mid),
        education_level: None,
        published_at: Some("2024-03-15".to_string()),
        url: "https://www.welcometothejungle.com/fr/companies/acme/jobs/backend".to_string(),
        detected_at: Utc::now(),
    }
}
