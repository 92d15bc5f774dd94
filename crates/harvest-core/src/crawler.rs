use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{CrawlConfig, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use crate::error::AppError;
use crate::frontier::{EnqueueResult, Frontier};
use crate::models::{CrawlFailure, CrawlRequest, NormalizedJob, RequestLabel};
use crate::router::{RouteOutcome, Router};
use crate::traits::{Fetcher, Sink};

/// Upper bound on how long an idle worker sleeps between queue checks.
const IDLE_BACKSTOP: Duration = Duration::from_millis(250);

/// Events emitted by the crawler for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    Started {
        seeds: usize,
        workers: usize,
    },
    RequestClaimed {
        request: &'a CrawlRequest,
    },
    RequestCompleted {
        url: &'a str,
        label: RequestLabel,
        enqueued: usize,
    },
    RecordEmitted {
        record: &'a NormalizedJob,
    },
    RequestFailed {
        url: &'a str,
        label: RequestLabel,
        error: &'a str,
    },
    BudgetExhausted {
        accepted: usize,
    },
    Finished {
        report: &'a CrawlReport,
    },
}

/// Trait for receiving crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::Started { seeds, workers } => {
                tracing::info!(%seeds, %workers, "Crawl started");
            }
            CrawlEvent::RequestClaimed { request } => {
                tracing::debug!(url = %request.url, label = %request.label, "Request claimed");
            }
            CrawlEvent::RequestCompleted {
                url,
                label,
                enqueued,
            } => {
                tracing::debug!(%url, %label, %enqueued, "Request completed");
            }
            CrawlEvent::RecordEmitted { record } => {
                tracing::info!(title = %record.title, url = %record.url, "Record emitted");
            }
            CrawlEvent::RequestFailed { url, label, error } => {
                tracing::warn!(%url, %label, %error, "Request failed");
            }
            CrawlEvent::BudgetExhausted { accepted } => {
                tracing::warn!(%accepted, "Request budget exhausted, discarding new requests");
            }
            CrawlEvent::Finished { report } => {
                tracing::info!(
                    processed = report.requests_processed,
                    emitted = report.records_emitted,
                    dropped = report.records_dropped,
                    failed = report.failures.len(),
                    "Crawl finished"
                );
            }
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub requests_processed: usize,
    pub records_emitted: usize,
    pub records_dropped: usize,
    pub failures: Vec<CrawlFailure>,
    pub budget_exhausted: bool,
}

/// Runs a crawl: a pool of workers pulling from one shared frontier.
pub struct Crawler<F: Fetcher, S: Sink> {
    fetcher: F,
    sink: S,
    config: CrawlConfig,
}

impl<F, S> Crawler<F, S>
where
    F: Fetcher + 'static,
    S: Sink + 'static,
{
    /// Fails with [`AppError::ConfigError`] if the configuration is invalid.
    pub fn new(fetcher: F, sink: S, config: CrawlConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            fetcher,
            sink,
            config,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl from `seeds` until the frontier drains or `cancel` fires.
    ///
    /// Per-request failures are collected in the report; only a failing
    /// final sink flush makes the run itself fail.
    pub async fn run<R: CrawlReporter + 'static>(
        &self,
        seeds: Vec<CrawlRequest>,
        cancel: CancellationToken,
        reporter: Arc<R>,
    ) -> Result<CrawlReport, AppError> {
        let ctx = Arc::new(RunContext {
            fetcher: self.fetcher.clone(),
            sink: self.sink.clone(),
            router: Router::new(&self.config),
            frontier: Frontier::new(self.config.max_requests_per_run),
            request_timeout: self.config.request_timeout,
            processed: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            budget_reported: AtomicBool::new(false),
        });

        let headers = default_headers();
        let seed_count = seeds.len();
        for seed in seeds {
            let seed = seed.inherit_headers(&headers);
            let url = seed.url.clone();
            match ctx.frontier.enqueue(seed) {
                EnqueueResult::Accepted => {}
                EnqueueResult::Duplicate => tracing::debug!(%url, "Duplicate seed ignored"),
                EnqueueResult::OverBudget => ctx.report_budget(reporter.as_ref()),
            }
        }

        let workers = self.config.max_concurrency;
        reporter.report(CrawlEvent::Started {
            seeds: seed_count,
            workers,
        });

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let ctx = ctx.clone();
            let reporter = reporter.clone();
            let cancel = cancel.clone();
            set.spawn(async move { ctx.work(worker_id, cancel, reporter.as_ref()).await });
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Crawl worker panicked");
            }
        }

        if cancel.is_cancelled() {
            tracing::info!(pending = ctx.frontier.pending(), "Crawl cancelled");
        }

        self.sink.flush()?;

        let report = ctx.report();
        reporter.report(CrawlEvent::Finished { report: &report });
        Ok(report)
    }
}

/// Headers every seed carries unless it sets its own.
fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        (
            "Accept-Language".to_string(),
            DEFAULT_ACCEPT_LANGUAGE.to_string(),
        ),
    ])
}

/// State shared by all workers of one run.
struct RunContext<F, S> {
    fetcher: F,
    sink: S,
    router: Router,
    frontier: Frontier,
    request_timeout: Duration,
    processed: AtomicUsize,
    emitted: AtomicUsize,
    dropped: AtomicUsize,
    failures: Mutex<Vec<CrawlFailure>>,
    budget_reported: AtomicBool,
}

impl<F: Fetcher, S: Sink> RunContext<F, S> {
    async fn work<R: CrawlReporter>(&self, worker_id: usize, cancel: CancellationToken, reporter: &R) {
        tracing::debug!(worker_id, "Worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let notified = self.frontier.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(request) = self.frontier.claim() {
                reporter.report(CrawlEvent::RequestClaimed { request: &request });
                self.process(request, reporter).await;
                self.frontier.complete();
                continue;
            }

            if self.frontier.is_drained() {
                break;
            }

            tokio::select! {
                () = notified.as_mut() => {}
                () = tokio::time::sleep(IDLE_BACKSTOP) => {}
                () = cancel.cancelled() => break,
            }
        }
        // Peers parked on the queue re-check the drain condition.
        self.frontier.wake_all();
        tracing::debug!(worker_id, "Worker stopped");
    }

    async fn process<R: CrawlReporter>(&self, request: CrawlRequest, reporter: &R) {
        let result = tokio::time::timeout(self.request_timeout, async {
            let page = self.fetcher.fetch(&request).await?;
            self.router.route(&page, &self.frontier)
        })
        .await
        .unwrap_or_else(|_| Err(AppError::Timeout(self.request_timeout.as_secs())));

        self.processed.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(outcome) => self.apply(&request, outcome, reporter),
            Err(error) => {
                if error.is_skip_status() {
                    tracing::info!(url = %request.url, error = %error, "Skipping request");
                } else if !error.is_transport() {
                    tracing::error!(url = %request.url, error = %error, "Handler error");
                }
                self.record_failure(&request, error.to_string(), reporter);
            }
        }
    }

    fn apply<R: CrawlReporter>(&self, request: &CrawlRequest, outcome: RouteOutcome, reporter: &R) {
        let mut enqueued = 0;
        for next in outcome.enqueue {
            match self.frontier.enqueue(next) {
                EnqueueResult::Accepted => enqueued += 1,
                EnqueueResult::Duplicate => {}
                EnqueueResult::OverBudget => self.report_budget(reporter),
            }
        }

        if let Some(record) = outcome.record {
            match self.sink.push(record.clone()) {
                Ok(()) => {
                    self.emitted.fetch_add(1, Ordering::SeqCst);
                    reporter.report(CrawlEvent::RecordEmitted { record: &record });
                }
                Err(e) => self.record_failure(request, e.to_string(), reporter),
            }
        }

        if outcome.dropped {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }

        if let Some(failure) = outcome.failure {
            reporter.report(CrawlEvent::RequestFailed {
                url: &failure.url,
                label: failure.label,
                error: &failure.reason,
            });
            self.lock_failures().push(failure);
        }

        reporter.report(CrawlEvent::RequestCompleted {
            url: &request.url,
            label: request.label,
            enqueued,
        });
    }

    fn record_failure<R: CrawlReporter>(&self, request: &CrawlRequest, reason: String, reporter: &R) {
        reporter.report(CrawlEvent::RequestFailed {
            url: &request.url,
            label: request.label,
            error: &reason,
        });
        self.lock_failures().push(CrawlFailure {
            url: request.url.clone(),
            label: request.label,
            reason,
        });
    }

    fn report_budget<R: CrawlReporter>(&self, reporter: &R) {
        if !self.budget_reported.swap(true, Ordering::SeqCst) {
            reporter.report(CrawlEvent::BudgetExhausted {
                accepted: self.frontier.accepted(),
            });
        }
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, Vec<CrawlFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self) -> CrawlReport {
        CrawlReport {
            requests_processed: self.processed.load(Ordering::SeqCst),
            records_emitted: self.emitted.load(Ordering::SeqCst),
            records_dropped: self.dropped.load(Ordering::SeqCst),
            failures: self.lock_failures().clone(),
            budget_exhausted: self.frontier.budget_exhausted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageResult, SourcePlatform};
    use crate::testutil::{
        MemorySink, MockFetcher, MockReporter, MockResponse, blocked_page, indeed_listing,
        job_keys, job_posting_page,
    };

    const ROOT: &str = "https://fr.indeed.com/jobs?q=rust&start=0";

    fn page_url(offset: usize) -> String {
        format!("https://fr.indeed.com/jobs?q=rust&start={offset}")
    }

    fn detail_url(key: &str) -> String {
        format!("https://fr.indeed.com/viewjob?jk={key}")
    }

    fn seed(max_results: usize) -> CrawlRequest {
        CrawlRequest::listing(ROOT, SourcePlatform::Indeed, max_results)
    }

    /// Listing page at `offset` with `count` fresh keys, plus their detail pages.
    fn with_listing(mut fetcher: MockFetcher, offset: usize, count: usize) -> MockFetcher {
        let keys = job_keys(offset, count);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        fetcher = fetcher.with_page(&page_url(offset), indeed_listing(&refs));
        for key in &keys {
            fetcher = fetcher.with_page(&detail_url(key), job_posting_page(&format!("Job {key}"), "Acme"));
        }
        fetcher
    }

    fn crawler(fetcher: MockFetcher, sink: MemorySink, config: CrawlConfig) -> Crawler<MockFetcher, MemorySink> {
        Crawler::new(fetcher, sink, config).unwrap()
    }

    fn listing_calls(fetcher: &MockFetcher) -> Vec<String> {
        fetcher
            .calls()
            .into_iter()
            .filter(|r| r.label == RequestLabel::Listing)
            .map(|r| r.url)
            .collect()
    }

    #[tokio::test]
    async fn pagination_stops_at_the_result_cap() {
        let mut fetcher = MockFetcher::new();
        for offset in [0, 10, 20, 30] {
            fetcher = with_listing(fetcher, offset, 10);
        }
        let sink = MemorySink::new();
        let report = crawler(fetcher.clone(), sink.clone(), CrawlConfig::default())
            .run(vec![seed(25)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        let mut listings = listing_calls(&fetcher);
        listings.sort();
        assert_eq!(listings, vec![page_url(0), page_url(10), page_url(20)]);
        assert_eq!(fetcher.call_count(&page_url(30)), 0);
        assert_eq!(report.records_emitted, 30);
        assert_eq!(sink.records().len(), 30);
        assert_eq!(report.requests_processed, 33);
        assert!(report.failures.is_empty());
        assert_eq!(sink.flush_count(), 1);
    }

    #[tokio::test]
    async fn blocked_listing_is_retried_three_times_then_abandoned() {
        let fetcher = MockFetcher::new().with_page(ROOT, blocked_page());
        let reporter = Arc::new(MockReporter::new());
        let report = crawler(fetcher.clone(), MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(25)], CancellationToken::new(), reporter.clone())
            .await
            .unwrap();

        // One original fetch plus three re-enqueued attempts.
        assert_eq!(fetcher.call_count(ROOT), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, ROOT);
        assert_eq!(reporter.count("RequestFailed"), 1);
    }

    #[tokio::test]
    async fn block_then_recovery_continues_the_crawl() {
        let keys = job_keys(0, 2);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let mut fetcher = MockFetcher::new().with_sequence(
            ROOT,
            vec![
                MockResponse::html(blocked_page()),
                MockResponse::html(indeed_listing(&refs)),
            ],
        );
        for key in &keys {
            fetcher = fetcher.with_page(&detail_url(key), job_posting_page("Dev", "Acme"));
        }
        let report = crawler(fetcher.clone(), MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(2)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(ROOT), 2);
        assert_eq!(report.records_emitted, 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn duplicate_anchors_fetch_one_detail() {
        let key = "00000000000000ab";
        let fetcher = MockFetcher::new()
            .with_page(ROOT, indeed_listing(&[key, key, key]))
            .with_page(&detail_url(key), job_posting_page("Dev", "Acme"));
        let report = crawler(fetcher.clone(), MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(50)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(&detail_url(key)), 1);
        assert_eq!(report.records_emitted, 1);
    }

    #[tokio::test]
    async fn request_budget_caps_the_run() {
        let fetcher = with_listing(MockFetcher::new(), 0, 10);
        let reporter = Arc::new(MockReporter::new());
        let config = CrawlConfig::default().with_max_requests_per_run(5);
        let report = crawler(fetcher.clone(), MemorySink::new(), config)
            .run(vec![seed(50)], CancellationToken::new(), reporter.clone())
            .await
            .unwrap();

        assert_eq!(fetcher.calls().len(), 5);
        assert_eq!(report.requests_processed, 5);
        assert!(report.budget_exhausted);
        assert_eq!(reporter.count("BudgetExhausted"), 1);
    }

    #[tokio::test]
    async fn skip_statuses_do_not_stop_the_run() {
        let keys = job_keys(0, 2);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let fetcher = MockFetcher::new()
            .with_page(ROOT, indeed_listing(&refs))
            .with_status(&detail_url(&keys[0]), 403)
            .with_page(&detail_url(&keys[1]), job_posting_page("Dev", "Acme"));
        let report = crawler(fetcher, MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(2)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert_eq!(report.records_emitted, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("403"));
    }

    #[tokio::test]
    async fn titleless_details_are_dropped_silently() {
        let key = "00000000000000cd";
        let fetcher = MockFetcher::new()
            .with_page(ROOT, indeed_listing(&[key]))
            .with_page(&detail_url(key), "<html><body><p>No title here</p></body></html>");
        let report = crawler(fetcher, MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(1)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert_eq!(report.records_emitted, 0);
        assert_eq!(report.records_dropped, 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn seeds_carry_default_headers() {
        let fetcher = MockFetcher::new().with_page(ROOT, indeed_listing(&[]));
        let custom = seed(10).with_header("User-Agent", "custom-agent");
        crawler(fetcher.clone(), MemorySink::new(), CrawlConfig::default())
            .run(vec![custom], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        let call = &fetcher.calls()[0];
        assert_eq!(call.headers["User-Agent"], "custom-agent");
        assert_eq!(call.headers["Accept-Language"], DEFAULT_ACCEPT_LANGUAGE);
    }

    #[tokio::test]
    async fn cancelled_run_claims_nothing() {
        let fetcher = with_listing(MockFetcher::new(), 0, 3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = crawler(fetcher.clone(), MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(10)], cancel, Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert!(fetcher.calls().is_empty());
        assert_eq!(report.requests_processed, 0);
    }

    #[tokio::test]
    async fn sink_errors_are_per_record() {
        let fetcher = with_listing(MockFetcher::new(), 0, 2);
        let sink = MemorySink::with_push_error(AppError::SinkError("disk full".into()));
        let report = crawler(fetcher, sink.clone(), CrawlConfig::default().with_max_concurrency(1))
            .run(vec![seed(2)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert_eq!(report.records_emitted, 1);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(report.failures.len(), 1);
    }

    #[derive(Clone)]
    struct SlowFetcher;

    impl Fetcher for SlowFetcher {
        async fn fetch(&self, request: &CrawlRequest) -> Result<PageResult, AppError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(PageResult::new(request.clone(), 200, "<html></html>"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handlers_time_out() {
        let config = CrawlConfig::default().with_request_timeout(Duration::from_secs(5));
        let report = Crawler::new(SlowFetcher, MemorySink::new(), config)
            .unwrap()
            .run(vec![seed(10)], CancellationToken::new(), Arc::new(MockReporter::new()))
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("timed out"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CrawlConfig::default().with_max_concurrency(0);
        let result = Crawler::new(MockFetcher::new(), MemorySink::new(), config);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[tokio::test]
    async fn lifecycle_events_are_reported() {
        let fetcher = with_listing(MockFetcher::new(), 0, 1);
        let reporter = Arc::new(MockReporter::new());
        crawler(fetcher, MemorySink::new(), CrawlConfig::default())
            .run(vec![seed(1)], CancellationToken::new(), reporter.clone())
            .await
            .unwrap();

        assert_eq!(reporter.count("Started"), 1);
        assert_eq!(reporter.count("RequestClaimed"), 2);
        assert_eq!(reporter.count("RequestCompleted"), 2);
        assert_eq!(reporter.count("RecordEmitted"), 1);
        assert_eq!(reporter.count("Finished"), 1);
    }
}
