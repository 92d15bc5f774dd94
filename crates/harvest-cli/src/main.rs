use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use harvest_client::{CsvSink, ReqwestFetcher};
use harvest_core::sources;
use harvest_core::{
    CrawlConfig, CrawlReport, Crawler, Fetcher, SourcePlatform, ThrottleConfig, ThrottledFetcher,
    TracingCrawlReporter,
};

#[derive(Parser)]
#[command(name = "harvest", version, about = "Job-posting crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl job postings and write them as CSV
    Crawl(CrawlArgs),

    /// List supported sources
    Sources,
}

#[derive(clap::Args)]
struct CrawlArgs {
    /// Source to crawl (linkedin, indeed, wttj); repeat for several
    #[arg(short, long = "source", required = true)]
    sources: Vec<SourcePlatform>,

    /// Search keywords
    #[arg(short, long)]
    query: String,

    /// Location filter passed to the site search
    #[arg(short, long)]
    location: Option<String>,

    /// Result cap per source
    #[arg(long, env = "HARVEST_MAX_RESULTS")]
    max_results: Option<usize>,

    /// Concurrent workers
    #[arg(long, env = "HARVEST_MAX_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Total request budget for the run
    #[arg(long, env = "HARVEST_MAX_REQUESTS")]
    max_requests: Option<usize>,

    /// Per-request timeout in seconds (fetch + handling)
    #[arg(long, env = "HARVEST_REQUEST_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Re-enqueues allowed for a blocked listing page
    #[arg(long, env = "HARVEST_MAX_BLOCK_RETRIES")]
    max_block_retries: Option<u32>,

    /// Extra anti-bot phrase to detect; repeat for several
    #[arg(long = "block-phrase")]
    block_phrases: Vec<String>,

    /// Output CSV file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render pages in headless Chromium
    #[arg(long, default_value_t = false)]
    browser: bool,
}

impl CrawlArgs {
    /// Environment first, explicit flags on top.
    fn config(&self) -> Result<CrawlConfig> {
        let mut config = CrawlConfig::from_env().context("Invalid HARVEST_* environment")?;
        if let Some(n) = self.max_results {
            config = config.with_max_results_per_root(n);
        }
        if let Some(n) = self.concurrency {
            config = config.with_max_concurrency(n);
        }
        if let Some(n) = self.max_requests {
            config = config.with_max_requests_per_run(n);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = self.max_block_retries {
            config = config.with_max_block_retries(n);
        }
        for phrase in &self.block_phrases {
            config = config.with_block_phrase(phrase);
        }
        config.validate().context("Invalid crawl configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("harvest=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => cmd_crawl(args).await?,
        Commands::Sources => cmd_sources(),
    }

    Ok(())
}

fn cmd_sources() {
    for platform in SourcePlatform::ALL {
        let profile = sources::profile(platform);
        println!("{:<10} {:<24} {}", platform.slug(), platform, profile.search_base);
    }
}

async fn cmd_crawl(args: CrawlArgs) -> Result<()> {
    let config = args.config()?;

    let seeds = args
        .sources
        .iter()
        .map(|&platform| {
            sources::profile(platform).seed_request(
                &args.query,
                args.location.as_deref(),
                config.max_results_per_root,
            )
        })
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to build seed URLs")?;

    let sink = match &args.output {
        Some(path) => CsvSink::create(path)
            .with_context(|| format!("Cannot open output file {}", path.display()))?,
        None => CsvSink::stdout(),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received, finishing in-flight requests");
                cancel.cancel();
            }
        });
    }

    let report = if args.browser {
        crawl_with_browser(config, seeds, sink, cancel).await?
    } else {
        let fetcher = ReqwestFetcher::with_timeout(config.request_timeout)
            .context("Failed to create HTTP client")?;
        crawl(fetcher, config, seeds, sink, cancel).await?
    };

    print_summary(&report);
    Ok(())
}

#[cfg(feature = "browser")]
async fn crawl_with_browser(
    config: CrawlConfig,
    seeds: Vec<harvest_core::CrawlRequest>,
    sink: CsvSink,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let fetcher = harvest_client::BrowserFetcher::with_timeout(config.request_timeout)
        .await
        .context("Failed to launch headless browser")?;
    crawl(fetcher, config, seeds, sink, cancel).await
}

#[cfg(not(feature = "browser"))]
async fn crawl_with_browser(
    _config: CrawlConfig,
    _seeds: Vec<harvest_core::CrawlRequest>,
    _sink: CsvSink,
    _cancel: CancellationToken,
) -> Result<CrawlReport> {
    anyhow::bail!("--browser requires harvest to be built with the `browser` feature")
}

async fn crawl<F: Fetcher + 'static>(
    fetcher: F,
    config: CrawlConfig,
    seeds: Vec<harvest_core::CrawlRequest>,
    sink: CsvSink,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let fetcher = ThrottledFetcher::new(fetcher, ThrottleConfig::from(&config));
    let crawler = Crawler::new(fetcher, sink, config)?;
    let report = crawler
        .run(seeds, cancel, Arc::new(TracingCrawlReporter))
        .await
        .context("Crawl failed")?;
    Ok(report)
}

fn print_summary(report: &CrawlReport) {
    eprintln!();
    eprintln!("Requests processed: {}", report.requests_processed);
    eprintln!("Records emitted:    {}", report.records_emitted);
    eprintln!("Records dropped:    {}", report.records_dropped);
    eprintln!("Failures:           {}", report.failures.len());
    if report.budget_exhausted {
        eprintln!("Request budget exhausted before the frontier drained");
    }
    for failure in &report.failures {
        eprintln!("  [{}] {}: {}", failure.label, failure.url, failure.reason);
    }
}
