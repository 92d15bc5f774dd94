/// Smoke-test for `BrowserFetcher` against a live listing page.
///
/// Launches a headless Chromium, renders the first Welcome to the Jungle
/// search page for a query, and prints how many job links it found.
///
/// Run with:
///   cargo run -p harvest-client --example browser_smoke --features browser -- rust
use harvest_client::BrowserFetcher;
use harvest_core::extract::{detect_block, extract_job_links};
use harvest_core::models::SourcePlatform;
use harvest_core::sources;
use harvest_core::traits::Fetcher;
use scraper::Html;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let query = std::env::args().nth(1).unwrap_or_else(|| "rust".to_string());
    let profile = sources::profile(SourcePlatform::WelcomeToTheJungle);
    let request = profile.seed_request(&query, None, 30)?;

    println!("Launching headless browser...");
    let fetcher = BrowserFetcher::new().await?;

    println!("Fetching {}", request.url);
    let page = fetcher.fetch(&request).await?;

    let document = Html::parse_document(&page.content);
    if let Some(signature) = detect_block(&document, &[]) {
        anyhow::bail!("Blocked (matched {signature:?})");
    }
    let links = extract_job_links(&document, &profile.links)?;

    println!("OK: {} bytes, {} job links", page.content.len(), links.len());
    for link in links.iter().take(5) {
        println!("  {}", link.url);
    }
    Ok(())
}
