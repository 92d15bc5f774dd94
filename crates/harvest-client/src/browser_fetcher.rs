use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use harvest_core::config::DEFAULT_USER_AGENT;
use harvest_core::error::AppError;
use harvest_core::models::{CrawlRequest, PageResult};
use harvest_core::traits::Fetcher;

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Renders JavaScript before returning the HTML, which listing pages built
/// client-side need. One Chromium process is shared by all clones; each
/// fetch opens a tab, applies the request's headers, reads the rendered DOM
/// and closes the tab.
///
/// A browser cannot observe the HTTP status of the main document through
/// this API, so successful fetches report status 200 and blocks are left to
/// content-based detection.
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl BrowserFetcher {
    /// Launches a headless Chromium with a 60 s navigation timeout.
    pub async fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(60)).await
    }

    pub async fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg(format!("--user-agent={DEFAULT_USER_AGENT}"))
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Generic(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
        })
    }

    /// `CHROME_BIN` first, then well-known install locations.
    ///
    /// The snap wrapper at `/snap/bin/chromium` strips unknown flags, so the
    /// binary inside the snap is preferred.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    async fn render(&self, request: &CrawlRequest) -> Result<String, AppError> {
        let url = &request.url;
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to open tab: {e}")))?;

        if !request.headers.is_empty() {
            let headers = serde_json::to_value(&request.headers)?;
            page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
                .await
                .map_err(|e| AppError::NetworkError(format!("Failed to set headers: {e}")))?;
        }

        page.goto(url.as_str())
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to navigate to {url}: {e}")))?;
        page.find_element("body")
            .await
            .map_err(|e| AppError::NetworkError(format!("Page did not render body: {e}")))?;

        let html = page
            .content()
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to read page content: {e}")));
        let _ = page.close().await;
        html
    }
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, request: &CrawlRequest) -> Result<PageResult, AppError> {
        let html = tokio::time::timeout(self.timeout, self.render(request))
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))??;
        Ok(PageResult::new(request.clone(), 200, html))
    }
}
