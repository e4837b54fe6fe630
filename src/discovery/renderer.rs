use crate::config::HttpSettings;
use crate::core::errors::DiscoveryError;
use crate::core::models::SessionCookie;
use crate::utils::http::{build_client, cookie_pairs};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// A page as seen after rendering
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: Url,
    pub cookies: Vec<SessionCookie>,
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn render(&self, url: &Url) -> Result<RenderedPage, DiscoveryError>;
}

/// Time left before `deadline`; errors once it has passed
fn budget_left(deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        anyhow::bail!("render deadline passed");
    }
    Ok(left)
}

/// Headless Chromium, for pages that build their login form in script.
///
/// The whole session runs on a blocking thread that cannot be cancelled from
/// outside, so every browser call and settle delay is held to `budget`.
pub struct BrowserRenderer {
    settle: Duration,
    budget: Duration,
}

impl BrowserRenderer {
    pub fn new(settle: Duration, budget: Duration) -> Self {
        Self { settle, budget }
    }

    fn render_sync(url: &str, settle: Duration, budget: Duration) -> Result<RenderedPage> {
        let deadline = Instant::now() + budget;
        let browser = Browser::new(
            LaunchOptions::default_builder()
                .headless(true)
                .idle_browser_timeout(budget)
                .build()
                .map_err(|e| anyhow::anyhow!("Browser launch options error: {}", e))?,
        )
        .context("Failed to launch Chrome/Chromium")?;

        let tab = browser.new_tab().context("Failed to create tab")?;
        tab.set_default_timeout(budget_left(deadline)?);
        tab.navigate_to(url).context("Failed to navigate")?;
        tab.wait_until_navigated().context("Navigation timeout")?;
        std::thread::sleep(settle.min(budget_left(deadline)?));

        // lazy widgets often load on scroll
        let _ = tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false);
        std::thread::sleep(settle.min(budget_left(deadline)?));

        tab.set_default_timeout(budget_left(deadline)?);
        let html = tab.get_content().context("Failed to read rendered DOM")?;
        let final_url = Url::parse(&tab.get_url()).context("Browser reported an invalid URL")?;
        let cookies = tab
            .get_cookies()
            .context("Failed to read browser cookies")?
            .into_iter()
            .map(|c| SessionCookie { name: c.name, value: c.value })
            .collect();

        Ok(RenderedPage { html, final_url, cookies })
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn render(&self, url: &Url) -> Result<RenderedPage, DiscoveryError> {
        tracing::info!("Rendering {} in headless browser", url);
        let url = url.to_string();
        let (settle, budget) = (self.settle, self.budget);

        tokio::task::spawn_blocking(move || Self::render_sync(&url, settle, budget))
            .await
            .map_err(|e| DiscoveryError::Render(format!("browser task aborted: {}", e)))?
            .map_err(|e| DiscoveryError::Render(format!("{:#}", e)))
    }
}

/// Plain GET of the page, for static markup or when no browser is installed
pub struct HttpRenderer {
    settings: HttpSettings,
}

impl HttpRenderer {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn render(&self, url: &Url) -> Result<RenderedPage, DiscoveryError> {
        let jar = Arc::new(Jar::default());
        let client = build_client(&self.settings, Some(jar.clone()))
            .map_err(|e| DiscoveryError::Render(e.to_string()))?;

        let response = client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                DiscoveryError::Timeout(Duration::from_secs(self.settings.timeout_s))
            } else {
                DiscoveryError::Render(e.to_string())
            }
        })?;
        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Render(e.to_string()))?;

        let cookies = jar
            .cookies(&final_url)
            .and_then(|header| header.to_str().ok().map(cookie_pairs))
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| SessionCookie { name, value })
            .collect();

        Ok(RenderedPage { html, final_url, cookies })
    }
}
