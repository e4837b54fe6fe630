pub mod forms;
pub mod renderer;

use crate::config::{DiscoverySettings, HttpSettings};
use crate::core::errors::DiscoveryError;
use crate::core::models::FormProfile;
use std::time::Duration;
use url::Url;

pub use forms::classify_page;
pub use renderer::{BrowserRenderer, HttpRenderer, PageRenderer, RenderedPage};

/// Resolves a web target's login form by rendering the page with the first
/// renderer that works, then classifying its controls.
pub struct FormDiscovery {
    renderers: Vec<Box<dyn PageRenderer>>,
    render_timeout: Duration,
}

impl FormDiscovery {
    pub fn new(render_timeout: Duration) -> Self {
        Self {
            renderers: Vec::new(),
            render_timeout,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Browser first when enabled, plain fetch as the fallback
    pub fn from_settings(discovery: &DiscoverySettings, http: &HttpSettings, use_browser: bool) -> Self {
        let timeout = Duration::from_secs(discovery.render_timeout_s);
        let mut this = Self::new(timeout);
        if use_browser && discovery.browser {
            this = this.with_renderer(Box::new(BrowserRenderer::new(
                Duration::from_millis(discovery.settle_ms),
                timeout,
            )));
        }
        this.with_renderer(Box::new(HttpRenderer::new(http.clone())))
    }

    pub async fn discover(&self, url: &Url) -> Result<FormProfile, DiscoveryError> {
        let mut last_error = DiscoveryError::Render("no renderer configured".to_string());

        for renderer in &self.renderers {
            let page = match tokio::time::timeout(self.render_timeout, renderer.render(url)).await {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => {
                    tracing::warn!("{} renderer failed on {}: {}", renderer.name(), url, e);
                    last_error = e;
                    continue;
                }
                Err(_) => {
                    tracing::warn!("{} renderer timed out on {}", renderer.name(), url);
                    last_error = DiscoveryError::Timeout(self.render_timeout);
                    continue;
                }
            };

            return match classify_page(&page.html, &page.final_url) {
                Some(mut profile) => {
                    profile.session_state = page.cookies;
                    tracing::info!(
                        "Discovered form via {}: {} {} (identity '{}', secret '{}', {} auxiliary)",
                        renderer.name(),
                        profile.method,
                        profile.submission_url,
                        profile.identity_field,
                        profile.secret_field,
                        profile.auxiliary_fields.len()
                    );
                    Ok(profile)
                }
                None => Err(DiscoveryError::NoSecretField(url.to_string())),
            };
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::SessionCookie;
    use async_trait::async_trait;

    struct FixedPage(&'static str);

    #[async_trait]
    impl PageRenderer for FixedPage {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn render(&self, url: &Url) -> Result<RenderedPage, DiscoveryError> {
            Ok(RenderedPage {
                html: self.0.to_string(),
                final_url: url.clone(),
                cookies: vec![SessionCookie { name: "sid".into(), value: "1".into() }],
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl PageRenderer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn render(&self, _url: &Url) -> Result<RenderedPage, DiscoveryError> {
            Err(DiscoveryError::Render("no chromium".into()))
        }
    }

    struct Stalled;

    #[async_trait]
    impl PageRenderer for Stalled {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn render(&self, _url: &Url) -> Result<RenderedPage, DiscoveryError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(DiscoveryError::Render("unreachable".into()))
        }
    }

    fn target() -> Url {
        Url::parse("https://app.example.test/").unwrap()
    }

    #[tokio::test]
    async fn test_falls_back_to_next_renderer() {
        let discovery = FormDiscovery::new(Duration::from_secs(5))
            .with_renderer(Box::new(Broken))
            .with_renderer(Box::new(FixedPage(
                r#"<form><input name="user"><input type="password" name="pass"></form>"#,
            )));

        let profile = discovery.discover(&target()).await.unwrap();
        assert_eq!(profile.secret_field, "pass");
        assert_eq!(profile.session_state.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timeout() {
        let discovery = FormDiscovery::new(Duration::from_secs(2)).with_renderer(Box::new(Stalled));
        let err = discovery.discover(&target()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_page_without_password() {
        let discovery = FormDiscovery::new(Duration::from_secs(5))
            .with_renderer(Box::new(FixedPage("<p>Welcome</p>")));
        let err = discovery.discover(&target()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NoSecretField(_)));
    }

    #[tokio::test]
    async fn test_no_renderers() {
        let err = FormDiscovery::new(Duration::from_secs(1)).discover(&target()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Render(_)));
    }
}
