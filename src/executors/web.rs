use super::AttemptExecutor;
use crate::config::HttpSettings;
use crate::core::models::{AttemptError, AttemptResult, FormProfile, SubmitMethod};
use crate::utils::http::{build_client, cookie_pairs, parse_set_cookie};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ORIGIN, REFERER, SET_COOKIE};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Submits candidates through one cookie-bearing session
pub struct WebExecutor {
    client: Client,
    jar: Arc<Jar>,
    profile: FormProfile,
    target_url: Url,
    identity: Option<String>,
    timeout: Duration,
}

impl WebExecutor {
    pub fn new(
        profile: FormProfile,
        target_url: Url,
        identity: Option<String>,
        settings: &HttpSettings,
    ) -> reqwest::Result<Self> {
        let jar = Arc::new(Jar::default());
        for cookie in &profile.session_state {
            let pair = format!("{}={}", cookie.name, cookie.value);
            jar.add_cookie_str(&pair, &profile.submission_url);
            if target_url.host_str() != profile.submission_url.host_str() {
                jar.add_cookie_str(&pair, &target_url);
            }
        }
        let client = build_client(settings, Some(jar.clone()))?;
        Ok(Self {
            client,
            jar,
            profile,
            target_url,
            identity,
            timeout: Duration::from_secs(settings.timeout_s),
        })
    }

    /// Cookies the session would send to the login and target URLs
    fn session_cookies(&self, extra: Option<&Url>) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();
        let urls = [Some(&self.profile.submission_url), Some(&self.target_url), extra];
        for url in urls.into_iter().flatten() {
            if let Some(header) = self.jar.cookies(url) {
                if let Ok(raw) = header.to_str() {
                    cookies.extend(cookie_pairs(raw));
                }
            }
        }
        cookies
    }

    fn transport_error(&self, err: reqwest::Error) -> AttemptError {
        if err.is_timeout() {
            AttemptError::Timeout(self.timeout)
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl AttemptExecutor for WebExecutor {
    async fn attempt(&mut self, candidate: &str) -> AttemptResult {
        let started = Instant::now();
        let before = self.session_cookies(None);
        let payload = self.profile.payload(self.identity.as_deref(), candidate);
        let url = self.profile.submission_url.clone();

        let request = match self.profile.method {
            SubmitMethod::Get => self.client.get(url).query(&payload),
            SubmitMethod::Post => self.client.post(url).form(&payload),
        };
        let request = request
            .header(ORIGIN, self.target_url.origin().ascii_serialization())
            .header(REFERER, self.target_url.as_str());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Submission failed: {}", e);
                return AttemptResult::failed(self.transport_error(e), started.elapsed());
            }
        };

        let status = response.status().as_u16();
        let final_location = response.url().clone();
        let issued: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .map(|(name, _)| name)
            .collect();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return AttemptResult::failed(self.transport_error(e), started.elapsed()),
        };

        // Anything the server set on this response counts, rotated session ids included
        let mut fresh: BTreeSet<String> = self
            .session_cookies(Some(&final_location))
            .into_iter()
            .filter(|(name, value)| before.get(name) != Some(value))
            .map(|(name, _)| name)
            .collect();
        fresh.extend(issued);

        tracing::debug!(
            "Attempt answered {} from {} ({} bytes, {} new cookies)",
            status,
            final_location,
            body.len(),
            fresh.len()
        );

        AttemptResult {
            status_code: Some(status),
            response_size: body.len(),
            body,
            final_location: Some(final_location),
            elapsed: started.elapsed(),
            new_session_tokens: fresh.into_iter().collect(),
            error: None,
        }
    }
}
