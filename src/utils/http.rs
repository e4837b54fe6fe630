use crate::config::HttpSettings;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

/// Build the HTTP client used for page fetches and login submissions
pub fn build_client(settings: &HttpSettings, jar: Option<Arc<Jar>>) -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_s))
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
        .user_agent(settings.user_agent.clone())
        .default_headers(headers)
        .danger_accept_invalid_certs(settings.accept_invalid_certs);

    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }

    builder.build()
}

/// Name/value pairs from a `Cookie` header value ("a=1; b=2")
pub fn cookie_pairs(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Name and value of a `Set-Cookie` header, attributes dropped
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let first = header.split(';').next()?;
    let (name, value) = first.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
