//! Success rules for web login responses.
//!
//! Every rule is a plain predicate over [`Evidence`]. The failure-phrase gate
//! is computed once into `Evidence::has_failure` and each rule checks it, so a
//! table may be reordered or trimmed without losing the gate.

use url::Url;

pub const FAILURE_PHRASES: &[&str] = &[
    "invalid",
    "incorrect",
    "wrong",
    "error",
    "failed",
    "not match",
    "denied",
    "unauthorized",
    "forbidden",
    "bad credentials",
    "authentication failed",
    "login failed",
];

pub const POSITIVE_PHRASES: &[&str] = &[
    "welcome",
    "dashboard",
    "logout",
    "signed in",
    "logged in",
    "successful",
    "success",
    "profile",
    "account",
    "home",
];

pub const TOKEN_MARKERS: &[&str] = &["session", "auth", "token"];

pub const DEFAULT_BULK_MIN_BYTES: usize = 1000;

/// Signals derived once per response and shared by every rule
#[derive(Debug, Clone)]
pub struct Evidence<'a> {
    pub body_lower: String,
    pub body_len: usize,
    pub status_code: Option<u16>,
    pub final_location: Option<&'a Url>,
    pub submission_url: &'a Url,
    pub target_url: &'a Url,
    pub new_session_tokens: &'a [String],
    pub has_failure: bool,
    pub has_positive: bool,
    pub bulk_min_bytes: usize,
}

impl<'a> Evidence<'a> {
    pub fn gather(
        body: &str,
        status_code: Option<u16>,
        final_location: Option<&'a Url>,
        new_session_tokens: &'a [String],
        submission_url: &'a Url,
        target_url: &'a Url,
        bulk_min_bytes: usize,
    ) -> Self {
        let body_lower = body.to_lowercase();
        let has_failure = contains_any(&body_lower, FAILURE_PHRASES);
        let has_positive = contains_any(&body_lower, POSITIVE_PHRASES);
        Self {
            body_len: body.len(),
            body_lower,
            status_code,
            final_location,
            submission_url,
            target_url,
            new_session_tokens,
            has_failure,
            has_positive,
            bulk_min_bytes,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub type Predicate = fn(&Evidence<'_>) -> bool;

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub fires: Predicate,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rule").field(&self.name).finish()
    }
}

pub fn redirected(ev: &Evidence<'_>) -> bool {
    if ev.has_failure {
        return false;
    }
    match ev.final_location {
        Some(location) => location != ev.submission_url && location != ev.target_url,
        None => false,
    }
}

pub fn positive_phrase(ev: &Evidence<'_>) -> bool {
    ev.has_positive && !ev.has_failure
}

pub fn bulk_response(ev: &Evidence<'_>) -> bool {
    !ev.has_failure
        && ev.status_code == Some(200)
        && ev.body_len > ev.bulk_min_bytes
        && (!ev.body_lower.contains("login") || ev.has_positive)
}

pub fn session_token(ev: &Evidence<'_>) -> bool {
    !ev.has_failure
        && ev.new_session_tokens.iter().any(|name| {
            let name = name.to_lowercase();
            TOKEN_MARKERS.iter().any(|marker| name.contains(marker))
        })
}

pub const REDIRECT: Rule = Rule { name: "redirect", fires: redirected };
pub const POSITIVE_PHRASE: Rule = Rule { name: "positive_phrase", fires: positive_phrase };
pub const BULK_RESPONSE: Rule = Rule { name: "bulk_response", fires: bulk_response };
pub const SESSION_TOKEN: Rule = Rule { name: "session_token", fires: session_token };

pub const DEFAULT_TABLE: [Rule; 4] = [REDIRECT, POSITIVE_PHRASE, BULK_RESPONSE, SESSION_TOKEN];

pub fn by_name(name: &str) -> Option<Rule> {
    DEFAULT_TABLE.iter().copied().find(|rule| rule.name == name)
}
