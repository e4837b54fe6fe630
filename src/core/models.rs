use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Web,
    Archive,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Web => write!(f, "web"),
            TargetKind::Archive => write!(f, "archive"),
        }
    }
}

/// Where a run points. Immutable once the run starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetLocation {
    Url(Url),
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Target {
    pub kind: TargetKind,
    pub location: TargetLocation,
    pub auth_identity: Option<String>,
}

impl Target {
    pub fn web(url: Url, identity: Option<String>) -> Self {
        Self {
            kind: TargetKind::Web,
            location: TargetLocation::Url(url),
            auth_identity: identity,
        }
    }

    pub fn archive(path: PathBuf) -> Self {
        Self {
            kind: TargetKind::Archive,
            location: TargetLocation::File(path),
            auth_identity: None,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.location {
            TargetLocation::Url(url) => Some(url),
            TargetLocation::File(_) => None,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match &self.location {
            TargetLocation::File(path) => Some(path),
            TargetLocation::Url(_) => None,
        }
    }

    /// Human-readable location, used for run ids and reports
    pub fn display_location(&self) -> String {
        match &self.location {
            TargetLocation::Url(url) => url.to_string(),
            TargetLocation::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileOrigin {
    Discovered,
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitMethod {
    Get,
    Post,
}

impl SubmitMethod {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("get") {
            SubmitMethod::Get
        } else {
            SubmitMethod::Post
        }
    }
}

impl fmt::Display for SubmitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitMethod::Get => write!(f, "GET"),
            SubmitMethod::Post => write!(f, "POST"),
        }
    }
}

/// Resolved shape of a login submission. Built once, read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormProfile {
    pub submission_url: Url,
    pub method: SubmitMethod,
    pub identity_field: String,
    pub secret_field: String,
    pub auxiliary_fields: BTreeMap<String, String>,
    pub session_state: Vec<SessionCookie>,
    pub origin: ProfileOrigin,
}

impl FormProfile {
    /// Profile used when discovery cannot find a secret field
    pub fn fallback(target_url: &Url) -> Self {
        Self {
            submission_url: target_url.clone(),
            method: SubmitMethod::Post,
            identity_field: "username".to_string(),
            secret_field: "password".to_string(),
            auxiliary_fields: BTreeMap::new(),
            session_state: Vec::new(),
            origin: ProfileOrigin::Fallback,
        }
    }

    /// Ordered payload pairs for one candidate
    pub fn payload(&self, identity: Option<&str>, candidate: &str) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.auxiliary_fields.len() + 2);
        if let Some(identity) = identity {
            pairs.push((self.identity_field.clone(), identity.to_string()));
        }
        pairs.push((self.secret_field.clone(), candidate.to_string()));
        for (name, value) in &self.auxiliary_fields {
            if name != &self.identity_field && name != &self.secret_field {
                pairs.push((name.clone(), value.clone()));
            }
        }
        pairs
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptError {
    /// Connection, TLS or protocol failure
    Transport(String),
    Timeout(Duration),
    /// The key was refused by the target (archive only)
    Rejected(String),
    /// The target itself is unusable (archive only)
    Structural(String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "transport error: {}", e),
            AttemptError::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
            AttemptError::Rejected(e) => write!(f, "key rejected: {}", e),
            AttemptError::Structural(e) => write!(f, "structural failure: {}", e),
        }
    }
}

/// Raw signals of a single attempt
#[derive(Clone, Debug, Default)]
pub struct AttemptResult {
    pub status_code: Option<u16>,
    pub response_size: usize,
    pub body: String,
    pub final_location: Option<Url>,
    pub elapsed: Duration,
    pub new_session_tokens: Vec<String>,
    pub error: Option<AttemptError>,
}

impl AttemptResult {
    pub fn failed(error: AttemptError, elapsed: Duration) -> Self {
        Self {
            error: Some(error),
            elapsed,
            ..Default::default()
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.error, Some(AttemptError::Structural(_)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Success,
    Failure,
    Inconclusive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    /// Name of the rule that decided the verdict
    pub rule: Option<&'static str>,
}

impl Verdict {
    pub fn success(rule: &'static str) -> Self {
        Self { classification: Classification::Success, rule: Some(rule) }
    }

    pub fn failure() -> Self {
        Self { classification: Classification::Failure, rule: None }
    }

    pub fn inconclusive() -> Self {
        Self { classification: Classification::Inconclusive, rule: None }
    }

    pub fn is_success(&self) -> bool {
        self.classification == Classification::Success
    }
}

/// Terminal outcome of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Found,
    Exhausted,
    Cancelled,
    NoWordlists,
    StructuralFailure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Found => "found",
            Outcome::Exhausted => "exhausted",
            Outcome::Cancelled => "cancelled",
            Outcome::NoWordlists => "no wordlists",
            Outcome::StructuralFailure => "structural failure",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUsage {
    pub name: String,
    pub origin: String,
    pub candidates_tried: u64,
    pub unavailable: Option<String>,
}

/// Everything handed to the report sink once a run terminates
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub target: String,
    pub kind: TargetKind,
    pub identity: Option<String>,
    pub outcome: Outcome,
    pub candidate: Option<String>,
    pub attempts_count: u64,
    pub elapsed_ms: u128,
    pub throughput: f64,
    pub rule: Option<String>,
    pub status_code: Option<u16>,
    pub final_location: Option<String>,
    pub profile: Option<FormProfile>,
    pub discovery_note: Option<String>,
    pub structural_error: Option<String>,
    pub sources: Vec<SourceUsage>,
    pub extracted_to: Option<PathBuf>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl RunReport {
    pub fn found(&self) -> bool {
        self.outcome == Outcome::Found
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms as u64)
    }
}

pub fn throughput(attempts: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { attempts as f64 / secs } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fallback_profile_defaults() {
        let url = Url::parse("https://example.test/login").unwrap();
        let profile = FormProfile::fallback(&url);
        assert_eq!(profile.identity_field, "username");
        assert_eq!(profile.secret_field, "password");
        assert_eq!(profile.submission_url, url);
        assert_eq!(profile.method, SubmitMethod::Post);
        assert_eq!(profile.origin, ProfileOrigin::Fallback);
    }

    #[test]
    fn test_payload_keeps_auxiliary_fields() {
        let url = Url::parse("https://example.test/login").unwrap();
        let mut profile = FormProfile::fallback(&url);
        profile.auxiliary_fields.insert("csrf".into(), "abc".into());

        let payload = profile.payload(Some("admin"), "hunter2");
        assert_eq!(
            payload,
            vec![
                ("username".to_string(), "admin".to_string()),
                ("password".to_string(), "hunter2".to_string()),
                ("csrf".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_payload_without_identity() {
        let url = Url::parse("https://example.test/").unwrap();
        let profile = FormProfile::fallback(&url);
        let payload = profile.payload(None, "pin");
        assert_eq!(payload, vec![("password".to_string(), "pin".to_string())]);
    }

    #[test]
    fn test_throughput_handles_zero_elapsed() {
        assert_eq!(throughput(10, Duration::ZERO), 0.0);
        assert_eq!(throughput(10, Duration::from_secs(2)), 5.0);
    }
}
