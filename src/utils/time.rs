use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-_\.]+").expect("static regex"));

const MAX_TARGET_LEN: usize = 48;

/// Run identifier: sanitized target plus a UTC timestamp, safe as a
/// directory name
pub fn new_run_id(target: &str) -> String {
    run_id_at(target, Utc::now())
}

fn run_id_at(target: &str, at: DateTime<Utc>) -> String {
    format!("run_{}_{}", sanitize_target(target), at.format("%Y%m%d_%H%M%S"))
}

fn sanitize_target(target: &str) -> String {
    let stripped = target
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let cleaned = UNSAFE_CHARS.replace_all(stripped, "_");
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');
    let mut cleaned: String = cleaned.chars().take(MAX_TARGET_LEN).collect();
    if cleaned.is_empty() {
        cleaned.push_str("target");
    }
    cleaned
}

/// "1h 02m 03s" style rendering for reports
pub fn human_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        0..=59 => format!("{:.1}s", elapsed.as_secs_f64()),
        60..=3599 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60),
    }
}
