use crate::core::models::RunReport;
use crate::utils::fs::{atomic_write, run_dir};
use crate::utils::time::human_duration;
use anyhow::{Context, Result};
use minijinja::{Environment, context};
use std::path::{Path, PathBuf};

const REPORT_TEMPLATE: &str = r#"credsweep report
================
Run ID:      {{ run_id }}
Target:      {{ target }} ({{ kind }})
{%- if identity %}
Identity:    {{ identity }}
{%- endif %}
Finished:    {{ finished_at }}

Outcome:     {{ outcome }}
{%- if candidate %}
Password:    {{ candidate }}
Rule:        {{ rule or "-" }}
{%- endif %}
{%- if final_location %}
Landed on:   {{ final_location }}
{%- endif %}
Attempts:    {{ attempts }}
Duration:    {{ duration }}
Speed:       {{ speed }} pwd/s
{%- if profile %}

Login form
  Submit to: {{ profile.method }} {{ profile.submission_url }}
  Fields:    {{ profile.identity_field }} / {{ profile.secret_field }}
  Profile:   {{ profile.origin }}
{%- for name, value in profile.auxiliary_fields|items %}
  Carried:   {{ name }}={{ value }}
{%- endfor %}
{%- endif %}
{%- if discovery_note %}
Discovery:   {{ discovery_note }}
{%- endif %}
{%- if structural_error %}
Error:       {{ structural_error }}
{%- endif %}
{%- if sources %}

Sources
{%- for source in sources %}
  - {{ source.name }} [{{ source.origin }}]: {% if source.unavailable %}unavailable ({{ source.unavailable }}){% else %}{{ source.candidates_tried }} tried{% endif %}
{%- endfor %}
{%- endif %}
{%- if extracted_to %}

Extracted to {{ extracted_to }}
{%- endif %}

credsweep {{ version }}
"#;

/// Receives the final report of every run
pub trait ReportSink: Send + Sync {
    fn deliver(&self, report: &RunReport) -> Result<()>;
}

/// Writes `report.txt` and `summary.json` under `<root>/<run_id>/`
pub struct FileReportSink {
    root: PathBuf,
}

impl FileReportSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir_for(&self, run_id: &str) -> PathBuf {
        run_dir(&self.root, run_id)
    }
}

impl ReportSink for FileReportSink {
    fn deliver(&self, report: &RunReport) -> Result<()> {
        let dir = self.dir_for(&report.run_id);
        write_text_report(report, &dir)?;
        write_json_summary(report, &dir)?;
        tracing::info!("Reports written to {}", dir.display());
        Ok(())
    }
}

pub fn render_text(report: &RunReport) -> Result<String> {
    let env = Environment::new();
    let template = env
        .template_from_str(REPORT_TEMPLATE)
        .context("Invalid report template")?;

    let rendered = template.render(context! {
        run_id => &report.run_id,
        target => &report.target,
        kind => report.kind.to_string(),
        identity => &report.identity,
        finished_at => report.finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        outcome => report.outcome.to_string(),
        candidate => &report.candidate,
        rule => &report.rule,
        final_location => &report.final_location,
        attempts => report.attempts_count,
        duration => human_duration(report.elapsed()),
        speed => format!("{:.2}", report.throughput),
        profile => &report.profile,
        discovery_note => &report.discovery_note,
        structural_error => &report.structural_error,
        sources => &report.sources,
        extracted_to => report.extracted_to.as_ref().map(|p| p.display().to_string()),
        version => env!("CARGO_PKG_VERSION"),
    })?;
    Ok(rendered)
}

fn write_text_report(report: &RunReport, dir: &Path) -> Result<()> {
    let rendered = render_text(report)?;
    atomic_write(dir.join("report.txt"), rendered.as_bytes())
}

fn write_json_summary(report: &RunReport, dir: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    atomic_write(dir.join("summary.json"), json.as_bytes())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::{FormProfile, Outcome, SourceUsage, TargetKind};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use url::Url;

    /// Keeps delivered reports in memory
    #[derive(Default)]
    pub(crate) struct MemorySink(pub Mutex<Vec<RunReport>>);

    impl ReportSink for MemorySink {
        fn deliver(&self, report: &RunReport) -> Result<()> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn report() -> RunReport {
        let url = Url::parse("https://site.test/login").unwrap();
        let mut profile = FormProfile::fallback(&url);
        profile.auxiliary_fields.insert("csrf".into(), "abc".into());
        RunReport {
            run_id: "run_site.test_login_20260101_000000".into(),
            target: url.to_string(),
            kind: TargetKind::Web,
            identity: Some("admin".into()),
            outcome: Outcome::Found,
            candidate: Some("correct".into()),
            attempts_count: 3,
            elapsed_ms: 1500,
            throughput: 2.0,
            rule: Some("redirect".into()),
            status_code: Some(200),
            final_location: Some("https://site.test/dashboard".into()),
            profile: Some(profile),
            discovery_note: Some("no password field found".into()),
            structural_error: None,
            sources: vec![SourceUsage {
                name: "common".into(),
                origin: "local".into(),
                candidates_tried: 3,
                unavailable: None,
            }],
            extracted_to: None,
            finished_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&report()).unwrap();
        assert!(text.contains("Outcome:     found"));
        assert!(text.contains("Password:    correct"));
        assert!(text.contains("Attempts:    3"));
        assert!(text.contains("Carried:   csrf=abc"));
        assert!(text.contains("- common [local]: 3 tried"));
        assert!(!text.contains("Error:"));
    }

    #[test]
    fn test_file_sink_writes_both_reports() {
        let dir = TempDir::new().unwrap();
        let sink = FileReportSink::new(dir.path());
        let report = report();
        sink.deliver(&report).unwrap();

        let run_dir = sink.dir_for(&report.run_id);
        assert!(run_dir.join("report.txt").exists());
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(run_dir.join("summary.json")).unwrap()).unwrap();
        assert_eq!(json["outcome"], "found");
        assert_eq!(json["attempts_count"], 3);
        assert_eq!(json["candidate"], "correct");
    }
}
