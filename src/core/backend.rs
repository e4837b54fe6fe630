use super::errors::{EngineError, PrepareError};
use super::models::{FormProfile, Outcome, RunReport, Target};
use crate::classifier::rules::{self, Rule};
use crate::classifier::{ArchiveClassifier, OutcomeClassifier, WebClassifier};
use crate::config::{ClassifierSettings, HttpSettings};
use crate::discovery::FormDiscovery;
use crate::executors::archive::extract_all;
use crate::executors::{ArchiveExecutor, AttemptExecutor, WebExecutor};
use crate::utils::fs::extraction_dir;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the search loop needs for one target
pub struct Prepared {
    pub executor: Box<dyn AttemptExecutor>,
    pub classifier: Box<dyn OutcomeClassifier>,
    /// Pause after each attempt
    pub pacing: Duration,
    pub profile: Option<FormProfile>,
    /// Why the fallback profile is in use, if it is
    pub discovery_note: Option<String>,
}

/// Target-kind specific setup ahead of the search
#[async_trait]
pub trait TargetBackend: Send + Sync {
    async fn prepare(&self, target: &Target) -> Result<Prepared, PrepareError>;

    /// Hook run on the finished report before it is delivered
    async fn finalize(&self, _target: &Target, _report: &mut RunReport) {}
}

pub struct WebBackend {
    discovery: FormDiscovery,
    http: HttpSettings,
    table: Vec<Rule>,
    bulk_min_bytes: usize,
    pacing: Duration,
}

impl WebBackend {
    pub fn new(
        discovery: FormDiscovery,
        http: HttpSettings,
        classifier: &ClassifierSettings,
        pacing: Duration,
    ) -> Self {
        let table: Vec<Rule> = classifier
            .rules
            .iter()
            .filter_map(|name| rules::by_name(name))
            .collect();
        Self {
            discovery,
            http,
            table,
            bulk_min_bytes: classifier.bulk_min_bytes,
            pacing,
        }
    }
}

#[async_trait]
impl TargetBackend for WebBackend {
    async fn prepare(&self, target: &Target) -> Result<Prepared, PrepareError> {
        let url = target
            .url()
            .ok_or_else(|| EngineError::KindMismatch("web run needs a URL target".to_string()))?;

        let (profile, discovery_note) = match self.discovery.discover(url).await {
            Ok(profile) => (profile, None),
            Err(e) => {
                tracing::warn!("Form discovery failed, using default field names: {}", e);
                (FormProfile::fallback(url), Some(e.to_string()))
            }
        };

        let executor = WebExecutor::new(
            profile.clone(),
            url.clone(),
            target.auth_identity.clone(),
            &self.http,
        )
        .map_err(EngineError::from)?;
        let classifier = WebClassifier::with_table(
            self.table.clone(),
            profile.submission_url.clone(),
            url.clone(),
            self.bulk_min_bytes,
        );

        Ok(Prepared {
            executor: Box::new(executor),
            classifier: Box::new(classifier),
            pacing: self.pacing,
            profile: Some(profile),
            discovery_note,
        })
    }
}

#[derive(Default)]
pub struct ArchiveBackend {
    /// Output root; when set, a found key is used to extract the archive
    extract_root: Option<PathBuf>,
}

impl ArchiveBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extracting_into(root: impl Into<PathBuf>) -> Self {
        Self {
            extract_root: Some(root.into()),
        }
    }
}

#[async_trait]
impl TargetBackend for ArchiveBackend {
    async fn prepare(&self, target: &Target) -> Result<Prepared, PrepareError> {
        let path = target
            .path()
            .ok_or_else(|| EngineError::KindMismatch("archive run needs a file target".to_string()))?;
        let executor = ArchiveExecutor::open(path)?;
        tracing::debug!("Integrity probe entry: {}", executor.probe_name());

        Ok(Prepared {
            executor: Box::new(executor),
            classifier: Box::new(ArchiveClassifier),
            pacing: Duration::ZERO,
            profile: None,
            discovery_note: None,
        })
    }

    async fn finalize(&self, target: &Target, report: &mut RunReport) {
        let (Some(root), Some(path), Some(key)) = (&self.extract_root, target.path(), &report.candidate)
        else {
            return;
        };
        if report.outcome != Outcome::Found {
            return;
        }

        let dest = extraction_dir(root, &report.run_id);
        let (path, key, task_dest) = (path.clone(), key.clone(), dest.clone());
        match tokio::task::spawn_blocking(move || extract_all(&path, &key, &task_dest)).await {
            Ok(Ok(_)) => report.extracted_to = Some(dest),
            Ok(Err(e)) => tracing::warn!("Extraction failed: {:#}", e),
            Err(e) => tracing::warn!("Extraction task aborted: {}", e),
        }
    }
}
