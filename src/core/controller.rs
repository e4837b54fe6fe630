use super::backend::{Prepared, TargetBackend};
use super::errors::{EngineError, PrepareError};
use super::models::{
    AttemptResult, Outcome, RunReport, SourceUsage, Target, TargetKind, throughput,
};
use super::state::{CancelToken, Phase, RunState};
use crate::reporters::ReportSink;
use crate::ui::{ProgressReporter, ProgressSink};
use crate::utils::time::new_run_id;
use crate::wordlists::SourceChain;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(2500);
const DEFAULT_PROGRESS_QUEUE: usize = 16;

/// The matching attempt, kept for the report
struct Hit {
    result: AttemptResult,
    rule: Option<&'static str>,
}

struct SearchSummary {
    outcome: Outcome,
    hit: Option<Hit>,
    structural_error: Option<String>,
    sources: Vec<SourceUsage>,
}

impl SearchSummary {
    fn ending(outcome: Outcome, sources: Vec<SourceUsage>) -> Self {
        Self {
            outcome,
            hit: None,
            structural_error: None,
            sources,
        }
    }
}

/// Drives one run: prepare the target, search the source chain serially,
/// stop on the first success or a cancel request, then report.
pub struct RunController {
    chain: SourceChain,
    progress: Arc<dyn ProgressSink>,
    reports: Arc<dyn ReportSink>,
    cancel: CancelToken,
    progress_interval: Duration,
    progress_queue: usize,
}

impl RunController {
    pub fn new(
        chain: SourceChain,
        progress: Arc<dyn ProgressSink>,
        reports: Arc<dyn ReportSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            chain,
            progress,
            reports,
            cancel,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            progress_queue: DEFAULT_PROGRESS_QUEUE,
        }
    }

    pub fn with_progress(mut self, interval: Duration, queue: usize) -> Self {
        self.progress_interval = interval;
        self.progress_queue = queue;
        self
    }

    pub async fn run(&self, target: &Target, backend: &dyn TargetBackend) -> Result<RunReport, EngineError> {
        if self.chain.is_empty() {
            return Err(EngineError::NoSourcesConfigured);
        }

        let run_id = new_run_id(&target.display_location());
        tracing::info!("Run {} against {} target {}", run_id, target.kind, target.display_location());

        let mut state = RunState::new();
        let reporter = ProgressReporter::spawn(
            state.subscribe(),
            self.progress.clone(),
            self.progress_interval,
            self.progress_queue,
        );

        if target.kind == TargetKind::Web {
            state.set_phase(Phase::Discovering);
        }

        let (summary, profile, discovery_note) = match backend.prepare(target).await {
            Ok(mut prepared) => {
                state.set_phase(Phase::Searching);
                let summary = self.search(&mut state, &mut prepared).await;
                (summary, prepared.profile, prepared.discovery_note)
            }
            Err(PrepareError::Structural(reason)) => {
                tracing::error!("Target unusable: {}", reason);
                let mut summary = SearchSummary::ending(Outcome::StructuralFailure, Vec::new());
                summary.structural_error = Some(reason);
                (summary, None, None)
            }
            Err(PrepareError::Fatal(e)) => {
                reporter.finish().await;
                return Err(e);
            }
        };

        state.set_phase(terminal_phase(summary.outcome));
        reporter.finish().await;

        let elapsed = state.elapsed();
        let attempts = state.attempts_count();
        let (rule, status_code, final_location) = match &summary.hit {
            Some(hit) => (
                hit.rule.map(str::to_string),
                hit.result.status_code,
                hit.result.final_location.as_ref().map(|u| u.to_string()),
            ),
            None => (None, None, None),
        };

        let mut report = RunReport {
            run_id,
            target: target.display_location(),
            kind: target.kind,
            identity: target.auth_identity.clone(),
            outcome: summary.outcome,
            candidate: state.found_candidate().map(str::to_string),
            attempts_count: attempts,
            elapsed_ms: elapsed.as_millis(),
            throughput: throughput(attempts, elapsed),
            rule,
            status_code,
            final_location,
            profile,
            discovery_note,
            structural_error: summary.structural_error,
            sources: summary.sources,
            extracted_to: None,
            finished_at: chrono::Utc::now(),
        };

        backend.finalize(target, &mut report).await;
        if let Err(e) = self.reports.deliver(&report) {
            tracing::warn!("Report delivery failed: {:#}", e);
        }
        state.set_phase(Phase::Reported);

        tracing::info!(
            "Run {} finished: {} after {} attempts in {:.1}s",
            report.run_id,
            report.outcome,
            report.attempts_count,
            elapsed.as_secs_f64()
        );
        Ok(report)
    }

    /// Tiers in order, lists in order, candidates in order. A tier that
    /// produced at least one candidate ends the search when it runs dry.
    async fn search(&self, state: &mut RunState, prepared: &mut Prepared) -> SearchSummary {
        let mut sources: Vec<SourceUsage> = Vec::new();

        for tier in self.chain.tiers() {
            if state.poll_cancel(&self.cancel) {
                return SearchSummary::ending(Outcome::Cancelled, sources);
            }

            let descriptors = match tier.sources().await {
                Ok(descriptors) => descriptors,
                Err(e) => {
                    tracing::warn!("{} wordlists unavailable: {}", tier.origin(), e);
                    sources.push(SourceUsage {
                        name: tier.origin().to_string(),
                        origin: tier.origin().to_string(),
                        candidates_tried: 0,
                        unavailable: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let mut tier_attempts = 0u64;
            for descriptor in descriptors {
                if state.poll_cancel(&self.cancel) {
                    return SearchSummary::ending(Outcome::Cancelled, sources);
                }

                let mut usage = SourceUsage {
                    name: descriptor.name.clone(),
                    origin: descriptor.origin.to_string(),
                    candidates_tried: 0,
                    unavailable: None,
                };
                let candidates = match tier.load(&descriptor).await {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        tracing::warn!("Skipping wordlist {}: {}", descriptor.label(), e);
                        usage.unavailable = Some(e.to_string());
                        sources.push(usage);
                        continue;
                    }
                };

                state.set_source(&descriptor.name);
                tracing::info!("Searching wordlist {}", descriptor.label());

                for candidate in candidates {
                    if state.poll_cancel(&self.cancel) {
                        tracing::info!("Cancelled after {} attempts", state.attempts_count());
                        sources.push(usage);
                        return SearchSummary::ending(Outcome::Cancelled, sources);
                    }

                    let result = prepared.executor.attempt(&candidate).await;
                    state.record_attempt();
                    usage.candidates_tried += 1;
                    tier_attempts += 1;

                    if result.is_structural() {
                        let reason = result.error.as_ref().map(|e| e.to_string());
                        tracing::error!("Target became unusable: {}", reason.as_deref().unwrap_or("unknown"));
                        sources.push(usage);
                        let mut summary = SearchSummary::ending(Outcome::StructuralFailure, sources);
                        summary.structural_error = reason;
                        return summary;
                    }

                    let verdict = prepared.classifier.classify(&result);
                    tracing::debug!(
                        "#{} '{}' -> {:?}{}",
                        state.attempts_count(),
                        candidate,
                        verdict.classification,
                        result.error.as_ref().map(|e| format!(" ({})", e)).unwrap_or_default()
                    );

                    if verdict.is_success() && state.mark_found(&candidate) {
                        tracing::info!(
                            "Match on attempt {} via {}",
                            state.attempts_count(),
                            verdict.rule.unwrap_or("-")
                        );
                        sources.push(usage);
                        let mut summary = SearchSummary::ending(Outcome::Found, sources);
                        summary.hit = Some(Hit { result, rule: verdict.rule });
                        return summary;
                    }

                    if !prepared.pacing.is_zero() {
                        tokio::time::sleep(prepared.pacing).await;
                    }
                }

                sources.push(usage);
            }

            if tier_attempts > 0 {
                return SearchSummary::ending(Outcome::Exhausted, sources);
            }
            tracing::info!("{} wordlists yielded no candidates, falling back", tier.origin());
        }

        SearchSummary::ending(Outcome::NoWordlists, sources)
    }
}

fn terminal_phase(outcome: Outcome) -> Phase {
    match outcome {
        Outcome::Found => Phase::Found,
        Outcome::Exhausted => Phase::Exhausted,
        Outcome::Cancelled => Phase::Cancelled,
        Outcome::NoWordlists => Phase::NoWordlists,
        Outcome::StructuralFailure => Phase::StructuralFailure,
    }
}
