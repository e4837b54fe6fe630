use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Discovering,
    Searching,
    Found,
    Exhausted,
    Cancelled,
    NoWordlists,
    StructuralFailure,
    Reported,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Discovering | Phase::Searching)
    }
}

/// Cooperative cancellation flag, polled between candidates
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only view of a run published to the progress timer
#[derive(Clone, Debug)]
pub struct ProgressSnapshot {
    pub attempts: u64,
    pub started: Instant,
    pub source: Option<String>,
    pub phase: Phase,
}

impl ProgressSnapshot {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Mutable state of a single run. Owned by the controller only; the progress
/// timer sees it through `subscribe()`.
pub struct RunState {
    attempts_count: u64,
    started: Instant,
    current_source: Option<String>,
    found_candidate: Option<String>,
    cancel_requested: bool,
    phase: Phase,
    publisher: watch::Sender<ProgressSnapshot>,
}

impl RunState {
    pub fn new() -> Self {
        let started = Instant::now();
        let (publisher, _) = watch::channel(ProgressSnapshot {
            attempts: 0,
            started,
            source: None,
            phase: Phase::Idle,
        });
        Self {
            attempts_count: 0,
            started,
            current_source: None,
            found_candidate: None,
            cancel_requested: false,
            phase: Phase::Idle,
            publisher,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.publisher.subscribe()
    }

    pub fn attempts_count(&self) -> u64 {
        self.attempts_count
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn found_candidate(&self) -> Option<&str> {
        self.found_candidate.as_deref()
    }

    /// Terminal phases only ever move on to `Reported`
    pub fn set_phase(&mut self, phase: Phase) {
        if self.phase.is_terminal() && phase != Phase::Reported {
            tracing::warn!("Ignoring phase change {:?} -> {:?}", self.phase, phase);
            return;
        }
        tracing::debug!("Run phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.publish();
    }

    pub fn set_source(&mut self, source: &str) {
        self.current_source = Some(source.to_string());
        self.publish();
    }

    pub fn record_attempt(&mut self) {
        self.attempts_count += 1;
        self.publish();
    }

    /// Observe the cancel token at a candidate boundary
    pub fn poll_cancel(&mut self, token: &CancelToken) -> bool {
        if !self.cancel_requested && token.is_cancelled() {
            self.cancel_requested = true;
        }
        self.cancel_requested
    }

    /// Record the matching candidate. Only the first call has an effect.
    pub fn mark_found(&mut self, candidate: &str) -> bool {
        if self.found_candidate.is_some() {
            tracing::warn!("Ignoring second match after a candidate was already found");
            return false;
        }
        self.found_candidate = Some(candidate.to_string());
        true
    }

    fn publish(&self) {
        self.publisher.send_replace(ProgressSnapshot {
            attempts: self.attempts_count,
            started: self.started,
            source: self.current_source.clone(),
            phase: self.phase,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_candidate_set_once() {
        let mut state = RunState::new();
        assert!(state.mark_found("first"));
        assert!(!state.mark_found("second"));
        assert_eq!(state.found_candidate(), Some("first"));
    }

    #[test]
    fn test_snapshot_follows_attempts() {
        let mut state = RunState::new();
        let rx = state.subscribe();
        state.set_source("rockyou");
        state.record_attempt();
        state.record_attempt();

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.source.as_deref(), Some("rockyou"));
    }

    #[test]
    fn test_cancel_is_sticky_once_observed() {
        let mut state = RunState::new();
        let token = CancelToken::new();
        assert!(!state.poll_cancel(&token));
        token.cancel();
        assert!(state.poll_cancel(&token));
        assert!(state.poll_cancel(&CancelToken::new()));
    }

    #[test]
    fn test_terminal_phases() {
        assert!(!Phase::Searching.is_terminal());
        assert!(Phase::Found.is_terminal());
        assert!(Phase::NoWordlists.is_terminal());
    }
}
