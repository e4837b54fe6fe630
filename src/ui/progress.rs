use crate::core::models::throughput;
use crate::core::state::{Phase, ProgressSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const SPINNER_TICK_MS: u64 = 120;

/// Where status lines end up
pub trait ProgressSink: Send + Sync {
    fn emit(&self, line: &str);

    fn finish(&self) {}
}

/// Single spinner line on stderr, redrawn in place
pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        bar.set_message("[+] Starting...");
        Self { bar }
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, line: &str) {
        self.bar.set_message(line.to_string());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

pub fn format_status(snapshot: &ProgressSnapshot) -> String {
    let elapsed = snapshot.elapsed();
    format!(
        "[+] Attempts: {} | Time: {:.1}s | Speed: {:.2} pwd/s | Source: {}",
        snapshot.attempts,
        elapsed.as_secs_f64(),
        throughput(snapshot.attempts, elapsed),
        snapshot.source.as_deref().unwrap_or(match snapshot.phase {
            Phase::Discovering => "discovering form",
            _ => "-",
        })
    )
}

/// Queue a line without waiting. A full queue drops the line and counts it.
fn offer(tx: &mpsc::Sender<String>, line: String, dropped: &AtomicU64) -> bool {
    match tx.try_send(line) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            dropped.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Samples run state on a fixed timer and hands status lines to a sink
/// through a bounded queue. Emissions never exceed one per interval, no
/// matter how fast attempts complete.
pub struct ProgressReporter {
    stop: Option<oneshot::Sender<()>>,
    sampler: JoinHandle<()>,
    consumer: JoinHandle<()>,
    sink: Arc<dyn ProgressSink>,
    dropped: Arc<AtomicU64>,
}

impl ProgressReporter {
    pub fn spawn(
        snapshots: watch::Receiver<ProgressSnapshot>,
        sink: Arc<dyn ProgressSink>,
        interval: Duration,
        capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let dropped = Arc::new(AtomicU64::new(0));

        let sampler = {
            let dropped = dropped.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // first tick fires immediately
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => {
                            let line = format_status(&snapshots.borrow());
                            if !offer(&tx, line, &dropped) {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let consumer = {
            let sink = sink.clone();
            tokio::spawn(async move {
                while let Some(line) = rx.recv().await {
                    sink.emit(&line);
                }
            })
        };

        Self {
            stop: Some(stop),
            sampler,
            consumer,
            sink,
            dropped,
        }
    }

    /// Stop sampling, drain what is queued and close the sink
    pub async fn finish(mut self) -> u64 {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.sampler).await {
            tracing::debug!("Progress sampler ended abnormally: {}", e);
        }
        if let Err(e) = (&mut self.consumer).await {
            tracing::debug!("Progress consumer ended abnormally: {}", e);
        }
        self.sink.finish();

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            tracing::debug!("{} progress lines dropped on a full queue", dropped);
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl ProgressSink for Collect {
        fn emit(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn snapshot(attempts: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            attempts,
            started: Instant::now(),
            source: Some("rockyou".into()),
            phase: Phase::Searching,
        }
    }

    #[test]
    fn test_format_status() {
        let line = format_status(&snapshot(12));
        assert!(line.starts_with("[+] Attempts: 12 | Time: "));
        assert!(line.ends_with("| Source: rockyou"));
        assert!(line.contains("pwd/s"));
    }

    #[test]
    fn test_format_status_while_discovering() {
        let mut snap = snapshot(0);
        snap.source = None;
        snap.phase = Phase::Discovering;
        assert!(format_status(&snap).ends_with("| Source: discovering form"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emissions_bounded_by_interval() {
        let (publisher, snapshots) = watch::channel(snapshot(0));
        let sink = Arc::new(Collect::default());
        let reporter =
            ProgressReporter::spawn(snapshots, sink.clone(), Duration::from_millis(2500), 4);

        // attempts far outpace the timer
        for n in 1..=10_000u64 {
            publisher.send_replace(snapshot(n));
            if n % 1000 == 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        reporter.finish().await;

        let lines = sink.0.lock().unwrap();
        // 10s of run time at one line per 2.5s
        assert!(lines.len() <= 5, "emitted {} lines", lines.len());
        assert!(lines.len() >= 3, "emitted {} lines", lines.len());
        assert!(lines.iter().all(|l| l.starts_with("[+] Attempts: ")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_run_emits_nothing() {
        let (_publisher, snapshots) = watch::channel(snapshot(3));
        let sink = Arc::new(Collect::default());
        let reporter = ProgressReporter::spawn(snapshots, sink.clone(), Duration::from_secs(5), 4);
        tokio::time::sleep(Duration::from_secs(1)).await;
        reporter.finish().await;
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (tx, rx) = mpsc::channel::<String>(1);
        let dropped = AtomicU64::new(0);
        assert!(offer(&tx, "a".into(), &dropped));
        assert!(offer(&tx, "b".into(), &dropped));
        assert_eq!(dropped.load(Ordering::Relaxed), 1);

        drop(rx);
        assert!(!offer(&tx, "c".into(), &dropped));
    }
}
