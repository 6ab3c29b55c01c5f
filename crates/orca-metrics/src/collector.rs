//! Invocation analytics collection

use chrono::{DateTime, Utc};
use orca_core::{OrcaError, Result, WorkerId, WorkflowStep};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::storage::append_jsonl;

/// How one invocation attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success,
    Timeout,
    Transport,
    Malformed,
    /// Refused or rejected by capability enforcement
    Denied,
    /// Arrived after cancellation and was dropped
    Discarded,
}

impl InvocationOutcome {
    pub fn from_error(error: &OrcaError) -> Self {
        match error {
            OrcaError::Timeout { .. } => Self::Timeout,
            OrcaError::MalformedResult { .. } => Self::Malformed,
            OrcaError::CapabilityDenied { .. } | OrcaError::CapabilityViolation { .. } => {
                Self::Denied
            }
            _ => Self::Transport,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Timeout => write!(f, "timeout"),
            Self::Transport => write!(f, "transport"),
            Self::Malformed => write!(f, "malformed"),
            Self::Denied => write!(f, "denied"),
            Self::Discarded => write!(f, "discarded"),
        }
    }
}

/// One invocation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub task_id: String,
    pub worker: WorkerId,
    pub step: WorkflowStep,
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: InvocationOutcome,
}

/// One gate decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvent {
    pub task_id: String,
    pub gate: String,
    pub approved: bool,
    pub issue_count: usize,
    pub at: DateTime<Utc>,
}

/// Anything the collector records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricsEvent {
    Invocation(InvocationRecord),
    Gate(GateEvent),
}

/// Metrics collector shared across tasks
#[derive(Default)]
pub struct MetricsCollector {
    events: Arc<RwLock<Vec<MetricsEvent>>>,
    total_invocations: AtomicU32,
    total_failures: AtomicU32,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_invocation(&self, record: InvocationRecord) {
        self.total_invocations.fetch_add(1, Ordering::Relaxed);
        if !record.outcome.is_success() {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            task_id = %record.task_id,
            worker = %record.worker,
            attempt = record.attempt,
            outcome = %record.outcome,
            duration_ms = record.duration_ms,
            "recorded invocation"
        );
        self.events
            .write()
            .await
            .push(MetricsEvent::Invocation(record));
    }

    pub async fn record_gate(&self, event: GateEvent) {
        self.events.write().await.push(MetricsEvent::Gate(event));
    }

    pub fn total_invocations(&self) -> u32 {
        self.total_invocations.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u32 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub async fn events(&self) -> Vec<MetricsEvent> {
        self.events.read().await.clone()
    }

    /// Aggregate everything recorded so far
    pub async fn summary(&self) -> MetricsSummary {
        let events = self.events.read().await;

        let mut durations: BTreeMap<WorkerId, Vec<u64>> = BTreeMap::new();
        let mut successes: BTreeMap<WorkerId, u32> = BTreeMap::new();
        let mut gates_approved = 0;
        let mut gates_rejected = 0;

        for event in events.iter() {
            match event {
                MetricsEvent::Invocation(r) => {
                    durations.entry(r.worker).or_default().push(r.duration_ms);
                    if r.outcome.is_success() {
                        *successes.entry(r.worker).or_default() += 1;
                    }
                }
                MetricsEvent::Gate(g) if g.approved => gates_approved += 1,
                MetricsEvent::Gate(_) => gates_rejected += 1,
            }
        }

        let workers = durations
            .into_iter()
            .map(|(worker, mut ms)| {
                ms.sort_unstable();
                let count = ms.len() as u32;
                let ok = successes.get(&worker).copied().unwrap_or(0);
                let total: u64 = ms.iter().sum();
                let stats = WorkerStats {
                    invocations: count,
                    successes: ok,
                    success_rate: rate(ok, count),
                    avg_ms: total / u64::from(count.max(1)),
                    median_ms: median(&ms),
                    max_ms: ms.last().copied().unwrap_or(0),
                };
                (worker, stats)
            })
            .collect::<BTreeMap<_, _>>();

        let total_invocations = workers.values().map(|w| w.invocations).sum();
        let successful = workers.values().map(|w| w.successes).sum();

        MetricsSummary {
            total_invocations,
            successful,
            success_rate: rate(successful, total_invocations),
            gates_approved,
            gates_rejected,
            workers,
        }
    }

    /// Append all recorded events to a JSON-lines file
    pub async fn export_jsonl(&self, path: &Path) -> Result<usize> {
        let events = self.events.read().await;
        append_jsonl(path, events.as_slice()).await
    }
}

fn rate(ok: u32, total: u32) -> f64 {
    if total == 0 {
        return 1.0;
    }
    f64::from(ok) / f64::from(total)
}

/// Median of a sorted slice
fn median(sorted: &[u64]) -> u64 {
    match sorted.len() {
        0 => 0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2,
    }
}

/// Aggregates for one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub invocations: u32,
    pub successes: u32,
    pub success_rate: f64,
    pub avg_ms: u64,
    pub median_ms: u64,
    pub max_ms: u64,
}

/// Aggregates across all workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_invocations: u32,
    pub successful: u32,
    pub success_rate: f64,
    pub gates_approved: u32,
    pub gates_rejected: u32,
    pub workers: BTreeMap<WorkerId, WorkerStats>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Invocations: {} ({} successful, {:.1}%)",
            self.total_invocations,
            self.successful,
            self.success_rate * 100.0
        )?;
        writeln!(
            f,
            "Gates: {} approved, {} rejected",
            self.gates_approved, self.gates_rejected
        )?;
        writeln!(
            f,
            "{:<14} {:>6} {:>8} {:>9} {:>9} {:>9}",
            "worker", "calls", "success", "avg_ms", "median_ms", "max_ms"
        )?;
        for (worker, s) in &self.workers {
            writeln!(
                f,
                "{:<14} {:>6} {:>7.1}% {:>9} {:>9} {:>9}",
                worker.to_string(),
                s.invocations,
                s.success_rate * 100.0,
                s.avg_ms,
                s.median_ms,
                s.max_ms
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(worker: WorkerId, duration_ms: u64, outcome: InvocationOutcome) -> InvocationRecord {
        InvocationRecord {
            task_id: "task-1".to_string(),
            worker,
            step: WorkflowStep::ImplementAndReview,
            attempt: 1,
            started_at: Utc::now(),
            duration_ms,
            outcome,
        }
    }

    #[tokio::test]
    async fn test_summary_per_worker() {
        let collector = MetricsCollector::new();
        collector
            .record_invocation(record(WorkerId::Implementer, 100, InvocationOutcome::Success))
            .await;
        collector
            .record_invocation(record(WorkerId::Implementer, 300, InvocationOutcome::Timeout))
            .await;
        collector
            .record_invocation(record(WorkerId::Implementer, 200, InvocationOutcome::Success))
            .await;
        collector
            .record_invocation(record(WorkerId::Reviewer, 50, InvocationOutcome::Success))
            .await;
        collector
            .record_gate(GateEvent {
                task_id: "task-1".to_string(),
                gate: "gate2".to_string(),
                approved: false,
                issue_count: 1,
                at: Utc::now(),
            })
            .await;

        let summary = collector.summary().await;
        assert_eq!(summary.total_invocations, 4);
        assert_eq!(summary.successful, 3);
        assert_eq!(summary.gates_rejected, 1);
        assert_eq!(collector.total_failures(), 1);

        let implementer = &summary.workers[&WorkerId::Implementer];
        assert_eq!(implementer.invocations, 3);
        assert_eq!(implementer.avg_ms, 200);
        assert_eq!(implementer.median_ms, 200);
        assert_eq!(implementer.max_ms, 300);

        let table = summary.to_string();
        assert!(table.contains("implementer"));
        assert!(table.contains("reviewer"));
    }

    #[test]
    fn test_outcome_from_error() {
        let err = OrcaError::MalformedResult {
            worker: WorkerId::Tester,
            reason: "no report".to_string(),
        };
        assert_eq!(InvocationOutcome::from_error(&err), InvocationOutcome::Malformed);
        assert_eq!(median(&[1, 3]), 2);
        assert_eq!(median(&[]), 0);
    }

    #[tokio::test]
    async fn test_export_jsonl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.jsonl");

        let collector = MetricsCollector::new();
        collector
            .record_invocation(record(WorkerId::Planner, 10, InvocationOutcome::Success))
            .await;
        assert_eq!(collector.export_jsonl(&path).await.unwrap(), 1);

        let line = std::fs::read_to_string(&path).unwrap();
        let event: MetricsEvent = serde_json::from_str(line.trim()).unwrap();
        assert!(matches!(event, MetricsEvent::Invocation(_)));
    }
}
