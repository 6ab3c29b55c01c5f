//! # orca-metrics
//!
//! Invocation analytics for Orca orchestration.
//!
//! This crate provides:
//! - Per-attempt invocation records and gate decision events
//! - Per-worker summaries (counts, success rate, durations)
//! - JSON-lines export for offline analysis

mod collector;
mod storage;

pub use collector::{
    GateEvent, InvocationOutcome, InvocationRecord, MetricsCollector, MetricsEvent,
    MetricsSummary, WorkerStats,
};
pub use storage::append_jsonl;
