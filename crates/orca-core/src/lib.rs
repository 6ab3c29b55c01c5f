//! # orca-core
//!
//! Core types for the Orca task-orchestration engine.
//!
//! Orca drives a unit of work through stateless workers. Workers never see
//! each other; the orchestrator's TODO list is the only memory of progress,
//! and every worker gets a fresh copy of it on every invocation.
//!
//! ## Shared vocabulary
//!
//! - Tiers and complexity factors decide how deep a workflow goes
//! - Workflow steps and terminal statuses describe where a task is
//! - TODO items and mutations are the orchestrator's single source of truth
//! - Progress reports and evidence are what workers hand back

mod config;
mod error;
mod evidence;
mod report;
mod todo;
mod types;

pub use config::{
    BannedPatternConfig, Gate1SkipPolicy, OrcaConfig, QualityConfig, ShellConfig, WorkflowConfig,
};
pub use error::{OrcaError, Result};
pub use evidence::{Artifact, ArtifactType, EvidenceItem, EvidenceKind};
pub use report::ProgressReport;
pub use todo::{Mutation, TodoId, TodoItem, TodoStatus};
pub use types::*;
