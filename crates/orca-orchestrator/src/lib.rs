//! # orca-orchestrator
//!
//! Workflow engine for Orca.
//!
//! This crate provides:
//! - A pure state machine for the five-step workflow
//! - The engine that drives it: dispatch, retries, gates, cancellation
//! - The per-task TODO store and mutation review
//! - Context injection for stateless workers
//! - Step routing and escalation reports

mod context;
mod engine;
mod escalation;
mod routing;
mod state_machine;
mod task;
mod todo;

pub use context::{focus_pointer, ContextInjector, Invocation, PriorOutput, TaskContext};
pub use engine::{TaskOutcome, WorkflowEngine};
pub use escalation::{EscalationOption, EscalationReason, EscalationReport};
pub use routing::{Route, RoutingTable};
pub use state_machine::{fingerprint, Action, Event, MachineConfig, State, WorkflowMachine};
pub use task::{Task, TaskRequest};
pub use todo::{MutationReview, TodoStore};
