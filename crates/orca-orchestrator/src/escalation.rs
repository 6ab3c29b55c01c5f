//! Escalation reasons and the report handed to a human
//!
//! An escalated task never ends with a bare failure message: every reason
//! maps to a situation, the specific blocking issue, two or three options
//! with trade-offs, a recommendation and an impact statement.

use orca_core::{WorkerId, WorkflowStep};
use orca_validation::GateId;
use serde::{Deserialize, Serialize};

/// Why a task was handed to a human
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EscalationReason {
    /// Implementation passes ran out with issues still open
    IterationExhausted { iterations: u32, issues: Vec<String> },
    /// A gate rejected twice in a row with the same issues
    RepeatedRejection { gate: GateId, issues: Vec<String> },
    /// A gate rejected more times than allowed
    GateAttemptsExhausted {
        gate: GateId,
        attempts: u32,
        issues: Vec<String>,
    },
    /// A worker kept failing at the transport level
    TransportFailure {
        worker: WorkerId,
        attempts: u32,
        error: String,
    },
    /// A worker asked for or used more than its grant
    CapabilityViolation { worker: WorkerId, detail: String },
    /// The caller cancelled the task
    Cancelled { step: WorkflowStep },
    /// The engine fed the state machine an event it cannot handle
    InvalidTransition { detail: String },
}

impl EscalationReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::IterationExhausted { .. } => "iteration_exhausted",
            Self::RepeatedRejection { .. } => "repeated_rejection",
            Self::GateAttemptsExhausted { .. } => "gate_attempts_exhausted",
            Self::TransportFailure { .. } => "transport_failure",
            Self::CapabilityViolation { .. } => "capability_violation",
            Self::Cancelled { .. } => "cancelled",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IterationExhausted { iterations, .. } => {
                write!(f, "implementation not accepted after {} passes", iterations)
            }
            Self::RepeatedRejection { gate, .. } => {
                write!(f, "{} rejected twice with identical issues", gate)
            }
            Self::GateAttemptsExhausted { gate, attempts, .. } => {
                write!(f, "{} rejected {} times", gate, attempts)
            }
            Self::TransportFailure {
                worker, attempts, ..
            } => write!(f, "{} failed {} times in a row", worker, attempts),
            Self::CapabilityViolation { worker, .. } => {
                write!(f, "{} exceeded its capability grant", worker)
            }
            Self::Cancelled { step } => write!(f, "cancelled during {}", step),
            Self::InvalidTransition { detail } => write!(f, "invalid transition: {}", detail),
        }
    }
}

/// One course of action offered to the human
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationOption {
    pub title: String,
    pub tradeoff: String,
}

impl EscalationOption {
    fn new(title: &str, tradeoff: &str) -> Self {
        Self {
            title: title.to_string(),
            tradeoff: tradeoff.to_string(),
        }
    }
}

/// Structured report surfaced on every escalation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReport {
    pub task_id: String,
    pub reason: EscalationReason,
    pub situation: String,
    pub blocking_issue: String,
    pub options: Vec<EscalationOption>,
    pub recommendation: String,
    pub impact: String,
}

fn first_issue(issues: &[String]) -> String {
    match issues {
        [] => "no issue detail recorded".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
    }
}

impl EscalationReport {
    pub fn new(task_id: impl Into<String>, description: &str, reason: EscalationReason) -> Self {
        let situation = format!("Task \"{}\" stopped: {}.", description, reason);

        let (blocking_issue, options, recommendation, impact) = match &reason {
            EscalationReason::IterationExhausted { issues, .. } => (
                first_issue(issues),
                vec![
                    EscalationOption::new(
                        "Raise the iteration bound",
                        "Quick to try, but the same reviewer feedback may keep recurring",
                    ),
                    EscalationOption::new(
                        "Resolve the open issues by hand",
                        "Most reliable, costs human time on implementation details",
                    ),
                    EscalationOption::new(
                        "Re-scope the task",
                        "Smaller task converges faster, defers part of the requirement",
                    ),
                ],
                "Resolve the open issues by hand, then resume at Gate 2".to_string(),
                "The change is implemented but not accepted; nothing has been completed".to_string(),
            ),
            EscalationReason::RepeatedRejection { gate, issues } => (
                first_issue(issues),
                vec![
                    EscalationOption::new(
                        "Supply the missing input directly",
                        "Unblocks the gate, requires knowing what the workers cannot find",
                    ),
                    EscalationOption::new(
                        "Relax the gate criteria for this task",
                        "Fast, weakens the guarantee the gate exists to provide",
                    ),
                ],
                format!(
                    "Supply what {} keeps reporting as missing; retrying unchanged will fail again",
                    gate
                ),
                "Work is stalled in a loop; further automated retries waste invocations".to_string(),
            ),
            EscalationReason::GateAttemptsExhausted { gate, issues, .. } => (
                first_issue(issues),
                vec![
                    EscalationOption::new(
                        "Review the latest rejection and guide the producer",
                        "Targeted, needs a human to read the rejected work",
                    ),
                    EscalationOption::new(
                        "Increase max_gate_attempts",
                        "Cheap, only helps if rejections were converging",
                    ),
                    EscalationOption::new(
                        "Split the task",
                        "Smaller plans pass more easily, adds coordination overhead",
                    ),
                ],
                format!("Review the latest {} rejection before retrying", gate),
                "The task cannot advance past the gate without external input".to_string(),
            ),
            EscalationReason::TransportFailure { worker, error, .. } => (
                error.clone(),
                vec![
                    EscalationOption::new(
                        "Restore the worker and rerun",
                        "Keeps the workflow intact, depends on fixing the transport",
                    ),
                    EscalationOption::new(
                        "Route the step to another worker",
                        "Unblocks now, the substitute may lack the specialization",
                    ),
                ],
                format!("Check {} availability, then rerun the task", worker),
                "No work product from this step; earlier steps are unaffected".to_string(),
            ),
            EscalationReason::CapabilityViolation { worker, detail } => (
                detail.clone(),
                vec![
                    EscalationOption::new(
                        "Audit and revert the out-of-grant action",
                        "Safest, the step must be redone",
                    ),
                    EscalationOption::new(
                        "Widen the worker profile",
                        "Allows the action in future, weakens isolation for every task",
                    ),
                ],
                format!("Audit what {} did before anything else runs", worker),
                "Side effects outside the grant may exist in the workspace".to_string(),
            ),
            EscalationReason::Cancelled { step } => (
                format!("cancelled by caller during {}", step),
                vec![
                    EscalationOption::new(
                        "Rerun the task",
                        "Starts from scratch; earlier progress is not persisted",
                    ),
                    EscalationOption::new(
                        "Abandon the task",
                        "No further cost, the requirement stays unmet",
                    ),
                ],
                "Rerun if the cancellation was not intentional".to_string(),
                "Any in-flight result was discarded".to_string(),
            ),
            EscalationReason::InvalidTransition { detail } => (
                detail.clone(),
                vec![
                    EscalationOption::new(
                        "Rerun the task",
                        "Works if the fault was transient",
                    ),
                    EscalationOption::new(
                        "Report the engine fault",
                        "Needed if the fault reproduces",
                    ),
                ],
                "Report the engine fault with the task log".to_string(),
                "Workflow state is unreliable from this point".to_string(),
            ),
        };

        Self {
            task_id: task_id.into(),
            reason,
            situation,
            blocking_issue,
            options,
            recommendation,
            impact,
        }
    }

    /// Render for a human
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# ESCALATION: {}\n\n", self.task_id));
        md.push_str(&format!("**Situation:** {}\n\n", self.situation));
        md.push_str(&format!("**Blocking issue:** {}\n\n", self.blocking_issue));
        md.push_str("**Options:**\n");
        for (idx, option) in self.options.iter().enumerate() {
            md.push_str(&format!(
                "{}. {} ({})\n",
                idx + 1,
                option.title,
                option.tradeoff
            ));
        }
        md.push('\n');
        md.push_str(&format!("**Recommendation:** {}\n\n", self.recommendation));
        md.push_str(&format!("**Impact:** {}\n", self.impact));
        md
    }
}
