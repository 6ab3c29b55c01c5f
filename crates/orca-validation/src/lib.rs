//! Orca Validation - quality gates
//!
//! Two gates guard a task: Gate 1 checks the plan, Gate 2 checks the
//! completion evidence. Both are strict: a missing evidence kind is a
//! rejection, never a soft pass, and every rejection names its issues.
//!
//! The crate also hosts the two collaborator predicates the gates consult:
//! banned-pattern screening of plans and diffs, and static quality checks
//! run before Gate 2.

pub mod evidence;
pub mod gate;
pub mod predicates;
pub mod validator;

pub use evidence::Evidence;
pub use gate::{CompletionStatus, EvidenceReviewItem, GateDecision, GateId, GateReport};
pub use predicates::{
    CommandQualityChecks, GeneralizationCheck, GeneralizationReport, QualityChecks,
    QualityReport, RegexBannedPatterns, ScriptedQualityChecks,
};
pub use validator::GateValidator;
