//! Core type definitions for Orca orchestration

use serde::{Deserialize, Serialize};

use crate::error::OrcaError;

/// Task identifier
pub type TaskId = String;

/// Workflow depth bucket derived from a complexity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Simple,
    Medium,
    Complex,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Simple, Tier::Medium, Tier::Complex];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Medium => write!(f, "medium"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = OrcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "medium" => Ok(Self::Medium),
            "complex" => Ok(Self::Complex),
            _ => Err(OrcaError::InvalidTier(s.to_string())),
        }
    }
}

/// What kind of work the caller is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Bug,
    Feature,
    Investigation,
}

impl TaskKind {
    /// Defects and investigations need their current behavior confirmed first
    pub fn needs_verification(&self) -> bool {
        matches!(self, Self::Bug | Self::Investigation)
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bug => write!(f, "bug"),
            Self::Feature => write!(f, "feature"),
            Self::Investigation => write!(f, "investigation"),
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = OrcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug" | "defect" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "investigation" => Ok(Self::Investigation),
            _ => Err(OrcaError::InvalidTaskKind(s.to_string())),
        }
    }
}

/// Task status as seen by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    InProgress,
    Complete,
    Blocked,
    Escalated,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Escalated)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Blocked => write!(f, "blocked"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            "blocked" => Ok(Self::Blocked),
            "escalated" => Ok(Self::Escalated),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// The five workflow steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    UnderstandAndSpec,
    Verify,
    PlanAndApprove,
    ImplementAndReview,
    ValidateAndComplete,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 5] = [
        WorkflowStep::UnderstandAndSpec,
        WorkflowStep::Verify,
        WorkflowStep::PlanAndApprove,
        WorkflowStep::ImplementAndReview,
        WorkflowStep::ValidateAndComplete,
    ];

    /// Human-readable label used in TODO items and briefs
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderstandAndSpec => "Understand & spec",
            Self::Verify => "Verify current behavior",
            Self::PlanAndApprove => "Plan & approve (Gate 1)",
            Self::ImplementAndReview => "Implement & review",
            Self::ValidateAndComplete => "Validate & complete (Gate 2)",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnderstandAndSpec => write!(f, "understand_and_spec"),
            Self::Verify => write!(f, "verify"),
            Self::PlanAndApprove => write!(f, "plan_and_approve"),
            Self::ImplementAndReview => write!(f, "implement_and_review"),
            Self::ValidateAndComplete => write!(f, "validate_and_complete"),
        }
    }
}

/// One of the seven weighted complexity dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityFactor {
    ArchitecturalScope,
    IntegrationPoints,
    RiskLevel,
    ImplementationTime,
    TestingRequirements,
    PerformanceImpact,
    PlanningNeeded,
}

impl ComplexityFactor {
    pub const ALL: [ComplexityFactor; 7] = [
        ComplexityFactor::ArchitecturalScope,
        ComplexityFactor::IntegrationPoints,
        ComplexityFactor::RiskLevel,
        ComplexityFactor::ImplementationTime,
        ComplexityFactor::TestingRequirements,
        ComplexityFactor::PerformanceImpact,
        ComplexityFactor::PlanningNeeded,
    ];
}

impl std::fmt::Display for ComplexityFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArchitecturalScope => write!(f, "architectural_scope"),
            Self::IntegrationPoints => write!(f, "integration_points"),
            Self::RiskLevel => write!(f, "risk_level"),
            Self::ImplementationTime => write!(f, "implementation_time"),
            Self::TestingRequirements => write!(f, "testing_requirements"),
            Self::PerformanceImpact => write!(f, "performance_impact"),
            Self::PlanningNeeded => write!(f, "planning_needed"),
        }
    }
}

/// Raw factor values as supplied by the caller
///
/// Values are not validated here; the scorer rejects anything outside 0..=2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityFactors {
    pub architectural_scope: u8,
    pub integration_points: u8,
    pub risk_level: u8,
    pub implementation_time: u8,
    pub testing_requirements: u8,
    pub performance_impact: u8,
    pub planning_needed: u8,
}

impl ComplexityFactors {
    /// Build from values listed in `ComplexityFactor::ALL` order
    pub fn from_array(values: [u8; 7]) -> Self {
        Self {
            architectural_scope: values[0],
            integration_points: values[1],
            risk_level: values[2],
            implementation_time: values[3],
            testing_requirements: values[4],
            performance_impact: values[5],
            planning_needed: values[6],
        }
    }

    pub fn get(&self, factor: ComplexityFactor) -> u8 {
        match factor {
            ComplexityFactor::ArchitecturalScope => self.architectural_scope,
            ComplexityFactor::IntegrationPoints => self.integration_points,
            ComplexityFactor::RiskLevel => self.risk_level,
            ComplexityFactor::ImplementationTime => self.implementation_time,
            ComplexityFactor::TestingRequirements => self.testing_requirements,
            ComplexityFactor::PerformanceImpact => self.performance_impact,
            ComplexityFactor::PlanningNeeded => self.planning_needed,
        }
    }

    /// Iterate `(factor, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (ComplexityFactor, u8)> + '_ {
        ComplexityFactor::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

/// Closed set of worker identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerId {
    /// Reproduces defects and investigates current behavior
    Investigator,
    /// Produces implementation plans for Gate 1
    Planner,
    /// Produces the work product
    Implementer,
    /// Inline-validates the implementer's work
    Reviewer,
    /// Collects completion evidence for Gate 2
    Tester,
    /// Read-only data gathering, safe to fan out
    Researcher,
}

impl WorkerId {
    pub const ALL: [WorkerId; 6] = [
        WorkerId::Investigator,
        WorkerId::Planner,
        WorkerId::Implementer,
        WorkerId::Reviewer,
        WorkerId::Tester,
        WorkerId::Researcher,
    ];
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Investigator => write!(f, "investigator"),
            Self::Planner => write!(f, "planner"),
            Self::Implementer => write!(f, "implementer"),
            Self::Reviewer => write!(f, "reviewer"),
            Self::Tester => write!(f, "tester"),
            Self::Researcher => write!(f, "researcher"),
        }
    }
}

impl std::str::FromStr for WorkerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "investigator" => Ok(Self::Investigator),
            "planner" => Ok(Self::Planner),
            "implementer" => Ok(Self::Implementer),
            "reviewer" => Ok(Self::Reviewer),
            "tester" => Ok(Self::Tester),
            "researcher" => Ok(Self::Researcher),
            _ => Err(format!("Invalid worker: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing() {
        assert_eq!("simple".parse::<Tier>().unwrap(), Tier::Simple);
        assert_eq!("COMPLEX".parse::<Tier>().unwrap(), Tier::Complex);
        assert!(matches!(
            "enormous".parse::<Tier>(),
            Err(OrcaError::InvalidTier(_))
        ));
    }

    #[test]
    fn test_task_kind_verification() {
        assert!(TaskKind::Bug.needs_verification());
        assert!(TaskKind::Investigation.needs_verification());
        assert!(!TaskKind::Feature.needs_verification());
        assert!(matches!(
            "chore".parse::<TaskKind>(),
            Err(OrcaError::InvalidTaskKind(_))
        ));
    }

    #[test]
    fn test_step_order() {
        assert!(WorkflowStep::UnderstandAndSpec < WorkflowStep::Verify);
        assert!(WorkflowStep::ImplementAndReview < WorkflowStep::ValidateAndComplete);
        assert_eq!(WorkflowStep::ALL.len(), 5);
    }

    #[test]
    fn test_factors_from_array() {
        let factors = ComplexityFactors::from_array([2, 0, 1, 0, 0, 0, 1]);
        assert_eq!(factors.get(ComplexityFactor::ArchitecturalScope), 2);
        assert_eq!(factors.get(ComplexityFactor::PlanningNeeded), 1);
        assert_eq!(factors.iter().map(|(_, v)| v as u32).sum::<u32>(), 4);
    }

    #[test]
    fn test_worker_id_round_trip() {
        for worker in WorkerId::ALL {
            assert_eq!(worker.to_string().parse::<WorkerId>().unwrap(), worker);
        }
    }
}
