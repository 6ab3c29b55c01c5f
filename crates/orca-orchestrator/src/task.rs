//! Task requests and the task record

use orca_core::{ComplexityFactors, Result, TaskId, TaskKind, TaskStatus, Tier, WorkflowStep};
use orca_planning::{ComplexityScore, ComplexityScorer, SpecBuilder, Specification};
use serde::{Deserialize, Serialize};

/// What a caller submits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub description: String,
    pub kind: TaskKind,
    pub factors: ComplexityFactors,
    /// Caller vouches the change is trivial (may bypass Gate 1 at `Simple`)
    #[serde(default)]
    pub trivial: bool,
    /// Completion needs concrete artifacts, not just assertions
    #[serde(default)]
    pub requires_external_verification: bool,
    /// Topics handed to researchers in parallel during Understand&Spec
    #[serde(default)]
    pub research: Vec<String>,
}

impl TaskRequest {
    pub fn new(description: impl Into<String>, kind: TaskKind, factors: ComplexityFactors) -> Self {
        Self {
            description: description.into(),
            kind,
            factors,
            trivial: false,
            requires_external_verification: false,
            research: Vec::new(),
        }
    }

    pub fn trivial(mut self) -> Self {
        self.trivial = true;
        self
    }

    pub fn with_external_verification(mut self) -> Self {
        self.requires_external_verification = true;
        self
    }

    pub fn with_research(mut self, topic: impl Into<String>) -> Self {
        self.research.push(topic.into());
        self
    }
}

/// A scored task moving through the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub kind: TaskKind,
    pub score: ComplexityScore,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Specification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<WorkflowStep>,
    pub status: TaskStatus,
    pub requires_external_verification: bool,
}

impl Task {
    /// Score the request; invalid factors are rejected here
    pub fn from_request(request: &TaskRequest) -> Result<Self> {
        let score = ComplexityScorer::score(&request.factors)?;
        let short = uuid::Uuid::new_v4().simple().to_string();
        Ok(Self {
            id: format!("task-{}", &short[..8]),
            description: request.description.trim().to_string(),
            kind: request.kind,
            tier: score.tier,
            score,
            spec: None,
            current_step: Some(WorkflowStep::UnderstandAndSpec),
            status: TaskStatus::InProgress,
            requires_external_verification: request.requires_external_verification,
        })
    }

    /// Build the tier-shaped specification; `Simple` gets none
    pub fn build_spec(&mut self) -> Option<&Specification> {
        self.spec = SpecBuilder::build(self.tier, &self.description);
        self.spec.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orca_core::OrcaError;

    #[test]
    fn test_task_from_request() {
        let request = TaskRequest::new(
            "Add CSV export",
            TaskKind::Feature,
            ComplexityFactors::from_array([1, 1, 1, 1, 0, 0, 0]),
        );
        let mut task = Task::from_request(&request).unwrap();
        assert!(task.id.starts_with("task-"));
        assert_eq!(task.id.len(), "task-".len() + 8);
        assert_eq!(task.tier, Tier::Medium);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.build_spec().is_some());
    }

    #[test]
    fn test_invalid_factors_rejected() {
        let request = TaskRequest::new(
            "Broken",
            TaskKind::Bug,
            ComplexityFactors::from_array([3, 0, 0, 0, 0, 0, 0]),
        );
        assert!(matches!(
            Task::from_request(&request),
            Err(OrcaError::InvalidFactor { .. })
        ));
    }

    #[test]
    fn test_request_json_defaults() {
        let json = r#"{
            "description": "Fix typo",
            "kind": "bug",
            "factors": {
                "architectural_scope": 0, "integration_points": 0, "risk_level": 0,
                "implementation_time": 0, "testing_requirements": 0,
                "performance_impact": 0, "planning_needed": 0
            }
        }"#;
        let request: TaskRequest = serde_json::from_str(json).unwrap();
        assert!(!request.trivial);
        assert!(request.research.is_empty());
    }
}
