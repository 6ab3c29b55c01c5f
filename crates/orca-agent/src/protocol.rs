//! Worker invocation wire protocol

use orca_core::{EvidenceItem, OrcaError, ProgressReport, Result, TodoItem, WorkerId};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;

/// Everything a worker sees for one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub worker_id: WorkerId,
    pub task_id: String,
    /// Full copy of the TODO list at dispatch time
    pub todo_snapshot: Vec<TodoItem>,
    /// Which TODO item(s) this call addresses
    pub focus: String,
    /// Task-specific context (spec, prior outputs, rejection issues)
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Operations granted for this call
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

impl WorkerRequest {
    pub fn new(worker_id: WorkerId, task_id: impl Into<String>) -> Self {
        Self {
            worker_id,
            task_id: task_id.into(),
            todo_snapshot: Vec::new(),
            focus: String::new(),
            payload: serde_json::Value::Null,
            capabilities: CapabilitySet::profile(worker_id),
        }
    }

    pub fn with_snapshot(mut self, snapshot: Vec<TodoItem>) -> Self {
        self.todo_snapshot = snapshot;
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = focus.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// A side effect the worker reports having performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerAction {
    Write { path: String },
    Shell { command: String },
}

/// Raw response as it arrives from a transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub progress_report: Option<ProgressReport>,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default)]
    pub actions: Vec<WorkerAction>,
}

impl WorkerResponse {
    pub fn new(output: impl Into<String>, report: ProgressReport) -> Self {
        Self {
            output: output.into(),
            progress_report: Some(report),
            evidence: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, item: EvidenceItem) -> Self {
        self.evidence.push(item);
        self
    }

    pub fn with_action(mut self, action: WorkerAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Validate into a result; a missing or empty progress report is malformed
    pub fn into_result(self, worker: WorkerId) -> Result<WorkerResult> {
        let report = match self.progress_report {
            Some(report) if !report.is_empty() => report,
            Some(_) => {
                return Err(OrcaError::MalformedResult {
                    worker,
                    reason: "progress report is empty".to_string(),
                })
            }
            None => {
                return Err(OrcaError::MalformedResult {
                    worker,
                    reason: "missing progress report".to_string(),
                })
            }
        };

        Ok(WorkerResult {
            worker,
            output: self.output,
            report,
            evidence: self.evidence,
            actions: self.actions,
        })
    }
}

/// A validated worker result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub worker: WorkerId,
    pub output: String,
    pub report: ProgressReport,
    pub evidence: Vec<EvidenceItem>,
    pub actions: Vec<WorkerAction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_response_is_valid() {
        let json = r#"{
            "output": "done",
            "progressReport": {
                "completed": "Fixed it",
                "recommendedTodoChanges": [],
                "nextSteps": "Test it",
                "blockers": "None"
            }
        }"#;
        let response: WorkerResponse = serde_json::from_str(json).unwrap();
        assert!(response.evidence.is_empty());

        let result = response.into_result(WorkerId::Implementer).unwrap();
        assert_eq!(result.report.completed, "Fixed it");
    }

    #[test]
    fn test_missing_report_is_malformed() {
        let response = WorkerResponse {
            output: "trust me".to_string(),
            ..Default::default()
        };
        let err = response.into_result(WorkerId::Tester).unwrap_err();
        assert!(matches!(err, OrcaError::MalformedResult { .. }));
        assert!(err.is_transport());
    }

    #[test]
    fn test_empty_report_is_malformed() {
        let response = WorkerResponse::new("", ProgressReport::default());
        assert!(matches!(
            response.into_result(WorkerId::Planner),
            Err(OrcaError::MalformedResult { .. })
        ));
    }

    #[test]
    fn test_action_wire_format() {
        let json = r#"[{"kind": "write", "path": "src/lib.rs"}, {"kind": "shell", "command": "git status"}]"#;
        let actions: Vec<WorkerAction> = serde_json::from_str(json).unwrap();
        assert_eq!(
            actions[1],
            WorkerAction::Shell {
                command: "git status".to_string()
            }
        );
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = WorkerRequest::new(WorkerId::Reviewer, "task-1").with_focus("#4");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["workerId"], "reviewer");
        assert_eq!(value["taskId"], "task-1");
        assert!(value["todoSnapshot"].is_array());
    }
}
