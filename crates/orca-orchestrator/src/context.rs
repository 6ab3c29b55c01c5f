//! Context injection for worker invocations
//!
//! Workers are stateless, so every request carries everything they need:
//! - The full TODO snapshot and the focus pointer
//! - Task description, tier and kind
//! - The specification, when one exists
//! - Outputs from earlier steps
//! - Issues from the last rejection, when re-entering a step
//! - A markdown brief that renders all of the above, plus reporting rules

use orca_agent::WorkerRequest;
use orca_core::{Result, TaskKind, Tier, TodoItem, WorkerId, WorkflowStep};
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Output of an earlier invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorOutput {
    pub worker: WorkerId,
    pub step: WorkflowStep,
    pub output: String,
}

/// Payload placed in `WorkerRequest::payload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub task_description: String,
    pub tier: Tier,
    pub kind: TaskKind,
    pub step: WorkflowStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_markdown: Option<String>,
    #[serde(default)]
    pub prior_outputs: Vec<PriorOutput>,
    #[serde(default)]
    pub rejection_issues: Vec<String>,
    pub iteration: u32,
    pub brief: String,
}

/// Per-call inputs that vary within a step
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub worker: WorkerId,
    pub step: WorkflowStep,
    /// Item(s) the call addresses
    pub focus: &'a [TodoItem],
    pub iteration: u32,
    pub rejection_issues: &'a [String],
    /// Free-form instruction for this call
    pub instruction: &'a str,
}

/// Builds worker requests from task state
#[derive(Debug, Clone, Default)]
pub struct ContextInjector {
    /// Upper bound on characters kept per prior output in the brief
    max_prior_chars: Option<usize>,
}

impl ContextInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_prior_chars(mut self, chars: usize) -> Self {
        self.max_prior_chars = Some(chars);
        self
    }

    /// Assemble a request for one invocation
    ///
    /// Fails only if the context cannot be serialized into the payload.
    pub fn build(
        &self,
        task: &Task,
        snapshot: &[TodoItem],
        prior_outputs: &[PriorOutput],
        call: &Invocation<'_>,
    ) -> Result<WorkerRequest> {
        let focus = focus_pointer(call.focus);
        let brief = self.brief(task, snapshot, prior_outputs, call, &focus);

        let context = TaskContext {
            task_description: task.description.clone(),
            tier: task.tier,
            kind: task.kind,
            step: call.step,
            spec_markdown: task.spec.as_ref().map(|s| s.to_markdown()),
            prior_outputs: prior_outputs.to_vec(),
            rejection_issues: call.rejection_issues.to_vec(),
            iteration: call.iteration,
            brief,
        };

        let payload = serde_json::to_value(&context)?;

        Ok(WorkerRequest::new(call.worker, task.id.clone())
            .with_snapshot(snapshot.to_vec())
            .with_focus(focus)
            .with_payload(payload))
    }

    fn brief(
        &self,
        task: &Task,
        snapshot: &[TodoItem],
        prior_outputs: &[PriorOutput],
        call: &Invocation<'_>,
        focus: &str,
    ) -> String {
        let mut brief = String::new();

        brief.push_str(&format!(
            "# ORCA {} - {} (iteration {})\n\n",
            call.worker.to_string().to_uppercase(),
            call.step.label(),
            call.iteration
        ));

        brief.push_str("## TASK\n\n");
        brief.push_str(&task.description);
        brief.push_str(&format!(
            "\n\nKind: {} | Tier: {} | Score: {}\n\n",
            task.kind, task.tier, task.score
        ));

        brief.push_str("## TODO LIST\n\n");
        for item in snapshot {
            brief.push_str(&item.checkbox());
            brief.push('\n');
        }
        brief.push('\n');

        brief.push_str("## YOUR FOCUS\n\n");
        brief.push_str(focus);
        brief.push_str("\n\n");
        if !call.instruction.is_empty() {
            brief.push_str(call.instruction);
            brief.push_str("\n\n");
        }

        if let Some(spec) = &task.spec {
            brief.push_str("## SPECIFICATION\n\n");
            brief.push_str(&spec.to_markdown());
        }

        if !call.rejection_issues.is_empty() {
            brief.push_str("## ISSUES TO RESOLVE\n\n");
            brief.push_str("The previous attempt was rejected. You MUST address each issue:\n\n");
            for issue in call.rejection_issues {
                brief.push_str(&format!("- {}\n", issue));
            }
            brief.push('\n');
        }

        if !prior_outputs.is_empty() {
            brief.push_str("## PRIOR OUTPUTS\n\n");
            for prior in prior_outputs {
                brief.push_str(&format!("### {} ({})\n\n", prior.worker, prior.step.label()));
                brief.push_str(&self.clip(&prior.output));
                brief.push_str("\n\n");
            }
        }

        brief.push_str("## REPORTING\n\n");
        brief.push_str("Return a progress report with your result. Text-only workers may end with:\n\n");
        brief.push_str("```progress\n");
        brief.push_str("COMPLETED: <what you finished>\n");
        brief.push_str("NEXT: <what should happen next>\n");
        brief.push_str("BLOCKERS: <blocking issues, or 'None'>\n");
        brief.push_str("TODO+: <optional new TODO item>\n");
        brief.push_str("DONE#<id>: <optional item you completed>\n");
        brief.push_str("```\n");

        brief
    }

    fn clip(&self, text: &str) -> String {
        match self.max_prior_chars {
            Some(max) if text.chars().count() > max => {
                let kept: String = text.chars().take(max).collect();
                format!("{}\n... (truncated)", kept)
            }
            _ => text.to_string(),
        }
    }
}

/// Render the focus pointer, e.g. `#4 Implement & review`
pub fn focus_pointer(items: &[TodoItem]) -> String {
    items
        .iter()
        .map(|item| format!("#{} {}", item.id, item.description))
        .collect::<Vec<_>>()
        .join(", ")
}
