//! Progress reports returned by every worker

use serde::{Deserialize, Serialize};

use crate::todo::{Mutation, TodoStatus};

/// Structured summary a worker must return with every result
///
/// Workers advise; the orchestrator decides which recommended mutations
/// to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    #[serde(default)]
    pub completed: String,
    #[serde(default)]
    pub recommended_todo_changes: Vec<Mutation>,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub blockers: String,
}

impl ProgressReport {
    /// True when the worker reported nothing at all
    ///
    /// A bare "None" under blockers is not content; a real blocker is.
    pub fn is_empty(&self) -> bool {
        self.completed.trim().is_empty()
            && self.next_steps.trim().is_empty()
            && self.recommended_todo_changes.is_empty()
            && !self.has_blockers()
    }

    /// Blocking issues, one per non-empty line of `blockers`
    pub fn blocking_issues(&self) -> Vec<String> {
        let trimmed = self.blockers.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Vec::new();
        }
        trimmed
            .lines()
            .map(|l| l.trim().trim_start_matches("- ").trim())
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("none"))
            .map(str::to_string)
            .collect()
    }

    pub fn has_blockers(&self) -> bool {
        !self.blocking_issues().is_empty()
    }

    /// Extract a report from a fenced ```progress block in free-form output
    ///
    /// Recognized lines: `COMPLETED:`, `NEXT:`, `BLOCKERS:`, `TODO+:` (add an
    /// item) and `DONE#<id>:` (mark an item completed). Repeated lines are
    /// joined with newlines.
    pub fn parse_block(output: &str) -> Option<Self> {
        let start = output.find("```progress")?;
        let body_start = start + "```progress".len();
        let end = output[body_start..].find("```")?;
        let block = &output[body_start..body_start + end];

        let mut report = ProgressReport::default();
        let mut blockers: Vec<String> = Vec::new();

        for line in block.lines() {
            let line = line.trim();
            if let Some(done) = line.strip_prefix("COMPLETED:") {
                push_line(&mut report.completed, done);
            } else if let Some(next) = line.strip_prefix("NEXT:") {
                push_line(&mut report.next_steps, next);
            } else if let Some(b) = line.strip_prefix("BLOCKERS:") {
                let b = b.trim();
                if !b.is_empty() && !b.eq_ignore_ascii_case("none") {
                    blockers.push(b.to_string());
                }
            } else if let Some(desc) = line.strip_prefix("TODO+:") {
                let desc = desc.trim();
                if !desc.is_empty() {
                    report.recommended_todo_changes.push(Mutation::Add {
                        description: desc.to_string(),
                    });
                }
            } else if let Some(rest) = line.strip_prefix("DONE#") {
                let id = rest.split(':').next().and_then(|s| s.trim().parse().ok());
                if let Some(id) = id {
                    report.recommended_todo_changes.push(Mutation::SetStatus {
                        id,
                        status: TodoStatus::Completed,
                    });
                }
            }
        }

        report.blockers = if blockers.is_empty() {
            "None".to_string()
        } else {
            blockers.join("\n")
        };

        Some(report)
    }
}

fn push_line(target: &mut String, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_block() {
        let output = r#"
I fixed the null check in the session loader.

```progress
COMPLETED: Guarded session lookup against missing user
NEXT: Run the auth test suite
BLOCKERS: None
TODO+: Add regression test for anonymous sessions
DONE#3: implementation finished
```
"#;

        let report = ProgressReport::parse_block(output).unwrap();
        assert_eq!(report.completed, "Guarded session lookup against missing user");
        assert_eq!(report.next_steps, "Run the auth test suite");
        assert!(report.blocking_issues().is_empty());
        assert_eq!(report.recommended_todo_changes.len(), 2);
        assert_eq!(
            report.recommended_todo_changes[1],
            Mutation::SetStatus {
                id: 3,
                status: TodoStatus::Completed
            }
        );
    }

    #[test]
    fn test_parse_without_block() {
        assert!(ProgressReport::parse_block("no fenced block here").is_none());
    }

    #[test]
    fn test_blocking_issues_split_lines() {
        let report = ProgressReport {
            blockers: "- unwrap in request handler\n\n- missing error path test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            report.blocking_issues(),
            vec!["unwrap in request handler", "missing error path test"]
        );

        let clear = ProgressReport {
            blockers: "none".to_string(),
            ..Default::default()
        };
        assert!(!clear.has_blockers());
    }

    #[test]
    fn test_blocker_only_report_is_not_empty() {
        let blocked = ProgressReport {
            blockers: "cannot reproduce without staging credentials".to_string(),
            ..Default::default()
        };
        assert!(!blocked.is_empty());

        let bare = ProgressReport {
            blockers: "None".to_string(),
            ..Default::default()
        };
        assert!(bare.is_empty());
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = r#"{
            "completed": "Drafted plan",
            "recommendedTodoChanges": [{"op": "add", "description": "Spike caching"}],
            "nextSteps": "Review",
            "blockers": "None"
        }"#;
        let report: ProgressReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.recommended_todo_changes.len(), 1);
        assert!(!report.is_empty());
        assert!(ProgressReport::default().is_empty());
    }
}
