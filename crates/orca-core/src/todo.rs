//! TODO items and the mutations that change them

use serde::{Deserialize, Serialize};

/// Stable identifier of a TODO item, assigned at insertion
pub type TodoId = u32;

/// Status of a TODO item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(format!("Invalid TODO status: {}", s)),
        }
    }
}

/// One entry of the orchestrator's TODO list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub description: String,
    pub status: TodoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TodoItem {
    /// Checklist rendering used in worker briefs
    pub fn checkbox(&self) -> String {
        let mark = match self.status {
            TodoStatus::Pending => "[ ]",
            TodoStatus::InProgress => "[~]",
            TodoStatus::Completed => "[x]",
        };
        match &self.note {
            Some(note) => format!("- {} #{} {} ({})", mark, self.id, self.description, note),
            None => format!("- {} #{} {}", mark, self.id, self.description),
        }
    }
}

/// A requested change to the TODO list
///
/// Workers recommend these; only the orchestrator applies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Add { description: String },
    SetStatus { id: TodoId, status: TodoStatus },
    Annotate { id: TodoId, note: String },
    Move { id: TodoId, to_index: usize },
    Remove { id: TodoId },
}

impl Mutation {
    /// Item the mutation targets, if it targets an existing one
    pub fn target(&self) -> Option<TodoId> {
        match self {
            Self::Add { .. } => None,
            Self::SetStatus { id, .. }
            | Self::Annotate { id, .. }
            | Self::Move { id, .. }
            | Self::Remove { id } => Some(*id),
        }
    }
}
