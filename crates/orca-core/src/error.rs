//! Unified error types for Orca

use thiserror::Error;

use crate::types::{ComplexityFactor, WorkerId};

/// Unified error type for all Orca operations
#[derive(Error, Debug)]
pub enum OrcaError {
    // Input errors: rejected immediately, never coerced
    #[error("Invalid complexity factor {factor}: {value} (expected 0, 1 or 2)")]
    InvalidFactor { factor: ComplexityFactor, value: u8 },

    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    #[error("Invalid task kind: {0}")]
    InvalidTaskKind(String),

    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("TODO item not found: #{0}")]
    TodoItemNotFound(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    // Transport failures: retried, then escalated
    #[error("Transport failure invoking {worker}: {message}")]
    Transport { worker: WorkerId, message: String },

    #[error("Invocation of {worker} timed out after {secs}s")]
    Timeout { worker: WorkerId, secs: u64 },

    #[error("Malformed result from {worker}: {reason}")]
    MalformedResult { worker: WorkerId, reason: String },

    #[error("Circuit open for {worker}: retry in {retry_in_ms}ms")]
    CircuitOpen { worker: WorkerId, retry_in_ms: u64 },

    // Capability enforcement
    #[error("{worker} lacks capability {capability}")]
    CapabilityDenied { worker: WorkerId, capability: String },

    #[error("{worker} acted outside its grant: {detail}")]
    CapabilityViolation { worker: WorkerId, detail: String },

    // Dispatch errors
    #[error("No worker registered for {0}")]
    UnknownWorker(WorkerId),

    #[error("Sub-requests cannot run in parallel: {0}")]
    ConflictingSubRequests(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl OrcaError {
    /// Transport-level failures are the only ones worth retrying
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout { .. }
                | Self::MalformedResult { .. }
                | Self::CircuitOpen { .. }
        )
    }

    /// Input errors are fatal to the task and need a human to fix the request
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidFactor { .. }
                | Self::InvalidTier(_)
                | Self::InvalidTaskKind(_)
                | Self::InvalidMutation(_)
                | Self::TodoItemNotFound(_)
                | Self::Config(_)
        )
    }
}

/// Result type alias using OrcaError
pub type Result<T> = std::result::Result<T, OrcaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let timeout = OrcaError::Timeout {
            worker: WorkerId::Tester,
            secs: 600,
        };
        assert!(timeout.is_transport());
        assert!(!timeout.is_input());

        let denied = OrcaError::CapabilityDenied {
            worker: WorkerId::Planner,
            capability: "write_files".to_string(),
        };
        assert!(!denied.is_transport());
        assert!(!denied.is_input());

        assert!(OrcaError::InvalidTier("huge".to_string()).is_input());
    }

    #[test]
    fn test_factor_error_message() {
        let err = OrcaError::InvalidFactor {
            factor: ComplexityFactor::RiskLevel,
            value: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid complexity factor risk_level: 3 (expected 0, 1 or 2)"
        );
    }
}
