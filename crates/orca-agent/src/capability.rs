//! Capability grants and shell-command policy
//!
//! Each worker has a fixed profile of permitted operations. The dispatcher
//! refuses a grant wider than the profile before invoking, and checks the
//! actions a worker reports against the grant after it returns.

use std::collections::BTreeSet;

use orca_core::{OrcaError, Result, ShellConfig, WorkerId};
use serde::{Deserialize, Serialize};

use crate::protocol::WorkerAction;

/// An operation a worker may perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadFiles,
    WriteFiles,
    ExecuteShell,
    Browser,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFiles => write!(f, "read_files"),
            Self::WriteFiles => write!(f, "write_files"),
            Self::ExecuteShell => write!(f, "execute_shell"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

/// A set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().copied().collect())
    }

    /// The widest grant a worker may ever receive
    pub fn profile(worker: WorkerId) -> Self {
        use Capability::*;
        match worker {
            WorkerId::Investigator => Self::new(&[ReadFiles, ExecuteShell, Browser]),
            WorkerId::Planner => Self::new(&[ReadFiles]),
            WorkerId::Implementer => Self::new(&[ReadFiles, WriteFiles, ExecuteShell]),
            WorkerId::Reviewer => Self::new(&[ReadFiles, ExecuteShell]),
            WorkerId::Tester => Self::new(&[ReadFiles, ExecuteShell, Browser]),
            WorkerId::Researcher => Self::new(&[ReadFiles]),
        }
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Capabilities in `self` that `other` does not hold
    pub fn excess_over(&self, other: &CapabilitySet) -> Vec<Capability> {
        self.0.difference(&other.0).copied().collect()
    }

    /// Refuse a grant that exceeds the worker's profile
    pub fn check_grant(&self, worker: WorkerId) -> Result<()> {
        let profile = Self::profile(worker);
        match self.excess_over(&profile).first() {
            Some(cap) => Err(OrcaError::CapabilityDenied {
                worker,
                capability: cap.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Outcome of checking one shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellVerdict {
    /// Base command is always allowed
    Passthrough,
    Allowed,
    Denied(String),
}

impl ShellVerdict {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied(_))
    }
}

/// Shell-command policy built from `[shell]` configuration
#[derive(Debug, Clone)]
pub struct ShellPolicy {
    passthrough: Vec<String>,
    denied_commands: Vec<String>,
    forbidden_patterns: Vec<String>,
}

impl ShellPolicy {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            passthrough: config.passthrough.clone(),
            denied_commands: config.denied_commands.clone(),
            forbidden_patterns: config.forbidden_patterns.clone(),
        }
    }

    /// Passthrough first, then forbidden substrings, then denied base commands
    pub fn check(&self, command: &str) -> ShellVerdict {
        let base = command.split_whitespace().next().unwrap_or("");

        if self.passthrough.iter().any(|p| p == base) {
            return ShellVerdict::Passthrough;
        }

        if let Some(pattern) = self
            .forbidden_patterns
            .iter()
            .find(|p| command.contains(p.as_str()))
        {
            return ShellVerdict::Denied(format!(
                "dev-server management is reserved for testing infrastructure ({})",
                pattern
            ));
        }

        if self.denied_commands.iter().any(|d| d == base) {
            return ShellVerdict::Denied(format!("command '{}' is not permitted", base));
        }

        ShellVerdict::Allowed
    }

    /// Check reported actions against a grant and this policy
    pub fn check_actions(
        &self,
        worker: WorkerId,
        grant: &CapabilitySet,
        actions: &[WorkerAction],
    ) -> Result<()> {
        for action in actions {
            match action {
                WorkerAction::Write { path } => {
                    if !grant.contains(Capability::WriteFiles) {
                        return Err(OrcaError::CapabilityViolation {
                            worker,
                            detail: format!("wrote {} without write_files", path),
                        });
                    }
                }
                WorkerAction::Shell { command } => {
                    if !grant.contains(Capability::ExecuteShell) {
                        return Err(OrcaError::CapabilityViolation {
                            worker,
                            detail: format!("ran `{}` without execute_shell", command),
                        });
                    }
                    if let ShellVerdict::Denied(reason) = self.check(command) {
                        return Err(OrcaError::CapabilityViolation {
                            worker,
                            detail: format!("ran `{}`: {}", command, reason),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for ShellPolicy {
    fn default() -> Self {
        Self::from_config(&ShellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let planner = CapabilitySet::profile(WorkerId::Planner);
        assert!(planner.contains(Capability::ReadFiles));
        assert!(!planner.contains(Capability::WriteFiles));

        let implementer = CapabilitySet::profile(WorkerId::Implementer);
        assert!(implementer.contains(Capability::WriteFiles));
        assert!(!implementer.contains(Capability::Browser));
    }

    #[test]
    fn test_grant_wider_than_profile_denied() {
        let grant = CapabilitySet::new(&[Capability::ReadFiles, Capability::WriteFiles]);
        match grant.check_grant(WorkerId::Reviewer) {
            Err(OrcaError::CapabilityDenied { worker, capability }) => {
                assert_eq!(worker, WorkerId::Reviewer);
                assert_eq!(capability, "write_files");
            }
            other => panic!("expected CapabilityDenied, got {:?}", other),
        }
        assert!(CapabilitySet::profile(WorkerId::Tester)
            .check_grant(WorkerId::Tester)
            .is_ok());
    }

    #[test]
    fn test_shell_policy() {
        let policy = ShellPolicy::default();
        assert_eq!(policy.check("git status"), ShellVerdict::Passthrough);
        assert_eq!(policy.check("gh pr view 12"), ShellVerdict::Passthrough);
        assert!(!policy.check("pnpm dev --port 3000").is_allowed());
        assert!(!policy.check("npm install").is_allowed());
        assert!(!policy.check("cat secrets.txt").is_allowed());
        assert_eq!(policy.check("pnpm typecheck"), ShellVerdict::Allowed);
        assert_eq!(policy.check("cargo test"), ShellVerdict::Allowed);
    }

    #[test]
    fn test_actions_checked_against_grant() {
        let policy = ShellPolicy::default();
        let reviewer = CapabilitySet::profile(WorkerId::Reviewer);

        let write = vec![WorkerAction::Write {
            path: "src/main.rs".to_string(),
        }];
        assert!(matches!(
            policy.check_actions(WorkerId::Reviewer, &reviewer, &write),
            Err(OrcaError::CapabilityViolation { .. })
        ));

        let dev_server = vec![WorkerAction::Shell {
            command: "yarn dev".to_string(),
        }];
        assert!(policy
            .check_actions(WorkerId::Reviewer, &reviewer, &dev_server)
            .is_err());

        let ok = vec![WorkerAction::Shell {
            command: "cargo clippy".to_string(),
        }];
        assert!(policy.check_actions(WorkerId::Reviewer, &reviewer, &ok).is_ok());
    }
}
