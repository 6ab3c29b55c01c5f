//! Pure state machine for the five-step workflow
//!
//! No async, no I/O. The engine performs the actions this machine emits
//! and feeds the outcomes back as events.
//!
//! Key rules:
//! - Understand&Spec, Implement&Review and Validate&Complete always run
//! - Verify runs iff the task is a bug or an investigation
//! - Gate 1 is skipped only when the resolved skip flag says so
//! - Gate rejections loop back to the producing step with the issues attached
//! - Two identical consecutive rejections at a gate escalate
//! - Complete and Escalated are terminal; events there are ignored
//! - Invalid events escalate; the machine never panics

use std::collections::{BTreeSet, HashMap};

use orca_core::{TaskKind, TaskStatus, WorkflowStep};
use orca_validation::GateId;
use sha2::{Digest, Sha256};

use crate::escalation::EscalationReason;

/// Workflow state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    UnderstandAndSpec,
    Verify,
    PlanAndApprove { attempt: u32 },
    ImplementAndReview { iteration: u32 },
    ValidateAndComplete { attempt: u32 },
    Complete { summary: String },
    Escalated { reason: EscalationReason },
}

impl State {
    pub fn step(&self) -> Option<WorkflowStep> {
        match self {
            Self::UnderstandAndSpec => Some(WorkflowStep::UnderstandAndSpec),
            Self::Verify => Some(WorkflowStep::Verify),
            Self::PlanAndApprove { .. } => Some(WorkflowStep::PlanAndApprove),
            Self::ImplementAndReview { .. } => Some(WorkflowStep::ImplementAndReview),
            Self::ValidateAndComplete { .. } => Some(WorkflowStep::ValidateAndComplete),
            Self::Complete { .. } | Self::Escalated { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Escalated { .. })
    }
}

/// Outcomes fed back by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Specification (or its absence) is settled
    SpecReady,
    /// Current behavior has been confirmed
    Verified,
    /// A gate decided; no issues means approve
    GateDecided { gate: GateId, issues: Vec<String> },
    /// Implementation was reviewed; no issues means accepted
    Reviewed { issues: Vec<String> },
    /// Static checks ran; no errors means passed
    QualityChecked { errors: Vec<String> },
    /// Unrecoverable failure outside the gates
    Abort { reason: EscalationReason },
}

/// Side effects the engine must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EnterStep(WorkflowStep),
    SkipStep(WorkflowStep),
    BuildSpec,
    Verify,
    Plan {
        attempt: u32,
        rejection: Vec<String>,
    },
    /// Implement, then have the work reviewed
    Implement {
        iteration: u32,
        feedback: Vec<String>,
    },
    RunQualityChecks,
    CollectEvidence {
        attempt: u32,
        rejection: Vec<String>,
    },
    Complete {
        summary: String,
    },
    Escalate {
        reason: EscalationReason,
    },
}

/// Fixed inputs of one workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub kind: TaskKind,
    /// Gate 1 bypass, already resolved from policy, tier and caller flag
    pub skip_gate1: bool,
    pub max_review_iterations: u32,
    pub max_gate_attempts: u32,
}

/// The workflow state machine
#[derive(Debug, Clone)]
pub struct WorkflowMachine {
    config: MachineConfig,
    state: State,
    /// Implementation passes started so far
    iteration: u32,
    rejections: HashMap<GateId, u32>,
    last_rejection: HashMap<GateId, String>,
    /// Gate 2 issues carried into the next evidence collection
    open_gate2_issues: Vec<String>,
    blocked: bool,
    visited: Vec<WorkflowStep>,
}

/// SHA-256 over the issue list taken as a set
pub fn fingerprint(issues: &[String]) -> String {
    let set: BTreeSet<&str> = issues.iter().map(|s| s.trim()).collect();
    let mut hasher = Sha256::new();
    for issue in set {
        hasher.update(issue.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

impl WorkflowMachine {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            state: State::UnderstandAndSpec,
            iteration: 0,
            rejections: HashMap::new(),
            last_rejection: HashMap::new(),
            open_gate2_issues: Vec::new(),
            blocked: false,
            visited: Vec::new(),
        }
    }

    /// Actions for the initial state
    pub fn start(&mut self) -> Vec<Action> {
        if !self.visited.is_empty() {
            return Vec::new();
        }
        self.visited.push(WorkflowStep::UnderstandAndSpec);
        vec![
            Action::EnterStep(WorkflowStep::UnderstandAndSpec),
            Action::BuildSpec,
        ]
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn current_step(&self) -> Option<WorkflowStep> {
        self.state.step()
    }

    /// Steps entered so far, in order, repeats included
    pub fn visited(&self) -> &[WorkflowStep] {
        &self.visited
    }

    pub fn iterations(&self) -> u32 {
        self.iteration
    }

    pub fn status(&self) -> TaskStatus {
        match &self.state {
            State::Complete { .. } => TaskStatus::Complete,
            State::Escalated { .. } => TaskStatus::Escalated,
            _ if self.blocked => TaskStatus::Blocked,
            _ => TaskStatus::InProgress,
        }
    }

    /// Apply an event, returning the actions to perform
    pub fn apply(&mut self, event: Event) -> Vec<Action> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        let state = self.state.clone();
        match (state, event) {
            (_, Event::Abort { reason }) => self.escalate(reason),

            (State::UnderstandAndSpec, Event::SpecReady) => {
                if self.config.kind.needs_verification() {
                    self.enter(State::Verify, vec![Action::Verify])
                } else {
                    let mut actions = vec![Action::SkipStep(WorkflowStep::Verify)];
                    actions.extend(self.after_verify());
                    actions
                }
            }

            (State::Verify, Event::Verified) => self.after_verify(),

            (State::PlanAndApprove { attempt }, Event::GateDecided { gate, issues })
                if gate == GateId::Plan =>
            {
                if issues.is_empty() {
                    self.blocked = false;
                    self.begin_implementation(Vec::new())
                } else if let Some(reason) = self.rejection_escalation(gate, &issues) {
                    self.escalate(reason)
                } else {
                    self.blocked = true;
                    let attempt = attempt + 1;
                    self.state = State::PlanAndApprove { attempt };
                    vec![Action::Plan {
                        attempt,
                        rejection: issues,
                    }]
                }
            }

            (State::ImplementAndReview { .. }, Event::Reviewed { issues }) => {
                if issues.is_empty() {
                    vec![Action::RunQualityChecks]
                } else {
                    self.next_pass(issues)
                }
            }

            (State::ImplementAndReview { .. }, Event::QualityChecked { errors }) => {
                if errors.is_empty() {
                    self.blocked = false;
                    let attempt = self.rejections.get(&GateId::Completion).copied().unwrap_or(0) + 1;
                    self.enter(
                        State::ValidateAndComplete { attempt },
                        vec![Action::CollectEvidence {
                            attempt,
                            rejection: self.open_gate2_issues.clone(),
                        }],
                    )
                } else {
                    self.blocked = true;
                    self.next_pass(errors)
                }
            }

            (State::ValidateAndComplete { attempt }, Event::GateDecided { gate, issues })
                if gate == GateId::Completion =>
            {
                if issues.is_empty() {
                    self.blocked = false;
                    let summary = format!(
                        "Completed after {} implementation pass(es), Gate 2 attempt {}",
                        self.iteration, attempt
                    );
                    self.state = State::Complete {
                        summary: summary.clone(),
                    };
                    vec![Action::Complete { summary }]
                } else if let Some(reason) = self.rejection_escalation(gate, &issues) {
                    self.escalate(reason)
                } else if self.iteration >= self.config.max_review_iterations {
                    self.escalate(EscalationReason::IterationExhausted {
                        iterations: self.iteration,
                        issues,
                    })
                } else {
                    self.blocked = true;
                    self.open_gate2_issues = issues.clone();
                    self.iteration += 1;
                    self.enter(
                        State::ImplementAndReview {
                            iteration: self.iteration,
                        },
                        vec![Action::Implement {
                            iteration: self.iteration,
                            feedback: issues,
                        }],
                    )
                }
            }

            (state, event) => self.escalate(EscalationReason::InvalidTransition {
                detail: format!("{:?} cannot handle {:?}", state, event),
            }),
        }
    }

    fn after_verify(&mut self) -> Vec<Action> {
        if self.config.skip_gate1 {
            let mut actions = vec![Action::SkipStep(WorkflowStep::PlanAndApprove)];
            actions.extend(self.begin_implementation(Vec::new()));
            actions
        } else {
            self.enter(
                State::PlanAndApprove { attempt: 1 },
                vec![Action::Plan {
                    attempt: 1,
                    rejection: Vec::new(),
                }],
            )
        }
    }

    fn begin_implementation(&mut self, feedback: Vec<String>) -> Vec<Action> {
        self.iteration += 1;
        self.enter(
            State::ImplementAndReview {
                iteration: self.iteration,
            },
            vec![Action::Implement {
                iteration: self.iteration,
                feedback,
            }],
        )
    }

    /// Another pass within Implement&Review, or escalation if none remain
    fn next_pass(&mut self, issues: Vec<String>) -> Vec<Action> {
        if self.iteration >= self.config.max_review_iterations {
            return self.escalate(EscalationReason::IterationExhausted {
                iterations: self.iteration,
                issues,
            });
        }
        self.iteration += 1;
        self.state = State::ImplementAndReview {
            iteration: self.iteration,
        };
        vec![Action::Implement {
            iteration: self.iteration,
            feedback: issues,
        }]
    }

    /// Record a rejection; escalate on an identical repeat or too many attempts
    fn rejection_escalation(&mut self, gate: GateId, issues: &[String]) -> Option<EscalationReason> {
        let fp = fingerprint(issues);
        if self.last_rejection.get(&gate) == Some(&fp) {
            return Some(EscalationReason::RepeatedRejection {
                gate,
                issues: issues.to_vec(),
            });
        }
        self.last_rejection.insert(gate, fp);

        let count = self.rejections.entry(gate).or_insert(0);
        *count += 1;
        if *count >= self.config.max_gate_attempts {
            return Some(EscalationReason::GateAttemptsExhausted {
                gate,
                attempts: *count,
                issues: issues.to_vec(),
            });
        }
        None
    }

    fn enter(&mut self, state: State, mut actions: Vec<Action>) -> Vec<Action> {
        if let Some(step) = state.step() {
            if self.state.step() != Some(step) {
                self.visited.push(step);
                actions.insert(0, Action::EnterStep(step));
            }
        }
        self.state = state;
        actions
    }

    fn escalate(&mut self, reason: EscalationReason) -> Vec<Action> {
        self.state = State::Escalated {
            reason: reason.clone(),
        };
        vec![Action::Escalate { reason }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(kind: TaskKind, skip_gate1: bool) -> WorkflowMachine {
        WorkflowMachine::new(MachineConfig {
            kind,
            skip_gate1,
            max_review_iterations: 3,
            max_gate_attempts: 3,
        })
    }

    fn approve(gate: GateId) -> Event {
        Event::GateDecided {
            gate,
            issues: Vec::new(),
        }
    }

    fn reject(gate: GateId, issue: &str) -> Event {
        Event::GateDecided {
            gate,
            issues: vec![issue.to_string()],
        }
    }

    fn clean_review() -> Event {
        Event::Reviewed { issues: Vec::new() }
    }

    fn quality_ok() -> Event {
        Event::QualityChecked { errors: Vec::new() }
    }

    #[test]
    fn test_feature_happy_path() {
        let mut m = machine(TaskKind::Feature, false);
        let actions = m.start();
        assert_eq!(actions[1], Action::BuildSpec);

        let actions = m.apply(Event::SpecReady);
        assert_eq!(actions[0], Action::SkipStep(WorkflowStep::Verify));
        assert!(actions.contains(&Action::EnterStep(WorkflowStep::PlanAndApprove)));
        assert!(matches!(m.state(), State::PlanAndApprove { attempt: 1 }));

        let actions = m.apply(approve(GateId::Plan));
        assert!(matches!(
            actions.last(),
            Some(Action::Implement { iteration: 1, .. })
        ));

        assert_eq!(m.apply(clean_review()), vec![Action::RunQualityChecks]);

        let actions = m.apply(quality_ok());
        assert!(matches!(
            actions.last(),
            Some(Action::CollectEvidence { attempt: 1, .. })
        ));

        let actions = m.apply(approve(GateId::Completion));
        assert!(matches!(actions[0], Action::Complete { .. }));
        assert_eq!(m.status(), TaskStatus::Complete);
        assert_eq!(
            m.visited(),
            &[
                WorkflowStep::UnderstandAndSpec,
                WorkflowStep::PlanAndApprove,
                WorkflowStep::ImplementAndReview,
                WorkflowStep::ValidateAndComplete,
            ]
        );
    }

    #[test]
    fn test_bug_runs_verify() {
        let mut m = machine(TaskKind::Bug, true);
        m.start();
        let actions = m.apply(Event::SpecReady);
        assert_eq!(
            actions,
            vec![Action::EnterStep(WorkflowStep::Verify), Action::Verify]
        );

        let actions = m.apply(Event::Verified);
        assert_eq!(actions[0], Action::SkipStep(WorkflowStep::PlanAndApprove));
        assert!(matches!(m.state(), State::ImplementAndReview { iteration: 1 }));
    }

    #[test]
    fn test_gate1_rejection_replans_with_issues() {
        let mut m = machine(TaskKind::Feature, false);
        m.start();
        m.apply(Event::SpecReady);

        let actions = m.apply(reject(GateId::Plan, "missing evidence: risks"));
        assert_eq!(
            actions,
            vec![Action::Plan {
                attempt: 2,
                rejection: vec!["missing evidence: risks".to_string()],
            }]
        );
        assert_eq!(m.status(), TaskStatus::Blocked);

        m.apply(approve(GateId::Plan));
        assert_eq!(m.status(), TaskStatus::InProgress);
    }

    #[test]
    fn test_identical_rejections_escalate() {
        let mut m = machine(TaskKind::Feature, true);
        m.start();
        m.apply(Event::SpecReady);
        m.apply(clean_review());
        m.apply(quality_ok());

        m.apply(reject(GateId::Completion, "missing evidence: functional"));
        assert!(matches!(m.state(), State::ImplementAndReview { iteration: 2 }));
        m.apply(clean_review());
        m.apply(quality_ok());

        let actions = m.apply(reject(GateId::Completion, "missing evidence: functional"));
        assert!(matches!(
            actions[0],
            Action::Escalate {
                reason: EscalationReason::RepeatedRejection { .. }
            }
        ));
        assert_eq!(m.status(), TaskStatus::Escalated);
    }

    #[test]
    fn test_gate_attempts_bound() {
        let mut m = WorkflowMachine::new(MachineConfig {
            kind: TaskKind::Feature,
            skip_gate1: false,
            max_review_iterations: 3,
            max_gate_attempts: 2,
        });
        m.start();
        m.apply(Event::SpecReady);
        m.apply(reject(GateId::Plan, "missing evidence: risks"));
        let actions = m.apply(reject(GateId::Plan, "missing evidence: test_approach"));
        assert!(matches!(
            actions[0],
            Action::Escalate {
                reason: EscalationReason::GateAttemptsExhausted { attempts: 2, .. }
            }
        ));
    }

    #[test]
    fn test_review_iteration_bound() {
        let mut m = machine(TaskKind::Feature, true);
        m.start();
        m.apply(Event::SpecReady);

        for expected in 2..=3 {
            let actions = m.apply(Event::Reviewed {
                issues: vec![format!("issue {}", expected)],
            });
            assert!(matches!(
                actions[0],
                Action::Implement { iteration, .. } if iteration == expected
            ));
        }

        let actions = m.apply(Event::Reviewed {
            issues: vec!["still broken".to_string()],
        });
        assert!(matches!(
            actions[0],
            Action::Escalate {
                reason: EscalationReason::IterationExhausted { iterations: 3, .. }
            }
        ));
    }

    #[test]
    fn test_quality_failure_loops_and_blocks() {
        let mut m = machine(TaskKind::Feature, true);
        m.start();
        m.apply(Event::SpecReady);
        m.apply(clean_review());

        let actions = m.apply(Event::QualityChecked {
            errors: vec!["clippy: unused import".to_string()],
        });
        assert!(matches!(
            actions[0],
            Action::Implement { iteration: 2, ref feedback } if feedback.len() == 1
        ));
        assert_eq!(m.status(), TaskStatus::Blocked);
    }

    #[test]
    fn test_gate2_rejection_on_last_pass_escalates() {
        let mut m = WorkflowMachine::new(MachineConfig {
            kind: TaskKind::Feature,
            skip_gate1: true,
            max_review_iterations: 1,
            max_gate_attempts: 3,
        });
        m.start();
        m.apply(Event::SpecReady);
        m.apply(clean_review());
        m.apply(quality_ok());
        let actions = m.apply(reject(GateId::Completion, "missing evidence: no_regressions"));
        assert!(matches!(
            actions[0],
            Action::Escalate {
                reason: EscalationReason::IterationExhausted { .. }
            }
        ));
    }

    #[test]
    fn test_terminal_states_ignore_events() {
        let mut m = machine(TaskKind::Feature, true);
        m.start();
        m.apply(Event::Abort {
            reason: EscalationReason::Cancelled {
                step: WorkflowStep::UnderstandAndSpec,
            },
        });
        assert!(m.is_terminal());
        assert!(m.apply(Event::SpecReady).is_empty());
        assert!(m.apply(approve(GateId::Completion)).is_empty());
    }

    #[test]
    fn test_invalid_event_escalates_without_panic() {
        let mut m = machine(TaskKind::Feature, false);
        m.start();
        let actions = m.apply(approve(GateId::Completion));
        assert!(matches!(
            actions[0],
            Action::Escalate {
                reason: EscalationReason::InvalidTransition { .. }
            }
        ));
    }

    #[test]
    fn test_fingerprint_ignores_order() {
        let a = fingerprint(&["x".to_string(), "y".to_string()]);
        let b = fingerprint(&["y".to_string(), "x ".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, fingerprint(&["x".to_string()]));
    }
}
