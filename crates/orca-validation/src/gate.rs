//! Gate identities, decisions and decision reports

use orca_core::EvidenceKind;
use serde::{Deserialize, Serialize};

/// The two quality gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateId {
    /// Gate 1: plan approval
    Plan,
    /// Gate 2: completion
    Completion,
}

impl std::fmt::Display for GateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plan => write!(f, "gate1"),
            Self::Completion => write!(f, "gate2"),
        }
    }
}

/// Overall completion status in a decision report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Complete,
    NotComplete,
    PartiallyComplete,
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "COMPLETE"),
            Self::NotComplete => write!(f, "NOT_COMPLETE"),
            Self::PartiallyComplete => write!(f, "PARTIALLY_COMPLETE"),
        }
    }
}

/// Whether one required evidence kind was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceReviewItem {
    pub item: EvidenceKind,
    pub present: bool,
}

/// Report surfaced to the orchestrator and the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    pub gate: GateId,
    pub status: CompletionStatus,
    pub evidence_review: Vec<EvidenceReviewItem>,
    pub outstanding_issues: Vec<String>,
}

/// A binary gate decision
///
/// Only constructible from an issue list: no issues approves, any issue
/// rejects. A rejection therefore always names at least one issue and an
/// approval never names one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    gate: GateId,
    evidence_review: Vec<EvidenceReviewItem>,
    issues: Vec<String>,
}

impl GateDecision {
    pub fn from_issues(
        gate: GateId,
        evidence_review: Vec<EvidenceReviewItem>,
        issues: Vec<String>,
    ) -> Self {
        let issues = issues
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        Self {
            gate,
            evidence_review,
            issues,
        }
    }

    pub fn gate(&self) -> GateId {
        self.gate
    }

    pub fn is_approved(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_approved()
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn evidence_review(&self) -> &[EvidenceReviewItem] {
        &self.evidence_review
    }

    pub fn report(&self) -> GateReport {
        let status = if self.is_approved() {
            CompletionStatus::Complete
        } else if self.evidence_review.iter().any(|r| r.present) {
            CompletionStatus::PartiallyComplete
        } else {
            CompletionStatus::NotComplete
        };

        GateReport {
            gate: self.gate,
            status,
            evidence_review: self.evidence_review.clone(),
            outstanding_issues: self.issues.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(kinds: &[(EvidenceKind, bool)]) -> Vec<EvidenceReviewItem> {
        kinds
            .iter()
            .map(|(item, present)| EvidenceReviewItem {
                item: *item,
                present: *present,
            })
            .collect()
    }

    #[test]
    fn test_monotonicity_by_construction() {
        let approve = GateDecision::from_issues(GateId::Completion, Vec::new(), Vec::new());
        assert!(approve.is_approved());
        assert!(approve.issues().is_empty());

        let reject = GateDecision::from_issues(
            GateId::Completion,
            Vec::new(),
            vec!["missing evidence: functional".to_string()],
        );
        assert!(reject.is_rejected());
        assert_eq!(reject.issues().len(), 1);
    }

    #[test]
    fn test_blank_issues_do_not_reject() {
        let decision =
            GateDecision::from_issues(GateId::Plan, Vec::new(), vec!["  ".to_string()]);
        assert!(decision.is_approved());
    }

    #[test]
    fn test_report_status() {
        let partial = GateDecision::from_issues(
            GateId::Completion,
            review(&[
                (EvidenceKind::Functional, true),
                (EvidenceKind::NoRegressions, false),
            ]),
            vec!["missing evidence: no_regressions".to_string()],
        );
        assert_eq!(partial.report().status, CompletionStatus::PartiallyComplete);

        let none = GateDecision::from_issues(
            GateId::Completion,
            review(&[(EvidenceKind::Functional, false)]),
            vec!["missing evidence: functional".to_string()],
        );
        assert_eq!(none.report().status, CompletionStatus::NotComplete);

        let json = serde_json::to_value(none.report()).unwrap();
        assert_eq!(json["status"], "NOT_COMPLETE");
        assert_eq!(json["evidenceReview"][0]["present"], false);
        assert_eq!(json["outstandingIssues"][0], "missing evidence: functional");
    }
}
