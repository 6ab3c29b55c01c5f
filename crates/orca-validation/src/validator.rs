//! Gate evaluation

use std::sync::Arc;

use orca_core::{EvidenceKind, ProgressReport, Tier};

use crate::evidence::Evidence;
use crate::gate::{EvidenceReviewItem, GateDecision, GateId};
use crate::predicates::GeneralizationCheck;

/// Evaluates evidence against tier-scaled gate criteria
pub struct GateValidator {
    banned_patterns: Option<Arc<dyn GeneralizationCheck>>,
}

impl GateValidator {
    pub fn new() -> Self {
        Self {
            banned_patterns: None,
        }
    }

    pub fn with_banned_patterns(mut self, check: Arc<dyn GeneralizationCheck>) -> Self {
        self.banned_patterns = Some(check);
        self
    }

    /// Evidence kinds a gate requires at a tier
    pub fn required_kinds(gate: GateId, tier: Tier, external: bool) -> Vec<EvidenceKind> {
        use EvidenceKind::*;
        match gate {
            GateId::Plan => match tier {
                Tier::Simple => vec![TestApproach],
                Tier::Medium => vec![IntegrationPoints, Risks, TestApproach],
                Tier::Complex => vec![
                    IntegrationPoints,
                    Risks,
                    TestApproach,
                    PhasedBreakdown,
                    AlternativesConsidered,
                ],
            },
            GateId::Completion => {
                let mut kinds = vec![Functional, NoRegressions];
                if external {
                    kinds.push(ExternalArtifacts);
                }
                kinds
            }
        }
    }

    /// Decide a gate
    ///
    /// Every missing kind becomes `missing evidence: <kind>`. At Gate 1 the
    /// plan text is also screened for banned patterns.
    pub fn evaluate(&self, gate: GateId, tier: Tier, evidence: &Evidence) -> GateDecision {
        let required = Self::required_kinds(gate, tier, evidence.requires_external_verification);

        let review: Vec<EvidenceReviewItem> = required
            .iter()
            .map(|kind| EvidenceReviewItem {
                item: *kind,
                present: evidence.has(*kind),
            })
            .collect();

        let mut issues: Vec<String> = review
            .iter()
            .filter(|r| !r.present)
            .map(|r| format!("missing evidence: {}", r.item))
            .collect();

        if gate == GateId::Plan {
            issues.extend(self.banned_pattern_issues(&evidence.subject));
        }

        let decision = GateDecision::from_issues(gate, review, issues);
        tracing::info!(
            %gate,
            %tier,
            approved = decision.is_approved(),
            issues = decision.issues().len(),
            "gate evaluated"
        );
        decision
    }

    /// Blocking issues from an implementation review
    ///
    /// The reviewer's blockers plus any banned pattern in the implementer's
    /// output.
    pub fn review_issues(&self, review: &ProgressReport, implementation: &str) -> Vec<String> {
        let mut issues = review.blocking_issues();
        issues.extend(self.banned_pattern_issues(implementation));
        issues
    }

    fn banned_pattern_issues(&self, text: &str) -> Vec<String> {
        match &self.banned_patterns {
            Some(check) if !text.trim().is_empty() => check
                .check_generalization(text)
                .violations
                .into_iter()
                .map(|v| format!("banned pattern: {}", v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for GateValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::RegexBannedPatterns;
    use orca_core::{Artifact, ArtifactType, BannedPatternConfig, EvidenceItem};

    fn items(kinds: &[EvidenceKind]) -> Vec<EvidenceItem> {
        kinds
            .iter()
            .map(|k| EvidenceItem::new(*k, format!("{} covered", k)))
            .collect()
    }

    #[test]
    fn test_gate1_scales_with_tier() {
        let validator = GateValidator::new();
        let medium_plan = Evidence::new(items(&[
            EvidenceKind::IntegrationPoints,
            EvidenceKind::Risks,
            EvidenceKind::TestApproach,
        ]));

        assert!(validator
            .evaluate(GateId::Plan, Tier::Medium, &medium_plan)
            .is_approved());

        let complex = validator.evaluate(GateId::Plan, Tier::Complex, &medium_plan);
        assert!(complex.is_rejected());
        assert_eq!(
            complex.issues(),
            &[
                "missing evidence: phased_breakdown".to_string(),
                "missing evidence: alternatives_considered".to_string(),
            ]
        );
    }

    #[test]
    fn test_gate2_never_soft_passes() {
        let validator = GateValidator::new();
        let decision = validator.evaluate(GateId::Completion, Tier::Simple, &Evidence::default());
        assert!(decision.is_rejected());
        assert_eq!(decision.issues().len(), 2);
        assert!(decision
            .issues()
            .contains(&"missing evidence: functional".to_string()));
    }

    #[test]
    fn test_gate2_external_verification() {
        let validator = GateValidator::new();
        let base = items(&[EvidenceKind::Functional, EvidenceKind::NoRegressions]);

        let asserted = Evidence::new(base.clone()).with_external_verification(true);
        let decision = validator.evaluate(GateId::Completion, Tier::Medium, &asserted);
        assert_eq!(
            decision.issues(),
            &["missing evidence: external_artifacts".to_string()]
        );

        let mut with_artifacts = base;
        with_artifacts.push(
            EvidenceItem::new(EvidenceKind::ExternalArtifacts, "checkout flow")
                .with_artifact(Artifact::new(ArtifactType::Screenshot, "checkout.png")),
        );
        let captured = Evidence::new(with_artifacts).with_external_verification(true);
        assert!(validator
            .evaluate(GateId::Completion, Tier::Medium, &captured)
            .is_approved());
    }

    #[test]
    fn test_banned_patterns_reject_plan() {
        let banned = RegexBannedPatterns::from_config(&[BannedPatternConfig::new(
            "skipped-test",
            r"\.skip\(",
        )])
        .unwrap();
        let validator = GateValidator::new().with_banned_patterns(Arc::new(banned));

        let plan = Evidence::new(items(&[EvidenceKind::TestApproach]))
            .with_subject("Step 3: mark flaky test with it.skip( until later");
        let decision = validator.evaluate(GateId::Plan, Tier::Simple, &plan);
        assert!(decision.is_rejected());
        assert!(decision.issues()[0].starts_with("banned pattern: skipped-test"));
    }

    #[test]
    fn test_review_issues_combine_blockers_and_patterns() {
        let banned = RegexBannedPatterns::from_config(&[BannedPatternConfig::new(
            "ts-ignore",
            "@ts-ignore",
        )])
        .unwrap();
        let validator = GateValidator::new().with_banned_patterns(Arc::new(banned));

        let review = ProgressReport {
            completed: "Reviewed".to_string(),
            blockers: "Missing null check in parser".to_string(),
            ..Default::default()
        };
        let issues = validator.review_issues(&review, "// @ts-ignore\nfoo()");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0], "Missing null check in parser");
    }
}
