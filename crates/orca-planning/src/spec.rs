//! Tiered specification building
//!
//! The builder only shapes the document. Section bodies are seeded from the
//! request text and left for the planner to refine; the core never
//! interprets them.

use orca_core::{Result, Tier};
use serde::{Deserialize, Serialize};

/// Acceptance scenario count bounds for any specification
const MIN_SCENARIOS: usize = 3;
const MAX_SCENARIOS: usize = 5;

/// Sections a specification may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Overview,
    AcceptanceScenarios,
    Constraints,
    SuccessCriteria,
    DependencyAnalysis,
    RiskAssessment,
    AlternativesConsidered,
    PhasedPlan,
    RollbackStrategy,
    SuccessMetrics,
}

impl SectionKind {
    /// The four sections of a lightweight specification
    pub const LIGHTWEIGHT: [SectionKind; 4] = [
        SectionKind::Overview,
        SectionKind::AcceptanceScenarios,
        SectionKind::Constraints,
        SectionKind::SuccessCriteria,
    ];

    /// Every section, in document order
    pub const ALL: [SectionKind; 10] = [
        SectionKind::Overview,
        SectionKind::AcceptanceScenarios,
        SectionKind::Constraints,
        SectionKind::SuccessCriteria,
        SectionKind::DependencyAnalysis,
        SectionKind::RiskAssessment,
        SectionKind::AlternativesConsidered,
        SectionKind::PhasedPlan,
        SectionKind::RollbackStrategy,
        SectionKind::SuccessMetrics,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::AcceptanceScenarios => "Acceptance Scenarios",
            Self::Constraints => "Constraints",
            Self::SuccessCriteria => "Success Criteria",
            Self::DependencyAnalysis => "Dependency Analysis",
            Self::RiskAssessment => "Risk Assessment",
            Self::AlternativesConsidered => "Alternatives Considered",
            Self::PhasedPlan => "Phased Plan",
            Self::RollbackStrategy => "Rollback Strategy",
            Self::SuccessMetrics => "Success Metrics",
        }
    }
}

/// One section of a specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSection {
    pub kind: SectionKind,
    pub entries: Vec<String>,
}

/// A phase in a comprehensive specification's plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPhase {
    pub number: u32,
    pub name: String,
    pub description: String,
    /// Later phases cannot start until a blocking phase completes
    pub blocking: bool,
}

/// A tier-shaped specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub tier: Tier,
    pub request: String,
    pub sections: Vec<SpecSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<PlanPhase>,
}

impl Specification {
    pub fn section(&self, kind: SectionKind) -> Option<&SpecSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.section(kind).is_some()
    }

    pub fn section_kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    pub fn acceptance_scenarios(&self) -> &[String] {
        self.section(SectionKind::AcceptanceScenarios)
            .map(|s| s.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Render as a markdown document for worker context
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# Specification ({})\n\n", self.tier);
        for section in &self.sections {
            md.push_str(&format!("## {}\n\n", section.kind.title()));
            if section.kind == SectionKind::PhasedPlan && !self.phases.is_empty() {
                for phase in &self.phases {
                    let marker = if phase.blocking { " (blocking)" } else { "" };
                    md.push_str(&format!(
                        "{}. **{}**{}: {}\n",
                        phase.number, phase.name, marker, phase.description
                    ));
                }
            } else {
                for entry in &section.entries {
                    md.push_str(&format!("- {}\n", entry));
                }
            }
            md.push('\n');
        }
        md
    }
}

/// Builds specifications whose depth follows the tier
pub struct SpecBuilder;

impl SpecBuilder {
    /// Build a specification for a request
    ///
    /// `Simple` yields none. `Medium` yields exactly the four lightweight
    /// sections. `Complex` yields every section plus a phased plan.
    pub fn build(tier: Tier, request: &str) -> Option<Specification> {
        let kinds: &[SectionKind] = match tier {
            Tier::Simple => {
                tracing::debug!("simple tier, no specification");
                return None;
            }
            Tier::Medium => &SectionKind::LIGHTWEIGHT,
            Tier::Complex => &SectionKind::ALL,
        };

        let request = request.trim();
        let requirements = split_requirements(request);
        let sections = kinds
            .iter()
            .map(|kind| SpecSection {
                kind: *kind,
                entries: section_entries(*kind, request, &requirements),
            })
            .collect::<Vec<_>>();

        let phases = if tier == Tier::Complex {
            phased_plan(request)
        } else {
            Vec::new()
        };

        tracing::info!(%tier, sections = sections.len(), "built specification");
        Some(Specification {
            tier,
            request: request.to_string(),
            sections,
            phases,
        })
    }

    /// Build from a tier name; unknown names are an `InvalidTier` error
    pub fn build_from_str(tier: &str, request: &str) -> Result<Option<Specification>> {
        let tier: Tier = tier.parse()?;
        Ok(Self::build(tier, request))
    }
}

/// Split a request into requirement clauses (sentences and "and"-joined parts)
fn split_requirements(request: &str) -> Vec<String> {
    request
        .split(|c: char| matches!(c, '.' | ';' | '\n'))
        .flat_map(|sentence| sentence.split(" and "))
        .map(|clause| clause.trim())
        .filter(|clause| !clause.is_empty())
        .map(str::to_string)
        .collect()
}

fn acceptance_scenarios(request: &str, requirements: &[String]) -> Vec<String> {
    let mut scenarios: Vec<String> = requirements
        .iter()
        .take(MAX_SCENARIOS - 2)
        .map(|req| format!("Given the change is deployed, when a user relies on it, then {}", req))
        .collect();

    if scenarios.is_empty() {
        scenarios.push(format!(
            "Given the change is deployed, when a user relies on it, then {}",
            request
        ));
    }
    scenarios.push("Given invalid or missing input, when the feature is used, then it fails with a clear error".to_string());
    scenarios.push("Given existing behavior, when the change ships, then no previously passing scenario regresses".to_string());

    scenarios.truncate(MAX_SCENARIOS);
    debug_assert!(scenarios.len() >= MIN_SCENARIOS);
    scenarios
}

fn section_entries(kind: SectionKind, request: &str, requirements: &[String]) -> Vec<String> {
    match kind {
        SectionKind::Overview => vec![request.to_string()],
        SectionKind::AcceptanceScenarios => acceptance_scenarios(request, requirements),
        SectionKind::Constraints => vec![
            "Public interfaces stay backward compatible unless stated otherwise".to_string(),
            "No banned patterns (suppressed checks, skipped tests, placeholder code)".to_string(),
        ],
        SectionKind::SuccessCriteria => {
            let mut criteria: Vec<String> = requirements
                .iter()
                .map(|req| format!("Demonstrated: {}", req))
                .collect();
            criteria.push("All static checks pass".to_string());
            criteria.push("No regressions in existing tests".to_string());
            criteria
        }
        SectionKind::DependencyAnalysis => vec![
            "Upstream components this change consumes".to_string(),
            "Downstream consumers affected by this change".to_string(),
        ],
        SectionKind::RiskAssessment => vec![
            "Risk: behavior change for existing callers. Mitigation: regression tests before merge".to_string(),
            "Risk: partial rollout leaves mixed state. Mitigation: phase gates with rollback".to_string(),
        ],
        SectionKind::AlternativesConsidered => vec![
            "Minimal change within the existing design".to_string(),
            "Restructure the affected component".to_string(),
        ],
        SectionKind::PhasedPlan => phased_plan(request)
            .into_iter()
            .map(|p| format!("{}: {}", p.name, p.description))
            .collect(),
        SectionKind::RollbackStrategy => vec![
            "Each phase lands independently and can be reverted on its own".to_string(),
            "Contracts phase is revertible only after dependent phases are reverted".to_string(),
        ],
        SectionKind::SuccessMetrics => vec![
            "Every acceptance scenario passes".to_string(),
            "Zero new static-check findings".to_string(),
            "No latency or error-rate regression against the pre-change baseline".to_string(),
        ],
    }
}

/// Phase 0 = contracts, then implementation, integration, validation
fn phased_plan(request: &str) -> Vec<PlanPhase> {
    vec![
        PlanPhase {
            number: 0,
            name: "contracts".to_string(),
            description: format!("Define contracts and interfaces for: {}", request),
            blocking: true,
        },
        PlanPhase {
            number: 1,
            name: "implementation".to_string(),
            description: "Implement against the agreed contracts".to_string(),
            blocking: false,
        },
        PlanPhase {
            number: 2,
            name: "integration".to_string(),
            description: "Integrate all implementation work".to_string(),
            blocking: true,
        },
        PlanPhase {
            number: 3,
            name: "validation".to_string(),
            description: "Validate against requirements".to_string(),
            blocking: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use orca_core::OrcaError;

    #[test]
    fn test_simple_has_no_spec() {
        assert!(SpecBuilder::build(Tier::Simple, "Fix typo in README").is_none());
    }

    #[test]
    fn test_medium_has_exactly_four_sections() {
        let spec = SpecBuilder::build(Tier::Medium, "Add CSV export to reports").unwrap();
        assert_eq!(spec.section_kinds(), SectionKind::LIGHTWEIGHT.to_vec());
        assert!(!spec.has_section(SectionKind::PhasedPlan));
        assert!(spec.phases.is_empty());

        let scenarios = spec.acceptance_scenarios().len();
        assert!((MIN_SCENARIOS..=MAX_SCENARIOS).contains(&scenarios));
    }

    #[test]
    fn test_scenario_count_is_capped() {
        let request = "Add export. Add import. Add preview. Add scheduling. Add sharing.";
        let spec = SpecBuilder::build(Tier::Medium, request).unwrap();
        assert_eq!(spec.acceptance_scenarios().len(), MAX_SCENARIOS);
    }

    #[test]
    fn test_complex_has_every_section() {
        let spec = SpecBuilder::build(Tier::Complex, "Split billing into its own service").unwrap();
        assert_eq!(spec.sections.len(), SectionKind::ALL.len());
        assert!(spec.has_section(SectionKind::PhasedPlan));
        assert!(spec.has_section(SectionKind::RollbackStrategy));
        assert_eq!(spec.phases.first().map(|p| p.name.as_str()), Some("contracts"));
        assert_eq!(spec.phases.last().map(|p| p.name.as_str()), Some("validation"));

        let md = spec.to_markdown();
        assert!(md.contains("## Rollback Strategy"));
        assert!(md.contains("0. **contracts** (blocking)"));
    }

    #[test]
    fn test_unknown_tier_rejected() {
        assert!(matches!(
            SpecBuilder::build_from_str("epic", "anything"),
            Err(OrcaError::InvalidTier(_))
        ));
        assert!(SpecBuilder::build_from_str("simple", "anything")
            .unwrap()
            .is_none());
    }
}
