//! Evidence vocabulary handed from planners and testers to the gates
//!
//! A gate never trusts an assertion of success on its own: each required
//! kind must arrive as an item with either a non-blank summary or at least
//! one concrete artifact.

use serde::{Deserialize, Serialize};

/// Kinds of evidence a gate can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    // Gate 1 (plan)
    IntegrationPoints,
    Risks,
    TestApproach,
    PhasedBreakdown,
    AlternativesConsidered,
    // Gate 2 (completion)
    Functional,
    NoRegressions,
    ExternalArtifacts,
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IntegrationPoints => write!(f, "integration_points"),
            Self::Risks => write!(f, "risks"),
            Self::TestApproach => write!(f, "test_approach"),
            Self::PhasedBreakdown => write!(f, "phased_breakdown"),
            Self::AlternativesConsidered => write!(f, "alternatives_considered"),
            Self::Functional => write!(f, "functional"),
            Self::NoRegressions => write!(f, "no_regressions"),
            Self::ExternalArtifacts => write!(f, "external_artifacts"),
        }
    }
}

/// Types of concrete evidence artifacts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// Browser screenshot
    Screenshot,
    /// Accessibility tree snapshot
    AccessibilityTree,
    /// Performance metrics log
    PerformanceLog,
    /// Captured test run output
    TestLog,
    /// Custom artifact with type name
    Custom(String),
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactType::Screenshot => write!(f, "screenshot"),
            ArtifactType::AccessibilityTree => write!(f, "accessibility_tree"),
            ArtifactType::PerformanceLog => write!(f, "performance_log"),
            ArtifactType::TestLog => write!(f, "test_log"),
            ArtifactType::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A concrete artifact backing an evidence claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_type: ArtifactType,
    /// Location as reported by the worker; never opened by the core
    pub path: String,
    #[serde(default)]
    pub description: String,
}

impl Artifact {
    pub fn new(artifact_type: ArtifactType, path: impl Into<String>) -> Self {
        Self {
            artifact_type,
            path: path.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One piece of evidence of a given kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: EvidenceKind,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl EvidenceItem {
    pub fn new(kind: EvidenceKind, summary: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// A blank summary with no artifacts is the same as no evidence
    pub fn is_present(&self) -> bool {
        !self.summary.trim().is_empty() || !self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_item_is_missing() {
        assert!(!EvidenceItem::new(EvidenceKind::Functional, "   ").is_present());
        assert!(EvidenceItem::new(EvidenceKind::Functional, "login works").is_present());

        let screenshot_only = EvidenceItem::new(EvidenceKind::ExternalArtifacts, "")
            .with_artifact(Artifact::new(ArtifactType::Screenshot, "shots/login.png"));
        assert!(screenshot_only.is_present());
    }

    #[test]
    fn test_evidence_wire_format() {
        let json = r#"{
            "kind": "external_artifacts",
            "summary": "captured",
            "artifacts": [{"artifact_type": "screenshot", "path": "a.png"}]
        }"#;
        let item: EvidenceItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, EvidenceKind::ExternalArtifacts);
        assert_eq!(item.artifacts[0].artifact_type, ArtifactType::Screenshot);
        assert_eq!(item.artifacts[0].description, "");
    }
}
