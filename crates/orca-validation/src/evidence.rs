//! Evidence bundles submitted to a gate

use orca_core::{EvidenceItem, EvidenceKind};
use serde::{Deserialize, Serialize};

/// Everything a gate gets to look at
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub items: Vec<EvidenceItem>,
    /// Plan or diff text screened for banned patterns
    #[serde(default)]
    pub subject: String,
    /// Task needs concrete external artifacts before completion
    #[serde(default)]
    pub requires_external_verification: bool,
}

impl Evidence {
    pub fn new(items: Vec<EvidenceItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_external_verification(mut self, required: bool) -> Self {
        self.requires_external_verification = required;
        self
    }

    /// Whether usable evidence of `kind` was submitted
    ///
    /// External artifacts only count when at least one concrete artifact is
    /// attached; an assertion alone is not enough.
    pub fn has(&self, kind: EvidenceKind) -> bool {
        self.items.iter().filter(|i| i.kind == kind).any(|item| {
            if kind == EvidenceKind::ExternalArtifacts {
                !item.artifacts.is_empty()
            } else {
                item.is_present()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orca_core::{Artifact, ArtifactType};

    #[test]
    fn test_external_artifacts_need_an_artifact() {
        let asserted = Evidence::new(vec![EvidenceItem::new(
            EvidenceKind::ExternalArtifacts,
            "verified in browser",
        )]);
        assert!(!asserted.has(EvidenceKind::ExternalArtifacts));

        let captured = Evidence::new(vec![EvidenceItem::new(EvidenceKind::ExternalArtifacts, "")
            .with_artifact(Artifact::new(ArtifactType::Screenshot, "checkout.png"))]);
        assert!(captured.has(EvidenceKind::ExternalArtifacts));
    }

    #[test]
    fn test_any_present_item_counts() {
        let evidence = Evidence::new(vec![
            EvidenceItem::new(EvidenceKind::Functional, ""),
            EvidenceItem::new(EvidenceKind::Functional, "integration test passes"),
        ]);
        assert!(evidence.has(EvidenceKind::Functional));
        assert!(!evidence.has(EvidenceKind::NoRegressions));
    }
}
