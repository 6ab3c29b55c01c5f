//! Complexity scoring

use orca_core::{ComplexityFactors, OrcaError, Result, Tier};
use serde::{Deserialize, Serialize};

/// Highest value any single factor may take
pub const MAX_FACTOR_VALUE: u8 = 2;

/// Upper bound (inclusive) of the Simple tier
const SIMPLE_MAX: u32 = 2;
/// Upper bound (inclusive) of the Medium tier
const MEDIUM_MAX: u32 = 5;

/// Total score and the tier it selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub total: u32,
    pub tier: Tier,
}

impl std::fmt::Display for ComplexityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.total, self.tier)
    }
}

/// Maps seven weighted factors to a score and a tier
pub struct ComplexityScorer;

impl ComplexityScorer {
    /// Score a request
    ///
    /// Any factor above 2 is rejected rather than clamped.
    pub fn score(factors: &ComplexityFactors) -> Result<ComplexityScore> {
        let mut total = 0u32;
        for (factor, value) in factors.iter() {
            if value > MAX_FACTOR_VALUE {
                return Err(OrcaError::InvalidFactor { factor, value });
            }
            total += u32::from(value);
        }

        let tier = Self::tier_for(total);
        tracing::debug!(total, %tier, "scored complexity");
        Ok(ComplexityScore { total, tier })
    }

    /// Tier boundaries: <=2 Simple, 3..=5 Medium, >=6 Complex
    pub fn tier_for(total: u32) -> Tier {
        if total <= SIMPLE_MAX {
            Tier::Simple
        } else if total <= MEDIUM_MAX {
            Tier::Medium
        } else {
            Tier::Complex
        }
    }
}
