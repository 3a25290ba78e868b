use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default relative weights for the six dimensions. The set sums to 1.0 but
/// only relative magnitude matters: the composite is normalized by the
/// weights of the dimensions that actually produced a score.
pub const DEFAULT_WEIGHTS: MatchWeights = MatchWeights {
    industry: 0.25,
    geography: 0.15,
    financial: 0.25,
    profile: 0.10,
    timeline: 0.10,
    transaction: 0.15,
};

#[derive(Debug, Error, PartialEq)]
pub enum WeightsError {
    #[error("weight for {0} is negative")]
    Negative(&'static str),
    #[error("at least one weight must be positive")]
    AllZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub industry: f64,
    pub geography: f64,
    pub financial: f64,
    pub profile: f64,
    pub timeline: f64,
    pub transaction: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl MatchWeights {
    pub fn sum(&self) -> f64 {
        self.industry + self.geography + self.financial + self.profile + self.timeline
            + self.transaction
    }

    fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("industry", self.industry),
            ("geography", self.geography),
            ("financial", self.financial),
            ("profile", self.profile),
            ("timeline", self.timeline),
            ("transaction", self.transaction),
        ]
    }

    /// Rejects unusable weight sets before any scoring starts.
    pub fn validate(&self) -> Result<(), WeightsError> {
        for (name, value) in self.named() {
            if value < 0.0 || !value.is_finite() {
                return Err(WeightsError::Negative(name));
            }
        }
        if self.named().iter().all(|(_, value)| *value == 0.0) {
            return Err(WeightsError::AllZero);
        }
        Ok(())
    }
}
