use crate::MatchError;

const SUM_TOLERANCE: f64 = 1e-6;

/// Composite ranking weights (skill-first; rate and location share the rest).
pub const DEFAULT_WEIGHTS: Weights = Weights {
    skill: 0.60,
    rate: 0.15,
    location: 0.15,
    recency: 0.10,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub skill: f64,
    pub rate: f64,
    pub location: f64,
    pub recency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.skill + self.rate + self.location + self.recency
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let parts = [
            ("skill", self.skill),
            ("rate", self.rate),
            ("location", self.location),
            ("recency", self.recency),
        ];
        for (name, value) in parts {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::configuration(format!(
                    "weight '{name}' must be a non-negative number, got {value}"
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(MatchError::configuration(format!(
                "ranking weights must sum to 1.0, got {sum:.6}"
            )));
        }
        Ok(())
    }
}
