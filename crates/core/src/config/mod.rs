use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{MindFlowError, Result};

/// Tunable thresholds for frame classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Minimum detection confidence before a landmark is trusted.
    pub min_confidence: f32,
    /// How long a pose must stay in the tolerance band before a hold
    /// counts as achieved.
    pub hold_event_threshold: Duration,
    /// Session length used when neither the caller nor the exercise
    /// definition supplies one.
    pub fallback_duration: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            hold_event_threshold: Duration::from_secs(1),
            fallback_duration: Duration::from_secs(300),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(MindFlowError::InvalidConfiguration(format!(
                "min_confidence {} is outside [0, 1]",
                self.min_confidence
            )));
        }
        if self.fallback_duration.is_zero() {
            return Err(MindFlowError::InvalidConfiguration(
                "fallback_duration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
