/// Result alias that carries the custom [`MindFlowError`] type.
pub type Result<T> = std::result::Result<T, MindFlowError>;

/// Common error type for the core crate.
///
/// Variants are split along the propagation policy: `UnknownExercise` and
/// `InvalidConfiguration` are fatal before a session starts,
/// `LandmarkUnavailable` and `InvalidAngle` are per-frame conditions the
/// session driver absorbs by skipping the frame, and `Detector` ends the
/// session without crashing the process.
#[derive(Debug, thiserror::Error)]
pub enum MindFlowError {
    /// The requested exercise id does not exist in the catalog.
    #[error("unknown exercise `{0}`")]
    UnknownExercise(String),
    /// A catalog entry or pattern failed validation at load time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The named joint was absent from the frame or below the confidence
    /// minimum. Transient; the current frame is skipped.
    #[error("landmark `{joint}` unavailable this frame")]
    LandmarkUnavailable { joint: &'static str },
    /// A non-finite angle reached the state machine. Transient; the current
    /// frame is skipped.
    #[error("invalid angle sample: {0}")]
    InvalidAngle(f32),
    /// The external landmark detector reported a failure. Ends the session.
    #[error("detector failure: {0}")]
    Detector(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around event serialization errors.
    #[error("{0}")]
    Serialize(#[from] serde_json::Error),
}

impl MindFlowError {
    /// Returns true for the per-frame conditions that skip a frame rather
    /// than ending the session.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LandmarkUnavailable { .. } | Self::InvalidAngle(_)
        )
    }
}
