//! Landmark frames and joint resolution.
//!
//! A [`LandmarkFrame`] is the per-frame output of the external detector:
//! named 2-D points with a detection confidence. Resolution never falls
//! back to a zero point for missing joints; a zero coordinate would flow
//! into the angle computation and corrupt it without any signal that the
//! detection failed. An absent or low-confidence joint is an explicit
//! [`MindFlowError::LandmarkUnavailable`] instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;
use crate::{Joint, MindFlowError, Result};

/// One tracked body point in normalised image coordinates.
///
/// `confidence` is in `[0, 1]`; zero means the detector did not see the
/// point this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// All landmarks detected in one camera frame, keyed by joint.
///
/// Immutable once handed to the session driver; discarded after the
/// frame is classified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: HashMap<Joint, LandmarkPoint>,
}

impl LandmarkFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, joint: Joint, point: LandmarkPoint) -> Self {
        self.points.insert(joint, point);
        self
    }

    pub fn insert(&mut self, joint: Joint, point: LandmarkPoint) {
        self.points.insert(joint, point);
    }

    pub fn get(&self, joint: Joint) -> Option<&LandmarkPoint> {
        self.points.get(&joint)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Resolves a named joint to its position, requiring at least
/// `min_confidence` to trust the detection.
pub fn resolve(frame: &LandmarkFrame, joint: Joint, min_confidence: f32) -> Result<Point2D> {
    match frame.get(joint) {
        Some(point) if point.confidence >= min_confidence => Ok(point.position()),
        _ => Err(MindFlowError::LandmarkUnavailable { joint: joint.name() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_confident_landmarks() {
        let frame = LandmarkFrame::new().with(Joint::Knee, LandmarkPoint::new(0.4, 0.6, 0.9));
        let point = resolve(&frame, Joint::Knee, 0.5).unwrap();
        assert_eq!(point, Point2D::new(0.4, 0.6));
    }

    #[test]
    fn missing_joint_is_unavailable_not_zero() {
        let frame = LandmarkFrame::new();
        let err = resolve(&frame, Joint::Hip, 0.5).unwrap_err();
        assert!(matches!(
            err,
            MindFlowError::LandmarkUnavailable { joint: "hip" }
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn low_confidence_joint_is_unavailable() {
        let frame = LandmarkFrame::new().with(Joint::Ankle, LandmarkPoint::new(0.1, 0.2, 0.2));
        assert!(resolve(&frame, Joint::Ankle, 0.5).is_err());
    }

    #[test]
    fn frames_deserialize_from_named_objects() {
        let json = r#"{"shoulder": {"x": 0.5, "y": 0.3, "confidence": 0.8},
                       "elbow": {"x": 0.5, "y": 0.5}}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.get(Joint::Shoulder).unwrap().confidence, 0.8);
        // Confidence defaults to fully trusted when the detector omits it.
        assert_eq!(frame.get(Joint::Elbow).unwrap().confidence, 1.0);
    }
}
