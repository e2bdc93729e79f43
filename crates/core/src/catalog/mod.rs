//! Exercise catalog.
//!
//! A read-only table of exercise definitions, fixed at process start.
//! Joint names form a closed variant set so that unknown names are
//! rejected when definitions are loaded, not when a session is already
//! running.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{MindFlowError, Result};

/// Anatomical points the catalog may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
    Ear,
}

impl Joint {
    pub fn name(self) -> &'static str {
        match self {
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::Wrist => "wrist",
            Joint::Hip => "hip",
            Joint::Knee => "knee",
            Joint::Ankle => "ankle",
            Joint::Ear => "ear",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Duration-only activity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Meditation,
    Breathing,
    Stretch,
}

/// Inhale-hold-exhale phase lengths, written `"4-4-4"` in seconds.
///
/// The phase sum doubles as the cycle length for all duration-only
/// activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingPattern {
    pub inhale: Duration,
    pub hold: Duration,
    pub exhale: Duration,
}

impl BreathingPattern {
    /// Parses the `"4-4-4"` notation used by the catalog.
    pub fn parse(text: &str) -> Result<Self> {
        let mut phases = [Duration::ZERO; 3];
        let mut parts = text.split('-');
        for slot in phases.iter_mut() {
            let part = parts.next().ok_or_else(|| {
                MindFlowError::InvalidConfiguration(format!(
                    "breathing pattern `{text}` must have three phases"
                ))
            })?;
            let seconds: u64 = part.trim().parse().map_err(|_| {
                MindFlowError::InvalidConfiguration(format!(
                    "breathing pattern `{text}` has a non-numeric phase `{part}`"
                ))
            })?;
            *slot = Duration::from_secs(seconds);
        }
        if parts.next().is_some() {
            return Err(MindFlowError::InvalidConfiguration(format!(
                "breathing pattern `{text}` must have exactly three phases"
            )));
        }
        let pattern = Self {
            inhale: phases[0],
            hold: phases[1],
            exhale: phases[2],
        };
        if pattern.cycle_length().is_zero() {
            return Err(MindFlowError::InvalidConfiguration(format!(
                "breathing pattern `{text}` has a zero cycle length"
            )));
        }
        Ok(pattern)
    }

    pub fn cycle_length(&self) -> Duration {
        self.inhale + self.hold + self.exhale
    }
}

impl Default for BreathingPattern {
    fn default() -> Self {
        Self {
            inhale: Duration::from_secs(4),
            hold: Duration::from_secs(4),
            exhale: Duration::from_secs(4),
        }
    }
}

/// Classification family of an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExerciseKind {
    /// Counted repetitions. `up_angle` recognises the contracted position,
    /// `down_angle` the extended one; the gap between them is the
    /// hysteresis band.
    Rep { up_angle: f32, down_angle: f32 },
    /// A pose sustained inside `target_angle ± tolerance`.
    Hold { target_angle: f32, tolerance: f32 },
    /// Tracked purely by wall-clock time and a repeating cycle.
    Timed {
        activity: Activity,
        pattern: BreathingPattern,
    },
}

impl ExerciseKind {
    /// Whether this kind classifies joint geometry (as opposed to time).
    pub fn needs_geometry(&self) -> bool {
        !matches!(self, ExerciseKind::Timed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExerciseKind::Rep { .. } => "rep",
            ExerciseKind::Hold { .. } => "hold",
            ExerciseKind::Timed { activity, .. } => match activity {
                Activity::Meditation => "meditation",
                Activity::Breathing => "breathing",
                Activity::Stretch => "stretch",
            },
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub id: String,
    pub kind: ExerciseKind,
    /// Joint triple `(outer, vertex, outer)` for geometric kinds.
    pub joints: Option<[Joint; 3]>,
    /// Session length applied when the caller does not supply one.
    pub default_duration: Duration,
}

impl ExerciseDefinition {
    fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(MindFlowError::InvalidConfiguration(msg));
        if self.default_duration.is_zero() {
            return fail(format!("exercise `{}` has a zero default duration", self.id));
        }
        match self.kind {
            ExerciseKind::Rep {
                up_angle,
                down_angle,
            } => {
                if !up_angle.is_finite() || !down_angle.is_finite() {
                    return fail(format!("exercise `{}` has non-finite thresholds", self.id));
                }
                if up_angle <= 0.0 || up_angle >= down_angle {
                    return fail(format!(
                        "exercise `{}` needs 0 < up_angle < down_angle for hysteresis",
                        self.id
                    ));
                }
            }
            ExerciseKind::Hold {
                target_angle,
                tolerance,
            } => {
                if !target_angle.is_finite() || !tolerance.is_finite() {
                    return fail(format!("exercise `{}` has non-finite thresholds", self.id));
                }
                if tolerance <= 0.0 || target_angle <= 0.0 {
                    return fail(format!(
                        "exercise `{}` needs a positive target and tolerance",
                        self.id
                    ));
                }
                // Measured angles are folded into [0, 180]; a band that
                // starts above that is never reachable.
                if target_angle - tolerance >= 180.0 {
                    return fail(format!(
                        "exercise `{}` tolerance band lies entirely above 180 degrees",
                        self.id
                    ));
                }
            }
            ExerciseKind::Timed { pattern, .. } => {
                if pattern.cycle_length().is_zero() {
                    return fail(format!("exercise `{}` has a zero cycle length", self.id));
                }
            }
        }
        if self.kind.needs_geometry() && self.joints.is_none() {
            return fail(format!("exercise `{}` requires a joint triple", self.id));
        }
        Ok(())
    }
}

/// Read-only id → definition table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, ExerciseDefinition>,
}

impl Catalog {
    /// Builds a catalog, validating every definition up front.
    pub fn from_definitions(definitions: Vec<ExerciseDefinition>) -> Result<Self> {
        let mut entries = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            definition.validate()?;
            if entries
                .insert(definition.id.clone(), definition)
                .is_some()
            {
                return Err(MindFlowError::InvalidConfiguration(
                    "duplicate exercise id in catalog".to_string(),
                ));
            }
        }
        Ok(Self { entries })
    }

    /// The stock exercise table.
    pub fn builtin() -> Self {
        let rep = |id: &str, joints, up_angle, down_angle| ExerciseDefinition {
            id: id.to_string(),
            kind: ExerciseKind::Rep {
                up_angle,
                down_angle,
            },
            joints: Some(joints),
            default_duration: Duration::from_secs(300),
        };
        let hold = |id: &str, joints, target_angle, tolerance| ExerciseDefinition {
            id: id.to_string(),
            kind: ExerciseKind::Hold {
                target_angle,
                tolerance,
            },
            joints: Some(joints),
            default_duration: Duration::from_secs(300),
        };
        let timed = |id: &str, activity, secs| ExerciseDefinition {
            id: id.to_string(),
            kind: ExerciseKind::Timed {
                activity,
                pattern: BreathingPattern::default(),
            },
            joints: None,
            default_duration: Duration::from_secs(secs),
        };

        use Joint::{Ankle, Ear, Elbow, Hip, Knee, Shoulder, Wrist};
        let arm = [Shoulder, Elbow, Wrist];
        let leg = [Hip, Knee, Ankle];

        Self::from_definitions(vec![
            rep("bicep_curl", arm, 30.0, 160.0),
            rep("squat", leg, 90.0, 170.0),
            rep("pushup", arm, 70.0, 160.0),
            rep("lunge", leg, 90.0, 170.0),
            hold("tree_pose", leg, 180.0, 20.0),
            hold("warrior_ii", leg, 100.0, 20.0),
            hold("plank", [Shoulder, Hip, Ankle], 180.0, 15.0),
            hold("chair_pose", leg, 100.0, 15.0),
            hold("cobra_pose", [Hip, Shoulder, Ear], 200.0, 30.0),
            timed("meditation", Activity::Meditation, 300),
            timed("breathing", Activity::Breathing, 300),
            timed("stretching", Activity::Stretch, 120),
        ])
        .expect("builtin catalog must validate")
    }

    /// Looks up a definition, failing for absent ids.
    pub fn get(&self, id: &str) -> Result<&ExerciseDefinition> {
        self.entries
            .get(id)
            .ok_or_else(|| MindFlowError::UnknownExercise(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Definitions ordered by id, for listings.
    pub fn definitions(&self) -> Vec<&ExerciseDefinition> {
        let mut definitions: Vec<_> = self.entries.values().collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }
}
