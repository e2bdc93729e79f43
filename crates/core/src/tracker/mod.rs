//! The exercise state machine.
//!
//! One [`ExerciseTracker`] per active session. Each camera frame feeds it
//! either an angle sample ([`ExerciseTracker::observe_angle`], rep and
//! hold kinds) or a clock tick ([`ExerciseTracker::advance_time`],
//! duration-only kinds), and it answers with the classified events for
//! that frame. Per-frame failures leave the state untouched, so a noisy
//! detector can only delay classification, never corrupt it.

use std::time::Duration;

use crate::catalog::{ExerciseDefinition, ExerciseKind};
use crate::events::{SessionEvent, SessionMetrics};
use crate::{MindFlowError, Result};

/// Position within a repetition. `Down` must be seen before `Up` counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    None,
    Down,
    Up,
}

/// Mutable per-session counters. Owned and mutated exclusively by one
/// [`ExerciseTracker`]; all timing is relative to the session start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub stage: Stage,
    pub rep_count: u32,
    pub hold_start: Option<Duration>,
    pub hold_elapsed: Duration,
    /// Set once `HoldAchieved` has fired for the current hold, cleared
    /// when the band is exited.
    hold_marked: bool,
    pub cycle_count: u32,
    pub elapsed: Duration,
}

/// State machine for a single session of one exercise.
pub struct ExerciseTracker {
    definition: ExerciseDefinition,
    session_id: Option<String>,
    session_duration: Duration,
    hold_event_threshold: Duration,
    state: SessionState,
}

impl ExerciseTracker {
    /// Builds a tracker for one session. `session_duration` falls back to
    /// the exercise's default when not supplied.
    pub fn new(
        definition: ExerciseDefinition,
        session_id: Option<String>,
        session_duration: Option<Duration>,
        hold_event_threshold: Duration,
    ) -> Self {
        let session_duration = session_duration.unwrap_or(definition.default_duration);
        Self {
            definition,
            session_id,
            session_duration,
            hold_event_threshold,
            state: SessionState::default(),
        }
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        &self.definition
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_duration(&self) -> Duration {
        self.session_duration
    }

    /// True once the session has run for its configured duration.
    pub fn is_complete(&self) -> bool {
        self.state.elapsed >= self.session_duration
    }

    /// Current counters, as reported by terminal events.
    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            reps: self.state.rep_count,
            hold_seconds: self.state.hold_elapsed.as_secs_f64(),
            cycles: self.state.cycle_count,
        }
    }

    /// Feeds one angle sample for rep and hold kinds.
    ///
    /// A non-finite or out-of-range sample is rejected with
    /// [`MindFlowError::InvalidAngle`] and the state is left exactly as it
    /// was, as if the frame had never arrived.
    pub fn observe_angle(&mut self, angle: f32, now: Duration) -> Result<Vec<SessionEvent>> {
        if !angle.is_finite() || !(0.0..=360.0).contains(&angle) {
            return Err(MindFlowError::InvalidAngle(angle));
        }

        self.state.elapsed = now;
        let mut events = Vec::new();
        match self.definition.kind {
            ExerciseKind::Rep {
                up_angle,
                down_angle,
            } => {
                // Re-entering the down position keeps the stage silently;
                // only the down→up transition counts a rep.
                if angle > down_angle {
                    self.state.stage = Stage::Down;
                }
                if angle < up_angle && self.state.stage == Stage::Down {
                    self.state.stage = Stage::Up;
                    self.state.rep_count += 1;
                    events.push(SessionEvent::RepCompleted {
                        exercise: self.definition.id.clone(),
                        session_id: self.session_id.clone(),
                        count: self.state.rep_count,
                        angle,
                    });
                }
            }
            ExerciseKind::Hold {
                target_angle,
                tolerance,
            } => {
                if (angle - target_angle).abs() < tolerance {
                    match self.state.hold_start {
                        None => self.state.hold_start = Some(now),
                        Some(start) => {
                            self.state.hold_elapsed = now.saturating_sub(start);
                            if !self.state.hold_marked
                                && self.state.hold_elapsed >= self.hold_event_threshold
                            {
                                self.state.hold_marked = true;
                                events.push(SessionEvent::HoldAchieved {
                                    exercise: self.definition.id.clone(),
                                    session_id: self.session_id.clone(),
                                    hold_elapsed: self.state.hold_elapsed.as_secs_f64(),
                                });
                            }
                        }
                    }
                } else {
                    if self.state.hold_start.is_some() {
                        events.push(SessionEvent::HoldBroken {
                            exercise: self.definition.id.clone(),
                            session_id: self.session_id.clone(),
                            duration: self.state.hold_elapsed.as_secs_f64(),
                        });
                    }
                    self.state.hold_start = None;
                    self.state.hold_elapsed = Duration::ZERO;
                    self.state.hold_marked = false;
                }
            }
            // Duration-only kinds have no geometry; an angle sample only
            // moves the clock forward.
            ExerciseKind::Timed { .. } => {}
        }
        Ok(events)
    }

    /// Advances the session clock for duration-only kinds, emitting one
    /// `CycleAdvanced` per cycle boundary crossed since the last call.
    pub fn advance_time(&mut self, now: Duration) -> Vec<SessionEvent> {
        self.state.elapsed = now;
        let mut events = Vec::new();
        if let ExerciseKind::Timed { pattern, .. } = self.definition.kind {
            let cycle_length = pattern.cycle_length().as_secs_f64();
            let reached = (now.as_secs_f64() / cycle_length) as u32;
            while self.state.cycle_count < reached {
                self.state.cycle_count += 1;
                events.push(SessionEvent::CycleAdvanced {
                    exercise: self.definition.id.clone(),
                    session_id: self.session_id.clone(),
                    cycle_count: self.state.cycle_count,
                });
            }
        }
        events
    }

    /// The record emitted before the first frame is processed.
    pub fn started_event(&self) -> SessionEvent {
        SessionEvent::SessionStarted {
            exercise: self.definition.id.clone(),
            session_id: self.session_id.clone(),
            duration: self.session_duration.as_secs_f64(),
        }
    }

    /// The terminal record for a session that ran to its full duration.
    pub fn complete_event(&mut self, now: Duration) -> SessionEvent {
        self.state.elapsed = now;
        SessionEvent::SessionComplete {
            exercise: self.definition.id.clone(),
            session_id: self.session_id.clone(),
            total_time: now.as_secs_f64(),
            metrics: self.metrics(),
        }
    }

    /// The terminal record for a cancelled session.
    pub fn stopped_event(&mut self, now: Duration) -> SessionEvent {
        self.state.elapsed = now;
        SessionEvent::SessionStopped {
            exercise: self.definition.id.clone(),
            session_id: self.session_id.clone(),
            total_time: now.as_secs_f64(),
            metrics: self.metrics(),
        }
    }

    /// The terminal record for a detector failure.
    pub fn detector_failed_event(&self, message: String) -> SessionEvent {
        SessionEvent::DetectorFailed {
            exercise: self.definition.id.clone(),
            session_id: self.session_id.clone(),
            message,
        }
    }
}

impl std::fmt::Debug for ExerciseTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExerciseTracker")
            .field("exercise", &self.definition.id)
            .field("session_id", &self.session_id)
            .field("session_duration", &self.session_duration)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn tracker_for(id: &str) -> ExerciseTracker {
        let definition = Catalog::builtin().get(id).unwrap().clone();
        ExerciseTracker::new(definition, None, None, Duration::from_secs(1))
    }

    fn seconds(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn rep_counts_only_on_down_up_transition() {
        let mut tracker = tracker_for("bicep_curl");

        assert!(tracker.observe_angle(170.0, seconds(0.0)).unwrap().is_empty());
        assert!(tracker.observe_angle(170.0, seconds(0.1)).unwrap().is_empty());
        let events = tracker.observe_angle(20.0, seconds(0.2)).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::RepCompleted { count, angle, .. } => {
                assert_eq!(*count, 1);
                assert_eq!(*angle, 20.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(tracker.state().rep_count, 1);
        assert_eq!(tracker.state().stage, Stage::Up);
    }

    #[test]
    fn alternating_angles_count_one_rep_per_cycle() {
        let mut tracker = tracker_for("bicep_curl");
        let mut total = 0;
        for (i, angle) in [170.0, 20.0, 170.0, 20.0].into_iter().enumerate() {
            total += tracker
                .observe_angle(angle, seconds(i as f64))
                .unwrap()
                .len();
        }
        assert_eq!(total, 2);
        assert_eq!(tracker.state().rep_count, 2);
    }

    #[test]
    fn dips_without_a_prior_down_never_count() {
        let mut tracker = tracker_for("bicep_curl");
        for i in 0..10 {
            let events = tracker.observe_angle(20.0, seconds(i as f64)).unwrap();
            assert!(events.is_empty());
        }
        assert_eq!(tracker.state().rep_count, 0);
        assert_eq!(tracker.state().stage, Stage::None);
    }

    #[test]
    fn angles_inside_the_hysteresis_gap_leave_stage_unchanged() {
        let mut tracker = tracker_for("bicep_curl");
        tracker.observe_angle(170.0, seconds(0.0)).unwrap();
        assert_eq!(tracker.state().stage, Stage::Down);
        // 30 < 95 < 160: inside the gap, no transition either way.
        tracker.observe_angle(95.0, seconds(1.0)).unwrap();
        assert_eq!(tracker.state().stage, Stage::Down);
        assert_eq!(tracker.state().rep_count, 0);
    }

    #[test]
    fn hold_elapsed_grows_then_breaks() {
        let mut tracker = tracker_for("tree_pose");

        let mut previous = Duration::ZERO;
        let mut achieved = 0;
        for i in 0..5 {
            let events = tracker.observe_angle(175.0, seconds(i as f64)).unwrap();
            achieved += events
                .iter()
                .filter(|e| matches!(e, SessionEvent::HoldAchieved { .. }))
                .count();
            assert!(tracker.state().hold_elapsed >= previous);
            previous = tracker.state().hold_elapsed;
        }
        // Threshold is one second, so the hold is achieved exactly once.
        assert_eq!(achieved, 1);
        assert_eq!(tracker.state().hold_elapsed, seconds(4.0));

        let events = tracker.observe_angle(100.0, seconds(5.0)).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::HoldBroken { duration, .. } => assert_eq!(*duration, 4.0),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(tracker.state().hold_elapsed, Duration::ZERO);
        assert!(tracker.state().hold_start.is_none());
    }

    #[test]
    fn a_new_hold_fires_hold_achieved_again() {
        let mut tracker = tracker_for("tree_pose");
        for i in 0..3 {
            tracker.observe_angle(175.0, seconds(i as f64)).unwrap();
        }
        tracker.observe_angle(100.0, seconds(3.0)).unwrap();

        let mut achieved = 0;
        for i in 4..8 {
            let events = tracker.observe_angle(175.0, seconds(i as f64)).unwrap();
            achieved += events
                .iter()
                .filter(|e| matches!(e, SessionEvent::HoldAchieved { .. }))
                .count();
        }
        assert_eq!(achieved, 1);
    }

    #[test]
    fn out_of_band_samples_without_a_hold_emit_nothing() {
        let mut tracker = tracker_for("tree_pose");
        let events = tracker.observe_angle(90.0, seconds(0.0)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn cycles_advance_once_per_boundary() {
        let mut tracker = tracker_for("meditation");

        let mut observed = Vec::new();
        for elapsed in [11.9, 12.1, 23.9, 24.1] {
            let events = tracker.advance_time(seconds(elapsed));
            observed.push((tracker.state().cycle_count, events.len()));
        }
        assert_eq!(observed, vec![(0, 0), (1, 1), (1, 0), (2, 1)]);
    }

    #[test]
    fn a_large_time_jump_emits_every_missed_cycle() {
        let mut tracker = tracker_for("breathing");
        let events = tracker.advance_time(seconds(37.0));
        let counts: Vec<u32> = events
            .iter()
            .map(|e| match e {
                SessionEvent::CycleAdvanced { cycle_count, .. } => *cycle_count,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[test]
    fn invalid_angles_leave_state_untouched() {
        let mut tracker = tracker_for("bicep_curl");
        tracker.observe_angle(170.0, seconds(1.0)).unwrap();
        let before = tracker.state().clone();

        for bad in [f32::NAN, f32::INFINITY, -5.0, 400.0] {
            let err = tracker.observe_angle(bad, seconds(2.0)).unwrap_err();
            assert!(matches!(err, MindFlowError::InvalidAngle(_)));
            assert_eq!(tracker.state(), &before);
        }
    }

    #[test]
    fn completion_tracks_the_session_duration() {
        let definition = Catalog::builtin().get("squat").unwrap().clone();
        let mut tracker = ExerciseTracker::new(
            definition,
            Some("s1".to_string()),
            Some(Duration::from_secs(10)),
            Duration::from_secs(1),
        );

        tracker.observe_angle(175.0, seconds(9.9)).unwrap();
        assert!(!tracker.is_complete());
        tracker.observe_angle(175.0, seconds(10.0)).unwrap();
        assert!(tracker.is_complete());

        let event = tracker.complete_event(seconds(10.0));
        match event {
            SessionEvent::SessionComplete {
                total_time,
                metrics,
                session_id,
                ..
            } => {
                assert_eq!(total_time, 10.0);
                assert_eq!(metrics.reps, 0);
                assert_eq!(session_id.as_deref(), Some("s1"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
