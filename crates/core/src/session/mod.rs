//! Session orchestration.
//!
//! The driver runs one session end to end: it pulls landmark frames from
//! a [`LandmarkSource`], resolves the exercise's joint triple, feeds the
//! state machine, and forwards every classified event to an
//! [`EventSink`]. The loop is frame-synchronous; the only suspension
//! point is waiting on the source. Cancellation is cooperative via a
//! [`StopToken`] checked at frame boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::Catalog;
use crate::config::TrackerConfig;
use crate::events::{EventSink, SessionEvent, SessionMetrics};
use crate::geometry::included_angle;
use crate::landmarks::{resolve, LandmarkFrame};
use crate::tracker::ExerciseTracker;
use crate::{MindFlowError, Result};

/// What the landmark provider produced for one frame request.
#[derive(Debug, Clone)]
pub enum FramePoll {
    /// Landmarks were detected this frame.
    Frame(LandmarkFrame),
    /// The detector ran but found nothing usable; skip and keep going.
    NoFrame,
    /// The provider has no further frames (end of stream).
    End,
}

/// External landmark provider boundary. Implementations wrap whatever
/// produces detections: a camera pipeline, a replay file, a test script.
pub trait LandmarkSource {
    /// Returns the next frame, `NoFrame` for an empty detection, `End`
    /// when the stream is exhausted, or an error on detector failure.
    fn next_frame(&mut self) -> Result<FramePoll>;
}

/// Session-relative time source.
pub trait Clock {
    /// Time elapsed since the session started.
    fn now(&mut self) -> Duration;
}

/// Wall-clock time from a monotonic anchor.
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Duration {
        self.started.elapsed()
    }
}

/// Deterministic clock that advances a fixed step per reading. Used for
/// replaying recorded frames at a nominal frame rate and for tests.
#[derive(Debug)]
pub struct FixedStepClock {
    step: Duration,
    ticks: u64,
}

impl FixedStepClock {
    pub fn new(step: Duration) -> Self {
        Self { step, ticks: 0 }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }
}

impl Clock for FixedStepClock {
    fn now(&mut self) -> Duration {
        let now = self.step * self.ticks as u32;
        self.ticks += 1;
        now
    }
}

/// Cooperative cancellation flag. Clones share the flag; the session
/// stops at the next frame boundary after [`StopToken::stop`] is called.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Caller-supplied session parameters.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub session_id: Option<String>,
    /// Overrides the exercise's default session length.
    pub duration: Option<Duration>,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Stopped,
    DetectorFailed,
}

/// Summary returned to the embedding caller once a session ends.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub metrics: SessionMetrics,
    pub total_time: Duration,
    pub frames_processed: u64,
    /// Frames dropped for transient reasons (missing landmark, invalid
    /// angle, empty detection).
    pub frames_skipped: u64,
}

/// Drives one session across its lifetime.
impl std::fmt::Debug for SessionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDriver").finish_non_exhaustive()
    }
}

pub struct SessionDriver {
    tracker: ExerciseTracker,
    config: TrackerConfig,
    clock: Box<dyn Clock>,
    stop: StopToken,
}

impl SessionDriver {
    /// Validates the exercise id and configuration up front; a session
    /// that would fail is never started.
    pub fn new(
        catalog: &Catalog,
        exercise_id: &str,
        options: SessionOptions,
        config: TrackerConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let definition = catalog.get(exercise_id)?.clone();
        let tracker = ExerciseTracker::new(
            definition,
            options.session_id,
            options.duration,
            config.hold_event_threshold,
        );
        Ok(Self {
            tracker,
            config,
            clock,
            stop: StopToken::new(),
        })
    }

    /// Handle for cancelling the session from another thread.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Runs the session to a terminal event. Per-frame failures are
    /// absorbed as skips; only detector failure or cancellation ends the
    /// session early, and every ending is surfaced to the sink.
    pub fn run(
        mut self,
        source: &mut dyn LandmarkSource,
        sink: &mut dyn EventSink,
    ) -> Result<SessionReport> {
        let needs_geometry = self.tracker.definition().kind.needs_geometry();
        let mut frames_processed = 0u64;
        let mut frames_skipped = 0u64;

        sink.emit(&self.tracker.started_event())?;

        loop {
            let now = self.clock.now();

            if self.stop.is_stopped() {
                let event = self.tracker.stopped_event(now);
                sink.emit(&event)?;
                return Ok(self.report(SessionOutcome::Stopped, now, frames_processed, frames_skipped));
            }

            if now >= self.tracker.session_duration() {
                let event = self.tracker.complete_event(now);
                sink.emit(&event)?;
                return Ok(self.report(
                    SessionOutcome::Completed,
                    now,
                    frames_processed,
                    frames_skipped,
                ));
            }

            let poll = match source.next_frame() {
                Ok(poll) => poll,
                Err(err) => {
                    let event = self.tracker.detector_failed_event(err.to_string());
                    sink.emit(&event)?;
                    return Ok(self.report(
                        SessionOutcome::DetectorFailed,
                        now,
                        frames_processed,
                        frames_skipped,
                    ));
                }
            };

            match poll {
                FramePoll::End => {
                    let event = self.tracker.stopped_event(now);
                    sink.emit(&event)?;
                    return Ok(self.report(
                        SessionOutcome::Stopped,
                        now,
                        frames_processed,
                        frames_skipped,
                    ));
                }
                FramePoll::NoFrame if needs_geometry => frames_skipped += 1,
                FramePoll::NoFrame => {
                    frames_processed += 1;
                    for event in self.tracker.advance_time(now) {
                        sink.emit(&event)?;
                    }
                }
                FramePoll::Frame(frame) if needs_geometry => {
                    match self.classify(&frame, now) {
                        Ok(events) => {
                            frames_processed += 1;
                            for event in events {
                                sink.emit(&event)?;
                            }
                        }
                        // Missing or untrusted landmarks and malformed
                        // angles skip the frame with state unchanged.
                        Err(err) if err.is_transient() => frames_skipped += 1,
                        Err(err) => return Err(err),
                    }
                }
                FramePoll::Frame(_) => {
                    frames_processed += 1;
                    for event in self.tracker.advance_time(now) {
                        sink.emit(&event)?;
                    }
                }
            }
        }
    }

    fn classify(&mut self, frame: &LandmarkFrame, now: Duration) -> Result<Vec<SessionEvent>> {
        let joints = self.tracker.definition().joints.ok_or_else(|| {
            MindFlowError::InvalidConfiguration(format!(
                "exercise `{}` is geometric but has no joint triple",
                self.tracker.definition().id
            ))
        })?;
        let a = resolve(frame, joints[0], self.config.min_confidence)?;
        let b = resolve(frame, joints[1], self.config.min_confidence)?;
        let c = resolve(frame, joints[2], self.config.min_confidence)?;
        self.tracker.observe_angle(included_angle(a, b, c), now)
    }

    fn report(
        &self,
        outcome: SessionOutcome,
        total_time: Duration,
        frames_processed: u64,
        frames_skipped: u64,
    ) -> SessionReport {
        SessionReport {
            outcome,
            metrics: self.tracker.metrics(),
            total_time,
            frames_processed,
            frames_skipped,
        }
    }
}
