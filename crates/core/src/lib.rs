//! Core library for the MindFlow exercise tracking application.
//!
//! The crate turns a stream of body-landmark frames into discrete
//! exercise events: repetitions counted, poses held, breathing cycles
//! advanced. Each module owns a distinct subsystem (joint geometry, the
//! exercise catalog, landmark resolution, the classification state
//! machine, event records, session orchestration); the thin camera and
//! rendering layers live in the application crate and outside this
//! repository.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod landmarks;
pub mod session;
pub mod tracker;

pub use catalog::{
    Activity, BreathingPattern, Catalog, ExerciseDefinition, ExerciseKind, Joint,
};
pub use config::TrackerConfig;
pub use error::{MindFlowError, Result};
pub use events::{EventSink, JsonLinesSink, MemorySink, SessionEvent, SessionMetrics};
pub use geometry::{included_angle, Point2D};
pub use landmarks::{resolve, LandmarkFrame, LandmarkPoint};
pub use session::{
    Clock, FixedStepClock, FramePoll, LandmarkSource, SessionDriver, SessionOptions,
    SessionOutcome, SessionReport, StopToken, SystemClock,
};
pub use tracker::{ExerciseTracker, SessionState, Stage};
