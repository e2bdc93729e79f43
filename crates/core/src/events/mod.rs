//! Classified session events and the sinks that consume them.
//!
//! Events are the external face of the tracker: an ordered stream of
//! tagged records, serializable one JSON object per line so that a
//! supervising process can consume them over a pipe.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Final counters reported by terminal events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub reps: u32,
    pub hold_seconds: f64,
    pub cycles: u32,
}

/// One classified event, tagged with its kind on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Emitted once before the first frame is processed.
    SessionStarted {
        exercise: String,
        session_id: Option<String>,
        duration: f64,
    },
    /// A full down→up transition was recognised.
    RepCompleted {
        exercise: String,
        session_id: Option<String>,
        count: u32,
        angle: f32,
    },
    /// The pose stayed inside the tolerance band long enough to count as
    /// held. Fires once per continuous hold.
    HoldAchieved {
        exercise: String,
        session_id: Option<String>,
        hold_elapsed: f64,
    },
    /// The tracked angle left the tolerance band while a hold was in
    /// progress.
    HoldBroken {
        exercise: String,
        session_id: Option<String>,
        duration: f64,
    },
    /// A duration-only activity crossed into its next cycle.
    CycleAdvanced {
        exercise: String,
        session_id: Option<String>,
        cycle_count: u32,
    },
    /// The session ran to its configured duration.
    SessionComplete {
        exercise: String,
        session_id: Option<String>,
        total_time: f64,
        metrics: SessionMetrics,
    },
    /// The session was cancelled cooperatively before completing.
    SessionStopped {
        exercise: String,
        session_id: Option<String>,
        total_time: f64,
        metrics: SessionMetrics,
    },
    /// The landmark detector failed; the session ends early.
    DetectorFailed {
        exercise: String,
        session_id: Option<String>,
        message: String,
    },
}

impl SessionEvent {
    /// Whether this event ends its session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionComplete { .. }
                | SessionEvent::SessionStopped { .. }
                | SessionEvent::DetectorFailed { .. }
        )
    }
}

/// Receives the ordered event stream of one or more sessions.
pub trait EventSink {
    fn emit(&mut self, event: &SessionEvent) -> Result<()>;
}

/// Writes events as line-delimited JSON, flushing after every record so a
/// consuming process sees them as they happen.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &SessionEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects events in memory; the test and embedding counterpart of
/// [`JsonLinesSink`].
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<SessionEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SessionEvent> {
        self.events
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, event: &SessionEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}
