use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mindflow_core::{
    Catalog, Clock, FixedStepClock, FramePoll, JsonLinesSink, LandmarkFrame, LandmarkSource,
    MindFlowError, SessionDriver, SessionOptions, SystemClock, TrackerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> mindflow_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => run_list(),
        Commands::Run {
            exercise,
            session_id,
            duration,
            input,
            fps,
            realtime,
        } => {
            let options = SessionOptions {
                session_id,
                duration: duration.map(Duration::from_secs),
            };
            let clock: Box<dyn Clock> = if realtime {
                Box::new(SystemClock::start())
            } else {
                Box::new(FixedStepClock::from_fps(fps))
            };
            run_session(&exercise, options, input.as_deref(), clock)
        }
    }
}

fn run_list() -> mindflow_core::Result<()> {
    let catalog = Catalog::builtin();
    println!("Available exercises:");
    for definition in catalog.definitions() {
        println!("- {}: {}", definition.id, definition.kind.label());
    }
    Ok(())
}

fn run_session(
    exercise: &str,
    options: SessionOptions,
    input: Option<&std::path::Path>,
    clock: Box<dyn Clock>,
) -> mindflow_core::Result<()> {
    let catalog = Catalog::builtin();
    // Unknown ids and bad configuration fail here, before any session
    // output is produced.
    let driver = SessionDriver::new(&catalog, exercise, options, TrackerConfig::default(), clock)?;

    tracing::info!(exercise, "starting session");

    let mut source = open_source(input)?;
    let mut sink = JsonLinesSink::new(io::stdout());
    let report = driver.run(source.as_mut(), &mut sink)?;

    tracing::info!(
        outcome = ?report.outcome,
        reps = report.metrics.reps,
        cycles = report.metrics.cycles,
        frames = report.frames_processed,
        skipped = report.frames_skipped,
        "session ended"
    );
    Ok(())
}

fn open_source(input: Option<&std::path::Path>) -> mindflow_core::Result<Box<dyn LandmarkSource>> {
    let source: Box<dyn LandmarkSource> = match input {
        Some(path) if path.as_os_str() != "-" => {
            tracing::info!(?path, "replaying landmark frames");
            Box::new(JsonLinesSource::new(BufReader::new(File::open(path)?)))
        }
        _ => Box::new(JsonLinesSource::new(io::stdin().lock())),
    };
    Ok(source)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Reads landmark frames as line-delimited JSON, one frame object per
/// line, standing in for the camera and detector pipeline.
struct JsonLinesSource<R: BufRead> {
    reader: R,
    line: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> mindflow_core::Result<FramePoll> {
        self.line.clear();
        let read = self
            .reader
            .read_line(&mut self.line)
            .map_err(|err| MindFlowError::Detector(err.to_string()))?;
        if read == 0 {
            return Ok(FramePoll::End);
        }
        let record = self.line.trim();
        if record.is_empty() {
            return Ok(FramePoll::NoFrame);
        }
        let frame: LandmarkFrame = serde_json::from_str(record)
            .map_err(|err| MindFlowError::Detector(format!("malformed landmark record: {err}")))?;
        if frame.is_empty() {
            return Ok(FramePoll::NoFrame);
        }
        Ok(FramePoll::Frame(frame))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "MindFlow exercise tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available exercises.
    List,
    /// Run a tracking session for one exercise.
    Run {
        /// Exercise identifier from the catalog.
        exercise: String,
        /// External identifier echoed into every event record.
        #[arg(short, long)]
        session_id: Option<String>,
        /// Session length in seconds; defaults to the exercise's own.
        #[arg(short, long)]
        duration: Option<u64>,
        /// Landmark frames as JSON lines; `-` or omitted reads stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Nominal frame rate used to pace replayed input.
        #[arg(long, default_value_t = 30)]
        fps: u32,
        /// Pace the session by wall clock instead of the frame rate.
        #[arg(long)]
        realtime: bool,
    },
}
