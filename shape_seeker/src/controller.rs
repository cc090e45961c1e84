// THEORY:
// The `controller` ties the engine to a live camera and a human at a keyboard. It
// runs two lines of execution that share nothing but a small atomic state:
//
// 1.  **Capture line** (the caller's thread): grab a frame, and if a search is
//     active, extract boundaries and run a `DetectionSession` on them, then hand the
//     frame and its result to the display. It never blocks on the operator.
// 2.  **Command line** (a dedicated thread): block on the next line of operator
//     input, parse it, and flip the shared state. It never touches frames.
//
// The state is (Idle | Active) x (Running | Stopped) plus the current query. The
// query and the Active flag live together in one 16-bit atomic word, so the capture
// line can never observe a new shape paired with an old color. Running is a
// separate flag that either line may clear.
//
// Shutdown: whichever line clears Running, the other notices at its next check.
// The capture line waits for the command line to finish, so both lines have seen
// Running = false, and only then releases the frame source and the display,
// exactly once. A command line parked in a blocking read notices only after its
// next line of input (or end of input) arrives.

use crate::core_modules::color_sampler::PixelSource;
use crate::core_modules::geometry::Boundary;
use crate::core_modules::vocabulary::{ColorKind, Command, Query, ShapeKind};
use crate::error::Result;
use crate::session::{DetectionSession, FrameReport};
use log::{debug, error, info, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::thread;
use std::time::Instant;

/// Delivers frames to the capture line.
pub trait FrameSource {
    type Frame: PixelSource;

    /// The next frame. An error means the stream is over.
    fn next_frame(&mut self) -> Result<Self::Frame>;

    /// Gives the device back. Called exactly once, after the last frame.
    fn release(&mut self) {}
}

/// Traces region outlines in a frame.
pub trait ContourExtractor<F> {
    fn extract(&mut self, frame: &F) -> Result<Vec<Boundary>>;
}

/// What the display should draw on a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameView {
    /// No search is active.
    Inactive,
    /// `report.records[i]` describes `boundaries[i]`.
    Searched {
        query: Query,
        boundaries: Vec<Boundary>,
        report: FrameReport,
    },
}

/// Whether the display wants more frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkSignal {
    Continue,
    Stop,
}

/// Annotates and shows frames.
pub trait FrameSink<F> {
    fn present(&mut self, frame: &mut F, view: &FrameView) -> Result<SinkSignal>;

    /// Closes the display. Called exactly once.
    fn release(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    Active,
}

// Layout of the search word: bit 15 = Active, bits 8..15 = color index + 1,
// bits 0..8 = shape index + 1. Zero in a field means "never selected".
const ACTIVE_BIT: u16 = 1 << 15;
const SHAPE_MASK: u16 = 0x00FF;
const COLOR_SHIFT: u16 = 8;
const COLOR_MASK: u16 = 0x7F00;

fn pack_query(query: Query) -> u16 {
    (query.shape.index() + 1) | ((query.color.index() + 1) << COLOR_SHIFT)
}

fn unpack_query(word: u16) -> Option<Query> {
    let shape = (word & SHAPE_MASK).checked_sub(1)?;
    let color = ((word & COLOR_MASK) >> COLOR_SHIFT).checked_sub(1)?;
    Some(Query::new(
        ShapeKind::from_index(shape)?,
        ColorKind::from_index(color)?,
    ))
}

/// The state shared by the capture line and the command line.
#[derive(Debug)]
pub struct ControlState {
    running: AtomicBool,
    search: AtomicU16,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlState {
    /// Idle and Running, with no query selected yet.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            search: AtomicU16::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn request_exit(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Replaces the query and activates detection in one store.
    pub fn select(&self, query: Query) {
        self.search
            .store(ACTIVE_BIT | pack_query(query), Ordering::Release);
    }

    /// Deactivates detection and keeps the last query.
    pub fn stop_detection(&self) {
        self.search.fetch_and(!ACTIVE_BIT, Ordering::AcqRel);
    }

    /// The detection state and the current query, read together.
    pub fn snapshot(&self) -> (DetectionState, Option<Query>) {
        let word = self.search.load(Ordering::Acquire);
        let state = if word & ACTIVE_BIT != 0 {
            DetectionState::Active
        } else {
            DetectionState::Idle
        };
        (state, unpack_query(word))
    }

    /// The query to search for this frame, if detection is active.
    pub fn active_query(&self) -> Option<Query> {
        match self.snapshot() {
            (DetectionState::Active, query) => query,
            (DetectionState::Idle, _) => None,
        }
    }

    pub fn apply(&self, command: Command) {
        match command {
            Command::Exit => {
                info!("exit requested");
                self.request_exit();
            }
            Command::Stop => {
                info!("detection stopped");
                self.stop_detection();
            }
            Command::Search(query) => {
                info!("searching for {}", query);
                self.select(query);
            }
        }
    }
}

/// Why the capture line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `exit` was typed or the command input ended.
    Command,
    DisplayClosed,
    AcquisitionFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    /// Frames on which a detection pass ran.
    pub searched_frames: u64,
    pub exit: ExitReason,
}

/// Reads operator commands until `exit`, end of input, or a stop from elsewhere.
pub fn command_loop<R: BufRead>(state: &ControlState, mut input: R) {
    let mut line = String::new();
    while state.is_running() {
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                info!("command input closed");
                state.request_exit();
                break;
            }
            Ok(_) => {}
            Err(err) => {
                error!("reading command input failed: {}", err);
                state.request_exit();
                break;
            }
        }

        if !state.is_running() {
            break;
        }

        match line.parse::<Command>() {
            Ok(command) => state.apply(command),
            Err(err) => warn!("ignored command {:?}: {}", line.trim(), err),
        }
    }
    debug!("command line finished");
}

pub struct InteractiveController<S, E, K> {
    source: S,
    extractor: E,
    sink: K,
    session: DetectionSession,
    state: Arc<ControlState>,
}

impl<S, E, K> InteractiveController<S, E, K>
where
    S: FrameSource,
    E: ContourExtractor<S::Frame>,
    K: FrameSink<S::Frame>,
{
    pub fn new(source: S, extractor: E, sink: K) -> Self {
        Self::with_state(source, extractor, sink, Arc::new(ControlState::new()))
    }

    /// Builds a controller around an existing shared state.
    pub fn with_state(source: S, extractor: E, sink: K, state: Arc<ControlState>) -> Self {
        Self {
            source,
            extractor,
            sink,
            session: DetectionSession::new(),
            state,
        }
    }

    pub fn state(&self) -> Arc<ControlState> {
        Arc::clone(&self.state)
    }

    /// Runs both lines until one of them stops, waits for the command line, then
    /// releases the source and the display.
    pub fn run<R>(mut self, commands: R) -> Result<RunSummary>
    where
        R: BufRead + Send + 'static,
    {
        let command_state = Arc::clone(&self.state);
        let command_line = thread::Builder::new()
            .name("seeker-commands".to_string())
            .spawn(move || command_loop(&command_state, commands))?;

        let summary = self.capture_loop();

        if !command_line.is_finished() {
            info!("waiting for the command reader to finish (press Enter)");
        }
        if command_line.join().is_err() {
            error!("command line panicked");
        }

        self.source.release();
        self.sink.release();

        info!(
            "capture line finished after {} frames ({} searched): {:?}",
            summary.frames, summary.searched_frames, summary.exit
        );
        Ok(summary)
    }

    fn capture_loop(&mut self) -> RunSummary {
        let mut frames = 0u64;
        let mut searched_frames = 0u64;
        let mut exit = ExitReason::Command;

        while self.state.is_running() {
            // --- 1. Acquire ---
            let mut frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    error!("{}", err);
                    exit = ExitReason::AcquisitionFailure;
                    self.state.request_exit();
                    break;
                }
            };
            let begin = Instant::now();
            frames += 1;

            // --- 2. Detect, if a search is active ---
            let view = match self.state.active_query() {
                Some(query) => {
                    searched_frames += 1;
                    let boundaries = self.extractor.extract(&frame).unwrap_or_else(|err| {
                        warn!("contour extraction failed: {}", err);
                        Vec::new()
                    });
                    let report = self.session.run_from(begin, &frame, &boundaries, query);
                    FrameView::Searched {
                        query,
                        boundaries,
                        report,
                    }
                }
                None => FrameView::Inactive,
            };

            // --- 3. Present ---
            match self.sink.present(&mut frame, &view) {
                Ok(SinkSignal::Continue) => {}
                Ok(SinkSignal::Stop) => {
                    info!("display closed");
                    exit = ExitReason::DisplayClosed;
                    self.state.request_exit();
                    break;
                }
                Err(err) => {
                    error!("{}", err);
                    exit = ExitReason::DisplayClosed;
                    self.state.request_exit();
                    break;
                }
            }
        }

        RunSummary {
            frames,
            searched_frames,
            exit,
        }
    }
}
