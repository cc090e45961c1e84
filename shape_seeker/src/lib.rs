// THEORY:
// This file is the entry point for the `shape_seeker` library crate. It exposes the
// detection engine as a small set of values and traits:
//
// - `DetectionSession` classifies every boundary of one frame against a query and
//   returns a `FrameReport`.
// - `InteractiveController` drives sessions from a live frame source while a second
//   thread reads operator commands.
// - `run_batch` replays a batch file, one frame per line.
//
// Frame capture, contour tracing and display are collaborators behind the
// `FrameSource`, `ContourExtractor` and `FrameSink` traits, so the engine itself
// depends on no camera or GUI library. The geometry and classifier internals live in
// `core_modules`.

pub mod batch;
pub mod config;
pub mod controller;
pub mod core_modules;
pub mod error;
pub mod session;

// Re-export key data structures for the public API.
pub use crate::batch::{parse_batch, read_batch_file, run_batch, BatchEntry, BatchSummary};
pub use crate::config::{BatchSettings, CaptureSettings, PreprocessSettings, SeekerConfig};
pub use crate::controller::{
    ContourExtractor, ControlState, DetectionState, ExitReason, FrameSink, FrameSource,
    FrameView, InteractiveController, RunSummary, SinkSignal,
};
pub use crate::core_modules::color_sampler::{Hsv, PixelSource};
pub use crate::core_modules::geometry::{Boundary, Circle, Point, Rect};
pub use crate::core_modules::shape_classifier::shape_classifier::ShapeMatch;
pub use crate::core_modules::shape_record::ShapeRecord;
pub use crate::core_modules::vocabulary::{ColorKind, Command, Query, ShapeKind};
pub use crate::error::{Result, SeekerError};
pub use crate::session::{not_found_label, DetectionSession, FrameReport, Report};

/// Banner shown on frames while no search is active.
pub const INACTIVE_BANNER: &str = "Detection is not active";
