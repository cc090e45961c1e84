// THEORY:
// The `session` module is the per-frame top of the engine. One call to
// `DetectionSession::run` is one detection pass: every boundary the contour tracer
// found in the frame gets a `ShapeRecord`, only the test for the requested shape is
// run, and only accepted boundaries are color-sampled.
//
// Key principles:
// 1.  **One clock per frame**: Every record of a pass shares the frame's begin
//     instant. The controller takes that instant as soon as the frame arrives, so
//     the reported time covers preprocessing and contour extraction but not the
//     wait for the camera.
// 2.  **Only the requested test**: Running all five tests and then filtering would
//     give the same answer most of the time, but the tests overlap (a 120x100 box is
//     both a Square and a Rectangle). Asking one question per boundary makes the
//     answer independent of the evaluation order.
// 3.  **Pure**: A pass reads the image and the boundaries and returns a report.
//     The same input always yields the same shapes, colors, positions and flags;
//     only the timestamps differ between runs.

use crate::core_modules::color_classifier::color_classifier;
use crate::core_modules::color_sampler::{self, PixelSource};
use crate::core_modules::geometry::Boundary;
use crate::core_modules::shape_classifier::shape_classifier;
use crate::core_modules::shape_record::ShapeRecord;
use crate::core_modules::vocabulary::Query;
use crate::error::{Result, SeekerError};
use log::debug;
use std::time::{Duration, Instant};

/// The outcome of one detection pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Nothing matched; `elapsed` runs from the frame's begin instant.
    NotFound { elapsed: Duration },
    /// Indices into `FrameReport::records` of the matching boundaries.
    Found { matches: Vec<usize> },
}

/// Every record of a pass plus the summary the front-end acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub records: Vec<ShapeRecord>,
    pub report: Report,
}

impl FrameReport {
    pub fn matches(&self) -> impl Iterator<Item = &ShapeRecord> {
        self.records.iter().filter(|record| record.matched)
    }

    pub fn is_found(&self) -> bool {
        matches!(self.report, Report::Found { .. })
    }

    /// Checks that `records[i]` can be drawn on `boundaries[i]`. Views handed to a
    /// display are built by callers, so the two lists may have drifted apart.
    pub fn check_pairing(&self, boundaries: &[Boundary]) -> Result<()> {
        if self.records.len() != boundaries.len() {
            return Err(SeekerError::RecordCountMismatch {
                records: self.records.len(),
                boundaries: boundaries.len(),
            });
        }
        Ok(())
    }
}

/// `"No <shape> with color <color> found - Time: <seconds> s"`.
pub fn not_found_label(query: Query, elapsed: Duration) -> String {
    format!(
        "No {} with color {} found - Time: {:.6} s",
        query.shape.name(),
        query.color.name(),
        elapsed.as_secs_f64()
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSession;

impl DetectionSession {
    pub fn new() -> Self {
        Self
    }

    /// Runs one pass with a begin instant taken now.
    pub fn run<I: PixelSource + ?Sized>(
        &self,
        image: &I,
        boundaries: &[Boundary],
        query: Query,
    ) -> FrameReport {
        self.run_from(Instant::now(), image, boundaries, query)
    }

    /// Runs one pass whose records all start at `begin`.
    pub fn run_from<I: PixelSource + ?Sized>(
        &self,
        begin: Instant,
        image: &I,
        boundaries: &[Boundary],
        query: Query,
    ) -> FrameReport {
        // --- 1. One Unknown record per boundary ---
        let mut records: Vec<ShapeRecord> =
            boundaries.iter().map(|_| ShapeRecord::new(begin)).collect();

        // --- 2. Requested shape test, then color for accepted boundaries ---
        for (record, boundary) in records.iter_mut().zip(boundaries) {
            let Some(found) = shape_classifier::detect(query.shape, boundary) else {
                continue;
            };

            record.shape = Some(found.kind);
            record.position = found.position;
            record.enclosing_circle = found.enclosing_circle;
            record.color = match color_sampler::sample(image, boundary) {
                Ok(hsv) => color_classifier::classify(hsv.hue, hsv.saturation),
                Err(err) => {
                    debug!("{} at {:?}: color left unknown", err, found.position);
                    None
                }
            };
            record.clock_end = Instant::now();
            record.matched = record.color == Some(query.color);
        }

        // --- 3. Summary ---
        let matches: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.matched)
            .map(|(index, _)| index)
            .collect();

        let report = if matches.is_empty() {
            Report::NotFound {
                elapsed: begin.elapsed(),
            }
        } else {
            Report::Found { matches }
        };

        FrameReport { records, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::Point;
    use crate::core_modules::vocabulary::{ColorKind, ShapeKind};
    use image::{Rgb, RgbImage};

    const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
    const PINK: Rgb<u8> = Rgb([200, 0, 200]);

    fn frame_with(fills: &[(i32, i32, i32, Rgb<u8>)]) -> RgbImage {
        let mut image = RgbImage::from_pixel(200, 200, Rgb([0, 0, 0]));
        for &(x, y, side, color) in fills {
            for py in y..y + side {
                for px in x..x + side {
                    image.put_pixel(px as u32, py as u32, color);
                }
            }
        }
        image
    }

    fn square(x: i32, y: i32, side: i32) -> Boundary {
        Boundary::from(vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)])
    }

    #[test]
    fn green_square_matches_green_square_query() {
        let image = frame_with(&[(20, 20, 60, GREEN)]);
        let boundaries = vec![square(20, 20, 60)];
        let query = Query::new(ShapeKind::Square, ColorKind::Green);

        let result = DetectionSession::new().run(&image, &boundaries, query);

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.shape, Some(ShapeKind::Square));
        assert_eq!(record.color, Some(ColorKind::Green));
        assert_eq!(record.position, Point::new(50, 50));
        assert!(record.matched);
        assert!(record.clock_end >= record.clock_begin);
        assert_eq!(result.report, Report::Found { matches: vec![0] });
    }

    #[test]
    fn wrong_color_is_recorded_but_not_matched() {
        let image = frame_with(&[(20, 20, 60, PINK)]);
        let boundaries = vec![square(20, 20, 60)];
        let query = Query::new(ShapeKind::Square, ColorKind::Green);

        let result = DetectionSession::new().run(&image, &boundaries, query);

        assert_eq!(result.records[0].shape, Some(ShapeKind::Square));
        assert_eq!(result.records[0].color, Some(ColorKind::Pink));
        assert!(!result.records[0].matched);
        assert!(matches!(result.report, Report::NotFound { .. }));
    }

    #[test]
    fn other_shapes_stay_unknown() {
        let image = frame_with(&[(20, 20, 60, GREEN)]);
        let boundaries = vec![square(20, 20, 60)];
        let query = Query::new(ShapeKind::Triangle, ColorKind::Green);

        let result = DetectionSession::new().run(&image, &boundaries, query);

        let record = &result.records[0];
        assert_eq!(record.shape, None);
        assert_eq!(record.color, None);
        assert_eq!(record.clock_end, record.clock_begin);
        assert!(!result.is_found());
    }

    #[test]
    fn one_record_per_boundary_and_only_matches_are_reported() {
        let image = frame_with(&[(10, 10, 50, GREEN), (120, 120, 50, PINK)]);
        let boundaries = vec![
            square(10, 10, 50),
            Boundary::from(vec![(0, 0), (3, 0), (0, 3)]),
            square(120, 120, 50),
        ];
        let query = Query::new(ShapeKind::Square, ColorKind::Pink);

        let result = DetectionSession::new().run(&image, &boundaries, query);

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.report, Report::Found { matches: vec![2] });
        assert_eq!(result.matches().count(), 1);
        assert_eq!(result.records[1].shape, None);
    }

    #[test]
    fn empty_frame_is_not_found() {
        let image = RgbImage::new(10, 10);
        let query = Query::new(ShapeKind::Circle, ColorKind::Yellow);
        let result = DetectionSession::new().run(&image, &[], query);
        assert!(result.records.is_empty());
        assert!(matches!(result.report, Report::NotFound { .. }));
    }

    #[test]
    fn repeated_runs_agree_apart_from_timing() {
        let image = frame_with(&[(20, 20, 60, GREEN), (110, 30, 40, PINK)]);
        let boundaries = vec![square(20, 20, 60), square(110, 30, 40)];
        let query = Query::new(ShapeKind::Square, ColorKind::Green);
        let session = DetectionSession::new();

        let first = session.run(&image, &boundaries, query);
        let second = session.run(&image, &boundaries, query);

        let strip = |report: &FrameReport| {
            report
                .records
                .iter()
                .map(|r| (r.shape, r.color, r.position, r.matched))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&first), strip(&second));
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn pairing_check_flags_drifted_boundaries() {
        let image = frame_with(&[(20, 20, 60, GREEN)]);
        let boundaries = vec![square(20, 20, 60), square(120, 120, 40)];
        let query = Query::new(ShapeKind::Square, ColorKind::Green);

        let result = DetectionSession::new().run(&image, &boundaries, query);
        assert!(result.check_pairing(&boundaries).is_ok());

        match result.check_pairing(&boundaries[..1]) {
            Err(SeekerError::RecordCountMismatch { records, boundaries }) => {
                assert_eq!((records, boundaries), (2, 1));
            }
            other => panic!("expected a count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn not_found_label_uses_vocabulary_names() {
        let query = Query::new(ShapeKind::HalfCircle, ColorKind::Orange);
        assert_eq!(
            not_found_label(query, Duration::from_millis(20)),
            "No halve cirkel with color oranje found - Time: 0.020000 s"
        );
    }
}
