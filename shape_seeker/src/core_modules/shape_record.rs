// THEORY:
// A `ShapeRecord` is the per-boundary result of one detection pass. Records are
// rebuilt from scratch every frame and are never shared across frames, so they are
// plain owned data with no identity.
//
// A record starts out fully Unknown at the frame's begin instant. Only a boundary
// that passes the requested shape test gets a shape, a position, a sampled color
// and an end instant. The gap between the two instants is what the annotation
// reports as "Time".

use crate::core_modules::geometry::{Circle, Point};
use crate::core_modules::vocabulary::{color_label, shape_label, ColorKind, ShapeKind};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    /// `None` until the boundary passes the requested shape test.
    pub shape: Option<ShapeKind>,
    /// `None` when unsampled, degenerate, or outside every color bucket.
    pub color: Option<ColorKind>,
    pub position: Point,
    pub clock_begin: Instant,
    /// Equal to `clock_begin` until classification of this boundary completes.
    pub clock_end: Instant,
    /// Requested shape and requested color both matched.
    pub matched: bool,
    pub enclosing_circle: Option<Circle>,
}

impl ShapeRecord {
    pub fn new(clock_begin: Instant) -> Self {
        Self {
            shape: None,
            color: None,
            position: Point::default(),
            clock_begin,
            clock_end: clock_begin,
            matched: false,
            enclosing_circle: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock_end.saturating_duration_since(self.clock_begin)
    }

    /// `"<Shape> - <color> - Pos: (x, y) - Time: <seconds> s"`.
    pub fn label(&self) -> String {
        format!(
            "{} - {} - Pos: ({}, {}) - Time: {:.6} s",
            shape_label(self.shape),
            color_label(self.color),
            self.position.x,
            self.position.y,
            self.elapsed().as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_unknown_with_zero_duration() {
        let begin = Instant::now();
        let record = ShapeRecord::new(begin);
        assert_eq!(record.shape, None);
        assert_eq!(record.color, None);
        assert_eq!(record.position, Point::new(0, 0));
        assert_eq!(record.clock_end, begin);
        assert!(!record.matched);
        assert_eq!(record.label(), "Unknown - Unknown - Pos: (0, 0) - Time: 0.000000 s");
    }

    #[test]
    fn label_uses_display_names_and_microsecond_precision() {
        let begin = Instant::now();
        let mut record = ShapeRecord::new(begin);
        record.shape = Some(ShapeKind::HalfCircle);
        record.color = Some(ColorKind::Pink);
        record.position = Point::new(120, 45);
        record.clock_end = begin + Duration::from_micros(1_250);
        assert_eq!(
            record.label(),
            "Halve Cirkel - roze - Pos: (120, 45) - Time: 0.001250 s"
        );
    }
}
