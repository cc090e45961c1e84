// THEORY:
// The `ShapeClassifier` turns one boundary into a shape category using nothing but
// the polygon it approximates to and a few ratios measured on it.
//
// Algorithm steps:
// 1.  **Simplify**: The boundary is reduced with Douglas-Peucker at a tolerance of 2%
//     of its closed arc length. Straight-edged shapes collapse onto their corners;
//     curved ones keep a handful of vertices along the arc.
// 2.  **Pre-filter**: Regions smaller than 100 square pixels are noise. A simplified
//     polygon that is not convex is clutter, not one of our shapes. Both are
//     rejected before any specific test runs.
// 3.  **Per-shape tests**: Each category has its own acceptance test on the
//     simplified polygon (vertex count, side ratio, aspect ratio) or on the unsimplified
//     boundary (circularity). The tests are independent and several may accept the
//     same boundary.
// 4.  **Last write wins**: `classify` runs every test in the fixed order
//     Triangle, Square, Rectangle, Circle, HalfCircle and keeps the result of the
//     last one that accepts. A 120x100 box passes both Square and Rectangle and ends
//     up a Rectangle. The order is the tie-break policy.
//
// The detection session only ever runs the single test for the requested shape;
// `classify` exists for callers that want to know what a boundary is.

use crate::core_modules::geometry::{
    approx_poly_dp, arc_length, bounding_rect, is_convex, Boundary, Circle, Point, Rect,
};
use crate::core_modules::vocabulary::ShapeKind;

pub mod shape_classifier {
    use super::*;
    use std::f64::consts::PI;

    /// Regions enclosing less than this many square pixels are never classified.
    pub const MIN_AREA: f64 = 100.0;
    /// Douglas-Peucker tolerance as a fraction of the closed arc length.
    pub const APPROX_TOLERANCE: f64 = 0.02;

    pub const SQUARE_SIDE_RATIO: (f32, f32) = (0.7, 1.3);
    pub const RECTANGLE_MIN_ELONGATION: f64 = 1.1;
    pub const RECTANGLE_MAX_ELONGATION: f64 = 0.9;
    pub const CIRCLE_MIN_CIRCULARITY: f64 = 0.8;
    pub const CIRCLE_MAX_ASPECT_DEVIATION: f64 = 0.2;

    /// An accepted shape test.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ShapeMatch {
        pub kind: ShapeKind,
        /// Where the annotation goes: the enclosing circle's center for circles, the
        /// center of the simplified polygon's bounding box otherwise.
        pub position: Point,
        /// Only set for circles.
        pub enclosing_circle: Option<Circle>,
    }

    /// A boundary that survived the shared pre-filter, with its simplified polygon.
    struct Candidate<'a> {
        boundary: &'a Boundary,
        approx: Vec<Point>,
        approx_rect: Rect,
    }

    impl<'a> Candidate<'a> {
        fn prepare(boundary: &'a Boundary) -> Option<Self> {
            let points = boundary.points();
            let epsilon = APPROX_TOLERANCE * arc_length(points, true);
            let approx = approx_poly_dp(points, epsilon, true);

            if boundary.area().abs() < MIN_AREA || !is_convex(&approx) {
                return None;
            }

            let approx_rect = bounding_rect(&approx);
            Some(Self {
                boundary,
                approx,
                approx_rect,
            })
        }

        fn vertices(&self) -> usize {
            self.approx.len()
        }

        fn accept(&self, kind: ShapeKind) -> ShapeMatch {
            ShapeMatch {
                kind,
                position: self.approx_rect.center(),
                enclosing_circle: None,
            }
        }

        fn circularity(&self) -> f64 {
            let perimeter = self.boundary.perimeter();
            if perimeter == 0.0 {
                return 0.0;
            }
            4.0 * PI * self.boundary.area() / (perimeter * perimeter)
        }

        fn looks_circular(&self) -> bool {
            let aspect = self.approx_rect.aspect_ratio();
            self.circularity() > CIRCLE_MIN_CIRCULARITY
                && (aspect - 1.0).abs() < CIRCLE_MAX_ASPECT_DEVIATION
        }
    }

    fn triangle(candidate: &Candidate) -> Option<ShapeMatch> {
        (candidate.vertices() == 3).then(|| candidate.accept(ShapeKind::Triangle))
    }

    fn square(candidate: &Candidate) -> Option<ShapeMatch> {
        if candidate.vertices() != 4 {
            return None;
        }

        let approx = &candidate.approx;
        let sides: Vec<f32> = (0..approx.len())
            .map(|i| approx[i].distance(&approx[(i + 1) % approx.len()]) as f32)
            .collect();
        let longest = sides.iter().copied().fold(f32::MIN, f32::max);
        let shortest = sides.iter().copied().fold(f32::MAX, f32::min);
        let ratio = longest / shortest;

        let (low, high) = SQUARE_SIDE_RATIO;
        (ratio >= low && ratio <= high).then(|| candidate.accept(ShapeKind::Square))
    }

    fn rectangle(candidate: &Candidate) -> Option<ShapeMatch> {
        let aspect = candidate.approx_rect.aspect_ratio();
        let elongation = aspect.max(1.0 / aspect);

        // `elongation` is never below 1, so only four-cornered polygons get through.
        let accepted = (candidate.vertices() == 4 && elongation > RECTANGLE_MIN_ELONGATION)
            || elongation < RECTANGLE_MAX_ELONGATION;
        accepted.then(|| candidate.accept(ShapeKind::Rectangle))
    }

    fn circle(candidate: &Candidate) -> Option<ShapeMatch> {
        if !candidate.looks_circular() {
            return None;
        }

        let enclosing = candidate.boundary.min_enclosing_circle();
        Some(ShapeMatch {
            kind: ShapeKind::Circle,
            position: enclosing.center_point(),
            enclosing_circle: Some(enclosing),
        })
    }

    fn half_circle(candidate: &Candidate) -> Option<ShapeMatch> {
        if candidate.looks_circular() {
            return None;
        }
        (candidate.vertices() > 4).then(|| candidate.accept(ShapeKind::HalfCircle))
    }

    fn run_test(kind: ShapeKind, candidate: &Candidate) -> Option<ShapeMatch> {
        match kind {
            ShapeKind::Triangle => triangle(candidate),
            ShapeKind::Square => square(candidate),
            ShapeKind::Rectangle => rectangle(candidate),
            ShapeKind::Circle => circle(candidate),
            ShapeKind::HalfCircle => half_circle(candidate),
        }
    }

    /// Runs the single test for `kind`.
    pub fn detect(kind: ShapeKind, boundary: &Boundary) -> Option<ShapeMatch> {
        let candidate = Candidate::prepare(boundary)?;
        run_test(kind, &candidate)
    }

    pub fn is_triangle(boundary: &Boundary) -> Option<ShapeMatch> {
        detect(ShapeKind::Triangle, boundary)
    }

    pub fn is_square(boundary: &Boundary) -> Option<ShapeMatch> {
        detect(ShapeKind::Square, boundary)
    }

    pub fn is_rectangle(boundary: &Boundary) -> Option<ShapeMatch> {
        detect(ShapeKind::Rectangle, boundary)
    }

    pub fn is_circle(boundary: &Boundary) -> Option<ShapeMatch> {
        detect(ShapeKind::Circle, boundary)
    }

    pub fn is_half_circle(boundary: &Boundary) -> Option<ShapeMatch> {
        detect(ShapeKind::HalfCircle, boundary)
    }

    /// Runs every test in detection order; the last one that accepts decides.
    pub fn classify(boundary: &Boundary) -> Option<ShapeMatch> {
        let candidate = Candidate::prepare(boundary)?;
        ShapeKind::ALL
            .into_iter()
            .filter_map(|kind| run_test(kind, &candidate))
            .last()
    }
}
