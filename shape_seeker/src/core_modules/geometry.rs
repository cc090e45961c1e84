// THEORY:
// The `geometry` module is the foundation every classifier stands on. It holds the
// "dumb" point and boundary containers and the handful of contour measurements the
// shape and color heuristics are defined in terms of.
//
// Key principles:
// 1.  **Acceptance contract**: The shape thresholds (2% tolerance, 100 area units,
//     circularity 0.8, ...) only mean something relative to the exact way area,
//     perimeter, polygon approximation and bounding boxes are computed. Each
//     function here reproduces the conventions of the classic OpenCV contour
//     routines (integer bounding boxes that include both end pixels, single
//     precision segment lengths, Douglas-Peucker with a farthest-pair seed and a
//     collinear clean-up pass) so the thresholds keep their calibrated meaning.
// 2.  **Read-only input**: A `Boundary` is produced by an external contour tracer
//     once per frame and is never modified here. Every measurement borrows it.
// 3.  **No failure modes**: Degenerate input (empty, one point, zero area) yields
//     zero-valued measurements, never a panic. Callers decide what a zero means.

/// A pixel coordinate on the image grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// An upright rectangle in pixel units. `width` and `height` count pixels, so a
/// single point has a 1x1 bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// The center in integer arithmetic: `(x + width / 2, y + height / 2)`.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// `width / height`. Infinite or NaN for an empty rectangle.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// A circle with a sub-pixel center, as produced by `min_enclosing_circle`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Circle {
    pub center: (f32, f32),
    pub radius: f32,
}

impl Circle {
    /// The center truncated to the pixel grid.
    pub fn center_point(&self) -> Point {
        Point::new(self.center.0 as i32, self.center.1 as i32)
    }
}

/// The spatial moments of a closed contour up to first order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    /// The enclosed area.
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// The area-weighted center of the enclosed region, truncated toward zero.
    /// `None` when the contour encloses no area.
    pub fn centroid(&self) -> Option<Point> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point::new(
            (self.m10 / self.m00) as i32,
            (self.m01 / self.m00) as i32,
        ))
    }
}

/// An ordered, closed sequence of points outlining one connected region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Boundary {
    points: Vec<Point>,
}

impl Boundary {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The absolute enclosed area.
    pub fn area(&self) -> f64 {
        contour_area(&self.points)
    }

    /// The closed arc length.
    pub fn perimeter(&self) -> f64 {
        arc_length(&self.points, true)
    }

    pub fn moments(&self) -> Moments {
        moments(&self.points)
    }

    pub fn bounding_rect(&self) -> Rect {
        bounding_rect(&self.points)
    }

    pub fn min_enclosing_circle(&self) -> Circle {
        min_enclosing_circle(&self.points)
    }
}

impl From<Vec<Point>> for Boundary {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl From<Vec<(i32, i32)>> for Boundary {
    fn from(points: Vec<(i32, i32)>) -> Self {
        Self::new(points.into_iter().map(Point::from).collect())
    }
}

/// The absolute area enclosed by a polygon (shoelace formula).
pub fn contour_area(points: &[Point]) -> f64 {
    let Some(&last) = points.last() else {
        return 0.0;
    };

    let mut previous = last;
    let mut twice_area = 0.0;
    for &point in points {
        twice_area += previous.x as f64 * point.y as f64 - previous.y as f64 * point.x as f64;
        previous = point;
    }
    (twice_area * 0.5).abs()
}

/// The length of a polyline, including the closing segment when `closed`.
/// Each segment is measured in single precision and accumulated in double.
pub fn arc_length(points: &[Point], closed: bool) -> f64 {
    if points.len() <= 1 {
        return 0.0;
    }

    let last = if closed { points.len() - 1 } else { 0 };
    let mut previous = (points[last].x as f32, points[last].y as f32);
    let mut perimeter = 0.0f64;
    for point in points {
        let current = (point.x as f32, point.y as f32);
        let dx = current.0 - previous.0;
        let dy = current.1 - previous.1;
        perimeter += (dx * dx + dy * dy).sqrt() as f64;
        previous = current;
    }
    perimeter
}

/// The smallest upright rectangle containing every point. Both end pixels count,
/// so `width = max_x - min_x + 1`.
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in &points[1..] {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

/// First-order spatial moments of the region enclosed by a contour, computed with
/// Green's theorem over the polygon edges. The result is oriented so `m00 >= 0`.
pub fn moments(points: &[Point]) -> Moments {
    let Some(&last) = points.last() else {
        return Moments::default();
    };

    let mut a00 = 0.0f64;
    let mut a10 = 0.0f64;
    let mut a01 = 0.0f64;
    let (mut x_prev, mut y_prev) = (last.x as f64, last.y as f64);

    for point in points {
        let (x, y) = (point.x as f64, point.y as f64);
        let cross = x_prev * y - x * y_prev;
        a00 += cross;
        a10 += cross * (x_prev + x);
        a01 += cross * (y_prev + y);
        x_prev = x;
        y_prev = y;
    }

    if a00.abs() <= f32::EPSILON as f64 {
        return Moments::default();
    }

    let sign = if a00 > 0.0 { 1.0 } else { -1.0 };
    Moments {
        m00: sign * a00 * 0.5,
        m10: sign * a10 / 6.0,
        m01: sign * a01 / 6.0,
    }
}

/// Approximates a polyline with fewer vertices so that no dropped point lies
/// farther than `epsilon` from the result (Douglas-Peucker).
///
/// For closed curves the split is seeded with an approximately farthest pair of
/// points, found by three rounds of "farthest point from the current start". A
/// final pass drops vertices that sit on an almost straight, non-axis-aligned
/// run between their neighbours.
pub fn approx_poly_dp(points: &[Point], epsilon: f64, closed: bool) -> Vec<Point> {
    let count = points.len();
    if count == 0 {
        return Vec::new();
    }

    let next = |index: usize| if index + 1 >= count { 0 } else { index + 1 };
    let eps = epsilon * epsilon;

    // (start, end) index ranges still to be examined.
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut approx: Vec<Point> = Vec::with_capacity(count);
    let mut slice = (0usize, 0usize);
    let mut right_slice = (0usize, 0usize);
    let mut start_pt = Point::new(-1_000_000, -1_000_000);
    let mut pos = 0usize;
    let mut init_iters = 3;
    let mut is_closed = closed;
    let mut le_eps = false;

    if !is_closed {
        right_slice.0 = count;
        let end_pt = points[0];
        start_pt = points[count - 1];
        if start_pt != end_pt {
            slice = (0, count - 1);
            stack.push(slice);
        } else {
            is_closed = true;
            init_iters = 1;
        }
    }

    if is_closed {
        // --- 1. Seed with an approximately farthest pair ---
        right_slice.0 = 0;
        for _ in 0..init_iters {
            let mut max_dist = 0.0;
            pos = (pos + right_slice.0) % count;
            start_pt = points[pos];
            pos = next(pos);

            for j in 1..count {
                let pt = points[pos];
                pos = next(pos);
                let dx = (pt.x - start_pt.x) as f64;
                let dy = (pt.y - start_pt.y) as f64;
                let dist = dx * dx + dy * dy;
                if dist > max_dist {
                    max_dist = dist;
                    right_slice.0 = j;
                }
            }

            le_eps = max_dist <= eps;
        }

        if !le_eps {
            slice.0 = pos % count;
            right_slice.1 = slice.0;
            right_slice.0 = (right_slice.0 + slice.0) % count;
            slice.1 = right_slice.0;
            stack.push(right_slice);
            stack.push(slice);
        } else {
            approx.push(start_pt);
        }
    }

    // --- 2. Split every range at its farthest point until it fits ---
    while let Some(current) = stack.pop() {
        slice = current;
        let end_pt = points[slice.1];
        pos = slice.0;
        start_pt = points[pos];
        pos = next(pos);

        if pos != slice.1 {
            let dx = (end_pt.x - start_pt.x) as f64;
            let dy = (end_pt.y - start_pt.y) as f64;
            let mut max_dist = 0.0f64;

            while pos != slice.1 {
                let pt = points[pos];
                pos = next(pos);
                let dist = ((pt.y - start_pt.y) as f64 * dx - (pt.x - start_pt.x) as f64 * dy).abs();
                if dist > max_dist {
                    max_dist = dist;
                    right_slice.0 = (pos + count - 1) % count;
                }
            }

            le_eps = max_dist * max_dist <= eps * (dx * dx + dy * dy);
        } else {
            le_eps = true;
            start_pt = points[slice.0];
        }

        if le_eps {
            approx.push(start_pt);
        } else {
            right_slice.1 = slice.1;
            slice.1 = right_slice.0;
            stack.push(right_slice);
            stack.push(slice);
        }
    }

    if !is_closed {
        approx.push(points[count - 1]);
    }

    // --- 3. Drop vertices on almost straight runs ---
    remove_collinear_vertices(approx, eps, closed)
}

fn remove_collinear_vertices(mut approx: Vec<Point>, eps: f64, closed: bool) -> Vec<Point> {
    let count = approx.len();
    let next = |index: usize| if index + 1 >= count { 0 } else { index + 1 };
    let skip = usize::from(!closed);

    let mut new_count = count;
    let mut pos = if closed { count - 1 } else { 0 };
    let mut start_pt = approx[pos];
    pos = next(pos);
    let mut write_pos = pos;
    let mut pt = approx[pos];
    pos = next(pos);

    let mut i = skip;
    while i < count - skip && new_count > 2 {
        let end_pt = approx[pos];
        pos = next(pos);

        let dx = (end_pt.x - start_pt.x) as f64;
        let dy = (end_pt.y - start_pt.y) as f64;
        let dist = ((pt.x - start_pt.x) as f64 * dy - (pt.y - start_pt.y) as f64 * dx).abs();
        let successive_inner_product = (pt.x - start_pt.x) as f64 * (end_pt.x - pt.x) as f64
            + (pt.y - start_pt.y) as f64 * (end_pt.y - pt.y) as f64;

        if dist * dist <= 0.5 * eps * (dx * dx + dy * dy)
            && dx != 0.0
            && dy != 0.0
            && successive_inner_product >= 0.0
        {
            new_count -= 1;
            start_pt = end_pt;
            approx[write_pos] = end_pt;
            write_pos = next(write_pos);
            pt = approx[pos];
            pos = next(pos);
            i += 2;
            continue;
        }

        start_pt = pt;
        approx[write_pos] = pt;
        write_pos = next(write_pos);
        pt = end_pt;
        i += 1;
    }

    if !closed {
        approx[write_pos] = pt;
    }

    approx.truncate(new_count);
    approx
}

/// True when the polygon turns the same way at every vertex. Collinear or repeated
/// vertices make a polygon non-convex, as does having no vertices at all.
pub fn is_convex(points: &[Point]) -> bool {
    let n = points.len();
    if n == 0 {
        return false;
    }

    let mut prev_pt = points[(2 * n - 2) % n];
    let mut cur_pt = points[n - 1];
    let mut dx0 = (cur_pt.x - prev_pt.x) as i64;
    let mut dy0 = (cur_pt.y - prev_pt.y) as i64;
    let mut orientation = 0u8;

    for &point in points {
        prev_pt = cur_pt;
        cur_pt = point;

        let dx = (cur_pt.x - prev_pt.x) as i64;
        let dy = (cur_pt.y - prev_pt.y) as i64;
        let dxdy0 = dx * dy0;
        let dydx0 = dy * dx0;

        orientation |= if dydx0 > dxdy0 {
            1
        } else if dydx0 < dxdy0 {
            2
        } else {
            3
        };
        if orientation == 3 {
            return false;
        }

        dx0 = dx;
        dy0 = dy;
    }

    true
}

/// Slack for floating point error when testing whether a point lies in a circle.
const ENCLOSING_TOLERANCE: f64 = 1e-7;

/// The smallest circle containing every point, built incrementally (Welzl).
pub fn min_enclosing_circle(points: &[Point]) -> Circle {
    let pts: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();

    let circle = match pts.len() {
        0 => (0.0, 0.0, 0.0),
        1 => (pts[0].0, pts[0].1, 0.0),
        _ => {
            let mut circle = circle_from_two(pts[0], pts[1]);
            for i in 2..pts.len() {
                if !encloses(circle, pts[i]) {
                    circle = circle_through_one(&pts[..i], pts[i]);
                }
            }
            circle
        }
    };

    Circle {
        center: (circle.0 as f32, circle.1 as f32),
        radius: circle.2 as f32,
    }
}

type RawCircle = (f64, f64, f64);

fn encloses(circle: RawCircle, point: (f64, f64)) -> bool {
    let dx = point.0 - circle.0;
    let dy = point.1 - circle.1;
    (dx * dx + dy * dy).sqrt() <= circle.2 + ENCLOSING_TOLERANCE * circle.2.max(1.0)
}

/// Smallest circle around `points` with `q` on its edge.
fn circle_through_one(points: &[(f64, f64)], q: (f64, f64)) -> RawCircle {
    let mut circle = circle_from_two(points[0], q);
    for j in 1..points.len() {
        if !encloses(circle, points[j]) {
            circle = circle_through_two(&points[..j], points[j], q);
        }
    }
    circle
}

/// Smallest circle around `points` with both `p` and `q` on its edge.
fn circle_through_two(points: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> RawCircle {
    let mut circle = circle_from_two(p, q);
    for &r in points {
        if !encloses(circle, r) {
            circle = circle_from_three(p, q, r);
        }
    }
    circle
}

fn circle_from_two(a: (f64, f64), b: (f64, f64)) -> RawCircle {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    let radius = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt() / 2.0;
    (cx, cy, radius)
}

fn circle_from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> RawCircle {
    let (bx, by) = (b.0 - a.0, b.1 - a.1);
    let (cx, cy) = (c.0 - a.0, c.1 - a.1);
    let d = 2.0 * (bx * cy - by * cx);

    if d.abs() < f64::EPSILON {
        // Collinear: the circle over the two farthest-apart points.
        let candidates = [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)];
        return candidates
            .into_iter()
            .fold((0.0, 0.0, f64::NEG_INFINITY), |best, candidate| {
                if candidate.2 > best.2 { candidate } else { best }
            });
    }

    let b_sq = bx * bx + by * by;
    let c_sq = cx * cx + cy * cy;
    let ux = (cy * b_sq - by * c_sq) / d;
    let uy = (bx * c_sq - cx * b_sq) / d;
    (a.0 + ux, a.1 + uy, (ux * ux + uy * uy).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, side: i32) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ]
    }

    /// Every integer point along the edges of an axis-aligned rectangle.
    fn dense_rectangle(x: i32, y: i32, w: i32, h: i32) -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..w {
            points.push(Point::new(x + i, y));
        }
        for i in 0..h {
            points.push(Point::new(x + w, y + i));
        }
        for i in 0..w {
            points.push(Point::new(x + w - i, y + h));
        }
        for i in 0..h {
            points.push(Point::new(x, y + h - i));
        }
        points
    }

    #[test]
    fn area_ignores_orientation() {
        let clockwise = square(0, 0, 10);
        let mut counter_clockwise = clockwise.clone();
        counter_clockwise.reverse();
        assert_eq!(contour_area(&clockwise), 100.0);
        assert_eq!(contour_area(&counter_clockwise), 100.0);
    }

    #[test]
    fn degenerate_inputs_measure_zero() {
        assert_eq!(contour_area(&[]), 0.0);
        assert_eq!(arc_length(&[Point::new(3, 4)], true), 0.0);
        assert_eq!(moments(&[Point::new(1, 1), Point::new(5, 5)]), Moments::default());
        assert_eq!(bounding_rect(&[]), Rect::default());
        assert!(!is_convex(&[]));
    }

    #[test]
    fn arc_length_closes_the_loop_only_when_asked() {
        let points = square(0, 0, 10);
        assert_eq!(arc_length(&points, true), 40.0);
        assert_eq!(arc_length(&points, false), 30.0);
    }

    #[test]
    fn bounding_rect_counts_both_end_pixels() {
        let rect = bounding_rect(&square(10, 20, 50));
        assert_eq!(rect, Rect { x: 10, y: 20, width: 51, height: 51 });
        assert_eq!(rect.center(), Point::new(35, 45));
    }

    #[test]
    fn centroid_of_square_is_its_middle() {
        let m = moments(&square(10, 10, 40));
        assert_eq!(m.m00, 1600.0);
        assert_eq!(m.centroid(), Some(Point::new(30, 30)));

        let mut reversed = square(10, 10, 40);
        reversed.reverse();
        assert_eq!(moments(&reversed).centroid(), Some(Point::new(30, 30)));
    }

    #[test]
    fn approximation_keeps_corners_of_dense_rectangle() {
        let dense = dense_rectangle(10, 10, 80, 40);
        let epsilon = 0.02 * arc_length(&dense, true);
        let approx = approx_poly_dp(&dense, epsilon, true);

        assert_eq!(approx.len(), 4, "approx = {:?}", approx);
        for corner in [(10, 10), (90, 10), (90, 50), (10, 50)] {
            assert!(approx.contains(&Point::from(corner)), "missing corner {:?}", corner);
        }
        assert!(is_convex(&approx));
    }

    #[test]
    fn approximation_of_a_triangle_is_the_triangle() {
        let triangle = vec![Point::new(10, 80), Point::new(60, 10), Point::new(110, 80)];
        let epsilon = 0.02 * arc_length(&triangle, true);
        assert_eq!(approx_poly_dp(&triangle, epsilon, true), triangle);
    }

    #[test]
    fn tiny_closed_curve_collapses_to_one_point() {
        let points = vec![Point::new(5, 5), Point::new(6, 5), Point::new(6, 6)];
        let approx = approx_poly_dp(&points, 10.0, true);
        assert_eq!(approx.len(), 1);
    }

    #[test]
    fn collinear_vertices_are_not_convex() {
        let points = vec![
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert!(!is_convex(&points));
        assert!(is_convex(&square(0, 0, 10)));
    }

    #[test]
    fn concave_polygon_is_not_convex() {
        let arrow = vec![
            Point::new(0, 0),
            Point::new(10, 5),
            Point::new(0, 10),
            Point::new(4, 5),
        ];
        assert!(!is_convex(&arrow));
    }

    #[test]
    fn enclosing_circle_of_square_passes_through_corners() {
        let circle = min_enclosing_circle(&square(0, 0, 10));
        assert!((circle.center.0 - 5.0).abs() < 1e-4);
        assert!((circle.center.1 - 5.0).abs() < 1e-4);
        assert!((circle.radius - 50f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn enclosing_circle_of_obtuse_triangle_uses_longest_side() {
        let points = vec![Point::new(0, 0), Point::new(10, 1), Point::new(20, 0)];
        let circle = min_enclosing_circle(&points);
        assert!((circle.center.0 - 10.0).abs() < 1e-4);
        assert!((circle.center.1 - 0.0).abs() < 1e-4);
        assert!((circle.radius - 10.0).abs() < 1e-4);
    }
}
