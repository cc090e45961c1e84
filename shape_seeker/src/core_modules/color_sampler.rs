// THEORY:
// The `ColorSampler` estimates the color of a detected region from a small patch of
// pixels around its centroid, rather than averaging the whole interior. Shapes are
// found on their edges, so the interior near the centroid is the least likely part
// of the region to be contaminated by background or edge blur.
//
// Algorithm:
// 1.  **Centroid**: The area-weighted center of the boundary (first moments over
//     the enclosed area). A boundary with zero area has no centroid and is reported
//     as degenerate; the caller leaves that record's color Unknown.
// 2.  **Neighborhood**: A fixed 5x5 window centered on the centroid, clipped to the
//     image. Only pixels inside the image are counted.
// 3.  **Average, then convert**: Each raw channel is averaged over the window and
//     rounded back to 8 bits. Only that single averaged color is converted to HSV.
//     Averaging hue directly would be wrong across the red wrap-around.
// 4.  **8-bit HSV**: The conversion uses the fixed-point OpenCV scheme (hue 0..=179
//     as degrees / 2, saturation and value 0..=255), because the color buckets are
//     calibrated against exactly those numbers.

use crate::core_modules::geometry::Boundary;
use crate::error::{Result, SeekerError};
use std::sync::OnceLock;

/// Side length of the square sampling window.
pub const SAMPLE_SIZE: i32 = 5;

/// Read access to an image whose pixels can be read as (blue, green, red).
///
/// The engine never owns frames; the capture pipeline hands it whatever buffer type
/// it works with and implements this trait for it.
pub trait PixelSource {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// The pixel at `(x, y)` as `[blue, green, red]`. Only called for in-bounds
    /// coordinates.
    fn bgr_at(&self, x: u32, y: u32) -> [u8; 3];
}

impl PixelSource for image::RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        image::RgbImage::dimensions(self)
    }

    fn bgr_at(&self, x: u32, y: u32) -> [u8; 3] {
        let image::Rgb([red, green, blue]) = *self.get_pixel(x, y);
        [blue, green, red]
    }
}

/// A color on the 8-bit OpenCV HSV scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hsv {
    /// 0..=179 (degrees / 2).
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

const HSV_SHIFT: i32 = 12;

struct HsvTables {
    saturation_div: [i32; 256],
    hue_div: [i32; 256],
}

static HSV_TABLES: OnceLock<HsvTables> = OnceLock::new();

fn hsv_tables() -> &'static HsvTables {
    HSV_TABLES.get_or_init(|| {
        let mut saturation_div = [0i32; 256];
        let mut hue_div = [0i32; 256];
        for i in 1..256usize {
            saturation_div[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round_ties_even() as i32;
            hue_div[i] = ((180 << HSV_SHIFT) as f64 / (6.0 * i as f64)).round_ties_even() as i32;
        }
        HsvTables {
            saturation_div,
            hue_div,
        }
    })
}

impl Hsv {
    /// Converts one 8-bit (blue, green, red) color with the fixed-point lookup tables
    /// of the classic 8-bit HSV conversion.
    pub fn from_bgr([blue, green, red]: [u8; 3]) -> Self {
        let tables = hsv_tables();
        let (b, g, r) = (blue as i32, green as i32, red as i32);

        let value = b.max(g).max(r);
        let minimum = b.min(g).min(r);
        let diff = value - minimum;
        let round = 1 << (HSV_SHIFT - 1);

        let saturation = (diff * tables.saturation_div[value as usize] + round) >> HSV_SHIFT;

        let sector = if value == r {
            g - b
        } else if value == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let mut hue = (sector * tables.hue_div[diff as usize] + round) >> HSV_SHIFT;
        if hue < 0 {
            hue += 180;
        }

        Self {
            hue: hue.clamp(0, 179) as u8,
            saturation: saturation.clamp(0, 255) as u8,
            value: value as u8,
        }
    }
}

/// Averages the raw color in the 5x5 window around the boundary's centroid and
/// converts it to HSV.
///
/// Returns `SeekerError::DegenerateBoundary` when the boundary encloses no area.
/// When the window lies entirely outside the image the zero color is returned.
pub fn sample<I: PixelSource + ?Sized>(image: &I, boundary: &Boundary) -> Result<Hsv> {
    let center = boundary
        .moments()
        .centroid()
        .ok_or(SeekerError::DegenerateBoundary)?;

    Ok(Hsv::from_bgr(average_bgr(image, center.x, center.y)))
}

/// The mean (blue, green, red) over the in-bounds part of the sampling window,
/// rounded to 8 bits. Zero when no pixel of the window is inside the image.
pub fn average_bgr<I: PixelSource + ?Sized>(image: &I, center_x: i32, center_y: i32) -> [u8; 3] {
    let (width, height) = image.dimensions();
    let half = SAMPLE_SIZE / 2;

    let mut sums = [0u64; 3];
    let mut counted = 0u64;

    for y in (center_y - half)..=(center_y + half) {
        for x in (center_x - half)..=(center_x + half) {
            if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                continue;
            }
            let pixel = image.bgr_at(x as u32, y as u32);
            for (sum, channel) in sums.iter_mut().zip(pixel) {
                *sum += channel as u64;
            }
            counted += 1;
        }
    }

    if counted == 0 {
        return [0, 0, 0];
    }

    sums.map(|sum| (sum as f64 / counted as f64).round_ties_even().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::Point;
    use image::{Rgb, RgbImage};

    fn square_boundary(x: i32, y: i32, side: i32) -> Boundary {
        Boundary::new(vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ])
    }

    #[test]
    fn primary_colors_convert_to_opencv_hues() {
        assert_eq!(Hsv::from_bgr([0, 0, 255]), Hsv { hue: 0, saturation: 255, value: 255 });
        assert_eq!(Hsv::from_bgr([0, 255, 0]), Hsv { hue: 60, saturation: 255, value: 255 });
        assert_eq!(Hsv::from_bgr([255, 0, 0]), Hsv { hue: 120, saturation: 255, value: 255 });
        assert_eq!(Hsv::from_bgr([0, 255, 255]), Hsv { hue: 30, saturation: 255, value: 255 });
    }

    #[test]
    fn grays_have_no_hue_or_saturation() {
        assert_eq!(Hsv::from_bgr([0, 0, 0]), Hsv::default());
        assert_eq!(Hsv::from_bgr([128, 128, 128]), Hsv { hue: 0, saturation: 0, value: 128 });
    }

    #[test]
    fn partial_saturation_follows_the_fixed_point_tables() {
        // diff = 100, value = 200: exactly 127.5, the truncated table entry lands on 127.
        let hsv = Hsv::from_bgr([100, 150, 200]);
        assert_eq!(hsv.value, 200);
        assert_eq!(hsv.saturation, 127);
        // 60 * (150 - 100) / 100 = 30 degrees -> 15.
        assert_eq!(hsv.hue, 15);
    }

    #[test]
    fn samples_the_uniform_interior() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 200, 0]));
        let hsv = sample(&image, &square_boundary(20, 20, 40)).unwrap();
        assert_eq!(hsv, Hsv { hue: 60, saturation: 255, value: 200 });
    }

    #[test]
    fn window_is_centered_on_the_centroid() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        for y in 38..=42 {
            for x in 38..=42 {
                image.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        let hsv = sample(&image, &square_boundary(20, 20, 40)).unwrap();
        assert_eq!(hsv.hue, 120);
    }

    #[test]
    fn window_is_clipped_to_the_image() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([90, 90, 90]));
        // 3x3 of the 5x5 window is inside the image: 90 / 9 = 10.
        assert_eq!(average_bgr(&image, 0, 0), [10, 10, 10]);
    }

    #[test]
    fn window_outside_the_image_yields_zero_color() {
        let image = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let hsv = sample(&image, &square_boundary(100, 100, 20)).unwrap();
        assert_eq!(hsv, Hsv::default());
    }

    #[test]
    fn zero_area_boundary_is_degenerate() {
        let image = RgbImage::new(10, 10);
        let line = Boundary::new(vec![Point::new(1, 1), Point::new(8, 8)]);
        assert!(matches!(sample(&image, &line), Err(SeekerError::DegenerateBoundary)));
    }
}
