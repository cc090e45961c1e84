// Color mask, edge detection and outer-contour tracing in front of the engine.
// Only regions inside the configured HSV band survive the mask; their Canny edges
// are traced and every outer contour becomes one `Boundary`.

use crate::camera::CameraFrame;
use opencv::{
    core::{self, Mat, Scalar, Vector},
    imgproc,
    prelude::*,
};
use shape_seeker::{Boundary, ContourExtractor, Point, PreprocessSettings, Result, SeekerError};

pub struct OpenCvContours {
    settings: PreprocessSettings,
}

impl OpenCvContours {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }

    fn trace(&self, frame: &Mat) -> opencv::Result<Vec<Boundary>> {
        let pre = &self.settings;

        // --- 1. Keep only pixels inside the HSV band ---
        let mut hsv = Mat::default();
        imgproc::cvt_color(frame, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;

        let mut mask = Mat::default();
        core::in_range(&hsv, &scalar(pre.hsv_lower), &scalar(pre.hsv_upper), &mut mask)?;

        let mut filtered = Mat::default();
        core::bitwise_and(frame, frame, &mut filtered, &mask)?;

        // --- 2. Edges ---
        let mut gray = Mat::default();
        imgproc::cvt_color(&filtered, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let mut edges = Mat::default();
        imgproc::canny(
            &gray,
            &mut edges,
            pre.canny_low,
            pre.canny_high,
            pre.canny_aperture,
            false,
        )?;

        // --- 3. Outer contours ---
        let mut contours: Vector<Vector<core::Point>> = Vector::new();
        imgproc::find_contours(
            &edges,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            core::Point::default(),
        )?;

        Ok(contours
            .iter()
            .map(|contour| {
                Boundary::new(contour.iter().map(|p| Point::new(p.x, p.y)).collect())
            })
            .collect())
    }
}

impl ContourExtractor<CameraFrame> for OpenCvContours {
    fn extract(&mut self, frame: &CameraFrame) -> Result<Vec<Boundary>> {
        let boundaries = self
            .trace(&frame.mat)
            .map_err(|err| SeekerError::AcquisitionFailure(format!("contour tracing: {err}")))?;
        log::trace!("traced {} contours", boundaries.len());
        Ok(boundaries)
    }
}

fn scalar([a, b, c]: [u8; 3]) -> Scalar {
    Scalar::new(a as f64, b as f64, c as f64, 0.0)
}
