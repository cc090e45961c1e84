// Draws detection results onto frames and shows them in a HighGUI window.
//
// Interactive mode annotates everything on the frame and polls the keyboard; any
// key closes the display. Batch mode prints the result lines to stdout instead and
// holds each frame on screen for a fixed time.

use crate::camera::CameraFrame;
use opencv::{
    core::{self, Mat, Point, Scalar, Size, Vector},
    highgui, imgproc,
    prelude::*,
};
use shape_seeker::{
    not_found_label, FrameSink, FrameView, Report, Result, SeekerError, ShapeRecord, SinkSignal,
    INACTIVE_BANNER,
};
use std::time::Duration;

const OUTLINE_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const WARNING_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const LABEL_FONT_SCALE: f64 = 0.35;
const LABEL_BOX_ALPHA: f64 = 0.4;

pub enum DisplayMode {
    Interactive { key_poll: Duration },
    Batch { hold: Duration },
}

pub struct HighGuiSink {
    window: String,
    scale: f64,
    mode: DisplayMode,
}

impl HighGuiSink {
    pub fn new(window: impl Into<String>, scale: f64, mode: DisplayMode) -> Self {
        Self {
            window: window.into(),
            scale,
            mode,
        }
    }

    fn is_batch(&self) -> bool {
        matches!(self.mode, DisplayMode::Batch { .. })
    }

    fn annotate(&self, image: &mut Mat, view: &FrameView) -> opencv::Result<()> {
        let FrameView::Searched {
            query,
            boundaries,
            report,
        } = view
        else {
            if !self.is_batch() {
                put_text(image, INACTIVE_BANNER, Point::new(30, 50), 1.5, WARNING_COLOR, 2)?;
            }
            return Ok(());
        };

        match &report.report {
            Report::NotFound { elapsed } => {
                let label = not_found_label(*query, *elapsed);
                if self.is_batch() {
                    println!("{label}");
                } else {
                    put_text(image, &label, Point::new(10, 70), 2.0, WARNING_COLOR, 1)?;
                }
            }
            Report::Found { matches } => {
                if let Err(err) = report.check_pairing(boundaries) {
                    log::warn!("{}; drawing the pairs that exist", err);
                }
                for &index in matches {
                    let Some(record) = report.records.get(index) else {
                        continue;
                    };
                    match (&record.enclosing_circle, boundaries.get(index)) {
                        (Some(circle), _) => {
                            let center = circle.center_point();
                            imgproc::circle(
                                image,
                                Point::new(center.x, center.y),
                                circle.radius as i32,
                                color(OUTLINE_COLOR),
                                2,
                                imgproc::LINE_8,
                                0,
                            )?;
                        }
                        (None, Some(boundary)) => draw_outline(image, boundary)?,
                        (None, None) => {}
                    }

                    if self.is_batch() {
                        println!("{}", record.label());
                    } else {
                        draw_label(image, record)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn show(&self, image: &Mat) -> opencv::Result<SinkSignal> {
        let mut shown = Mat::default();
        imgproc::resize(
            image,
            &mut shown,
            Size::default(),
            self.scale,
            self.scale,
            imgproc::INTER_LINEAR,
        )?;
        highgui::imshow(&self.window, &shown)?;

        match self.mode {
            DisplayMode::Interactive { key_poll } => {
                if highgui::wait_key(wait_delay(key_poll))? >= 0 {
                    Ok(SinkSignal::Stop)
                } else {
                    Ok(SinkSignal::Continue)
                }
            }
            DisplayMode::Batch { hold } => {
                highgui::wait_key(wait_delay(hold))?;
                Ok(SinkSignal::Continue)
            }
        }
    }
}

impl FrameSink<CameraFrame> for HighGuiSink {
    fn present(&mut self, frame: &mut CameraFrame, view: &FrameView) -> Result<SinkSignal> {
        self.annotate(&mut frame.mat, view).map_err(display)?;
        self.show(&frame.mat).map_err(display)
    }

    fn release(&mut self) {
        if let Err(err) = highgui::destroy_all_windows() {
            log::warn!("closing display windows failed: {}", err);
        }
    }
}

fn draw_outline(image: &mut Mat, boundary: &shape_seeker::Boundary) -> opencv::Result<()> {
    let contour: Vector<Point> = boundary
        .points()
        .iter()
        .map(|p| Point::new(p.x, p.y))
        .collect();
    let mut contours: Vector<Vector<Point>> = Vector::new();
    contours.push(contour);
    imgproc::draw_contours(
        image,
        &contours,
        0,
        color(OUTLINE_COLOR),
        2,
        imgproc::LINE_8,
        &core::no_array(),
        i32::MAX,
        Point::default(),
    )
}

/// Record label centered on the record's position over a translucent white box,
/// kept inside the frame.
fn draw_label(image: &mut Mat, record: &ShapeRecord) -> opencv::Result<()> {
    let label = record.label();
    let mut baseline = 0;
    let text = imgproc::get_text_size(
        &label,
        imgproc::FONT_HERSHEY_SIMPLEX,
        LABEL_FONT_SCALE,
        1,
        &mut baseline,
    )?;

    let mut origin = Point::new(record.position.x - text.width / 2, record.position.y);
    origin.x = origin.x.max(0).min(image.cols() - text.width);
    origin.y = origin.y.max(0).min(image.rows() - text.height);

    let mut overlay = image.try_clone()?;
    imgproc::rectangle_points(
        &mut overlay,
        origin,
        Point::new(origin.x + text.width, origin.y - text.height),
        Scalar::new(255.0, 255.0, 255.0, 120.0),
        imgproc::FILLED,
        imgproc::LINE_8,
        0,
    )?;
    let mut blended = Mat::default();
    core::add_weighted(
        &overlay,
        LABEL_BOX_ALPHA,
        &*image,
        1.0 - LABEL_BOX_ALPHA,
        0.0,
        &mut blended,
        -1,
    )?;
    *image = blended;

    put_text(image, &label, origin, LABEL_FONT_SCALE, (0.0, 0.0, 0.0), 1)
}

fn put_text(
    image: &mut Mat,
    text: &str,
    origin: Point,
    scale: f64,
    bgr: (f64, f64, f64),
    thickness: i32,
) -> opencv::Result<()> {
    imgproc::put_text(
        image,
        text,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        color(bgr),
        thickness,
        imgproc::LINE_8,
        false,
    )
}

/// A `wait_key` delay in milliseconds. Zero means "wait forever" to HighGUI, so
/// the delay never drops below one.
fn wait_delay(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX).max(1)
}

/// `(blue, green, red)` as an OpenCV scalar.
fn color((blue, green, red): (f64, f64, f64)) -> Scalar {
    Scalar::new(blue, green, red, 0.0)
}

fn display(err: opencv::Error) -> SeekerError {
    SeekerError::Display(err.to_string())
}
