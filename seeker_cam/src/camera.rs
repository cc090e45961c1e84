use opencv::{
    core::{self, Mat, Vec3b},
    prelude::*,
    videoio::{self, VideoCapture},
};
use shape_seeker::{FrameSource, PixelSource, Result, SeekerError};

/// One captured BGR frame.
pub struct CameraFrame {
    pub mat: Mat,
}

impl PixelSource for CameraFrame {
    fn dimensions(&self) -> (u32, u32) {
        (self.mat.cols().max(0) as u32, self.mat.rows().max(0) as u32)
    }

    fn bgr_at(&self, x: u32, y: u32) -> [u8; 3] {
        match self.mat.at_2d::<Vec3b>(y as i32, x as i32) {
            Ok(pixel) => [pixel[0], pixel[1], pixel[2]],
            Err(err) => {
                log::warn!("reading pixel ({}, {}) failed, using black: {}", x, y, err);
                [0, 0, 0]
            }
        }
    }
}

/// A webcam opened through the OpenCV video I/O backend.
pub struct OpenCvCamera {
    capture: VideoCapture,
    device: i32,
}

impl OpenCvCamera {
    pub fn open(device: i32) -> Result<Self> {
        let capture = VideoCapture::new(device, videoio::CAP_ANY).map_err(acquisition)?;
        if !capture.is_opened().map_err(acquisition)? {
            return Err(SeekerError::AcquisitionFailure(format!(
                "could not open camera {device}"
            )));
        }
        log::info!("opened camera {}", device);
        Ok(Self { capture, device })
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = CameraFrame;

    fn next_frame(&mut self) -> Result<CameraFrame> {
        let mut mat = Mat::default();
        let grabbed = self.capture.read(&mut mat).map_err(acquisition)?;
        if !grabbed || mat.empty() {
            return Err(SeekerError::AcquisitionFailure(format!(
                "camera {} delivered no frame",
                self.device
            )));
        }
        if mat.typ() != core::CV_8UC3 {
            return Err(SeekerError::AcquisitionFailure(format!(
                "camera {} delivered a frame of type {}, expected 8-bit BGR",
                self.device,
                mat.typ()
            )));
        }
        Ok(CameraFrame { mat })
    }

    fn release(&mut self) {
        if let Err(err) = self.capture.release() {
            log::warn!("releasing camera {} failed: {}", self.device, err);
        }
    }
}

fn acquisition(err: opencv::Error) -> SeekerError {
    SeekerError::AcquisitionFailure(err.to_string())
}
