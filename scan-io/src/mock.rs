//! Simulated camera and arm for dry runs and tests

use nalgebra::Vector3;
use ndarray::{Array2, Array3};
use scan_core::camera::CameraCalibration;
use scan_core::error::{Result, ScanError};
use scan_core::pose::RigTransform;
use std::f64::consts::FRAC_PI_2;

use crate::device::{FrameSet, FrameSource, MotionController, RigCalibration};
use crate::image::Frame;

/// Horizontal field of view of the simulated infrared sensors
const INFRARED_HFOV_DEG: f64 = 87.0;

/// Pixel shift between the two synthetic infrared images
const DISPARITY_PX: usize = 8;

/// Stereo camera producing deterministic gradient images
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    baseline: f64,
    with_color: bool,
    with_depth: bool,
    frames: usize,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            baseline: 0.05,
            with_color: false,
            with_depth: false,
            frames: 0,
        }
    }

    /// Distance between the sensors in metres, along x
    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_auxiliary(mut self, color: bool, depth: bool) -> Self {
        self.with_color = color;
        self.with_depth = depth;
        self
    }

    pub fn frames_captured(&self) -> usize {
        self.frames
    }

    fn focal_length(&self) -> f64 {
        let half_fov = (INFRARED_HFOV_DEG / 2.0).to_radians();
        (self.width as f64 / 2.0) / half_fov.tan()
    }

    fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    fn infrared(&self, shift: usize) -> Array2<u8> {
        let offset = self.frames * 3;
        Array2::from_shape_fn(self.shape(), |(r, c)| ((r + c + shift + offset) % 256) as u8)
    }

    fn color(&self) -> Array3<u8> {
        let (h, w) = self.shape();
        Array3::from_shape_fn((h, w, 3), |(r, c, ch)| match ch {
            0 => (c * 255 / w.max(1)) as u8,
            1 => (r * 255 / h.max(1)) as u8,
            _ => (self.frames % 256) as u8,
        })
    }

    /// Constant depth matching the synthetic disparity, in millimetres
    fn depth(&self) -> Array2<u16> {
        let z_mm = self.focal_length() * self.baseline / DISPARITY_PX as f64 * 1000.0;
        Array2::from_elem(self.shape(), z_mm.round().clamp(0.0, u16::MAX as f64) as u16)
    }
}

fn frame_err(err: crate::image::ImageError) -> ScanError {
    ScanError::Device(format!("synthetic frame: {}", err))
}

impl FrameSource for SyntheticCamera {
    fn calibration(&self) -> Result<RigCalibration> {
        let f = self.focal_length();
        let intrinsics = CameraCalibration::from_intrinsics(
            f,
            f,
            self.width as f64 / 2.0,
            self.height as f64 / 2.0,
            vec![0.0; 5],
            self.width,
            self.height,
        )?;
        // extrinsics are reported column-major, as depth-camera SDKs do
        let rig = RigTransform::from_column_major(
            [self.baseline, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        )?;

        Ok(RigCalibration {
            primary: intrinsics.clone(),
            secondary: intrinsics,
            rig,
        })
    }

    fn capture(&mut self) -> Result<FrameSet> {
        let primary = Frame::infrared_from_array(&self.infrared(0)).map_err(frame_err)?;
        let secondary =
            Frame::infrared_from_array(&self.infrared(DISPARITY_PX)).map_err(frame_err)?;

        let mut set = FrameSet::pair(primary, secondary);
        if self.with_color {
            set.color = Some(Frame::color_from_array(&self.color()).map_err(frame_err)?);
        }
        if self.with_depth {
            set.depth = Some(Frame::depth_from_array(&self.depth()).map_err(frame_err)?);
        }

        self.frames += 1;
        Ok(set)
    }
}

/// Arm that reaches every target instantly, keeping the home orientation
pub struct SimulatedArm {
    pose: [f64; 6],
    moves: usize,
    fail_after: Option<usize>,
}

impl SimulatedArm {
    /// Home pose of the scanning rig: camera facing along +y
    pub const HOME: [f64; 6] = [0.0, 0.30, 0.70, -FRAC_PI_2, 0.0, 0.0];

    pub fn new() -> Self {
        Self {
            pose: Self::HOME,
            moves: 0,
            fail_after: None,
        }
    }

    /// Refuse every move after the first `moves`
    pub fn with_failure_after(mut self, moves: usize) -> Self {
        self.fail_after = Some(moves);
        self
    }

    pub fn moves(&self) -> usize {
        self.moves
    }
}

impl Default for SimulatedArm {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionController for SimulatedArm {
    fn move_to(&mut self, target: &Vector3<f64>, _wait: bool) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.moves >= limit) {
            return Err(ScanError::Device(format!(
                "protective stop before move {}",
                self.moves + 1
            )));
        }
        if target.iter().any(|v| !v.is_finite()) {
            return Err(ScanError::InvalidInput(format!(
                "non-finite arm target {:?}",
                target
            )));
        }

        self.pose[..3].copy_from_slice(target.as_slice());
        self.moves += 1;
        Ok(())
    }

    fn current_pose(&mut self) -> Result<[f64; 6]> {
        Ok(self.pose)
    }
}
