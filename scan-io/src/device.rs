//! Capability interfaces for the hardware a scan drives

use nalgebra::Vector3;
use scan_core::camera::CameraCalibration;
use scan_core::error::Result;
use scan_core::pose::RigTransform;

use crate::image::Frame;

/// Synchronized frames from one capture
#[derive(Debug, Clone)]
pub struct FrameSet {
    pub primary: Frame,
    pub secondary: Frame,
    pub color: Option<Frame>,
    pub depth: Option<Frame>,
}

impl FrameSet {
    pub fn pair(primary: Frame, secondary: Frame) -> Self {
        Self {
            primary,
            secondary,
            color: None,
            depth: None,
        }
    }
}

/// Everything a session needs to describe the stereo pair
#[derive(Debug, Clone, PartialEq)]
pub struct RigCalibration {
    pub primary: CameraCalibration,
    pub secondary: CameraCalibration,
    /// Secondary sensor pose in the primary frame
    pub rig: RigTransform,
}

/// A camera able to deliver synchronized infrared pairs
pub trait FrameSource {
    fn calibration(&self) -> Result<RigCalibration>;

    /// Block until the next frame set is available
    fn capture(&mut self) -> Result<FrameSet>;
}

/// An arm able to move the camera to a position in its base frame
pub trait MotionController {
    /// Command a linear move to `target` (metres). With `wait` the call
    /// returns once the move has finished.
    fn move_to(&mut self, target: &Vector3<f64>, wait: bool) -> Result<()>;

    /// Current tool pose as `[x, y, z, rx, ry, rz]`
    fn current_pose(&mut self) -> Result<[f64; 6]>;
}
