//! Drives the arm through a list of targets, capturing at each stop

use log::{debug, info};
use nalgebra::Vector3;
use scan_core::error::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::device::{FrameSource, MotionController};
use crate::session::ScanSession;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    /// Multiplier from target units to arm units (mm to m by default)
    pub target_scale: f64,
    /// Progress is logged every this many frames; 0 disables it
    pub log_every: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            target_scale: 0.001,
            log_every: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSummary {
    pub frames: usize,
    pub targets: usize,
    pub elapsed: Duration,
}

pub struct ScanDriver<S, M> {
    camera: S,
    arm: M,
    options: DriverOptions,
}

impl<S: FrameSource, M: MotionController> ScanDriver<S, M> {
    pub fn new(camera: S, arm: M) -> Self {
        Self::with_options(camera, arm, DriverOptions::default())
    }

    pub fn with_options(camera: S, arm: M, options: DriverOptions) -> Self {
        Self {
            camera,
            arm,
            options,
        }
    }

    /// Copy the camera's calibration into `session`
    pub fn prepare(&self, session: &mut ScanSession) -> Result<()> {
        let calibration = self.camera.calibration()?;
        debug!(
            "Rig translation {:?}, image size {:?}",
            calibration.rig.translation().as_slice(),
            calibration.primary.image_dimensions()
        );
        session.set_primary_calibration(calibration.primary)?;
        session.set_secondary_calibration(calibration.secondary)?;
        session.set_rig_transform(calibration.rig)?;
        Ok(())
    }

    /// Visit each target in order and capture one frame set there.
    ///
    /// The pose recorded for a capture is the one the arm reports after the
    /// move, not the commanded target. The first failure aborts the run.
    pub fn run(
        &mut self,
        targets: impl IntoIterator<Item = Vector3<f64>>,
        session: &mut ScanSession,
    ) -> Result<ScanSummary> {
        let start = Instant::now();
        let first_frame = session.frame_count();
        let mut visited = 0;

        for target in targets {
            let commanded = target * self.options.target_scale;
            self.arm.move_to(&commanded, true)?;
            let pose = self.arm.current_pose()?;
            let frames = self.camera.capture()?;
            session.accumulate_frames(frames, &pose)?;
            visited += 1;

            if self.options.log_every > 0 && visited % self.options.log_every == 0 {
                info!(
                    "{} frames, at ({:.0}, {:.0}, {:.0}) mm",
                    visited, target.x, target.y, target.z
                );
            }
        }

        let summary = ScanSummary {
            frames: session.frame_count() - first_frame,
            targets: visited,
            elapsed: start.elapsed(),
        };
        info!(
            "Scan finished: {} frames in {:.1}s",
            summary.frames,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    pub fn camera(&self) -> &S {
        &self.camera
    }

    pub fn arm(&self) -> &M {
        &self.arm
    }

    pub fn into_parts(self) -> (S, M) {
        (self.camera, self.arm)
    }
}
