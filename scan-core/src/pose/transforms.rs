use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result, ScanError};

const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Fixed pose of the secondary sensor expressed in the primary sensor frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigTransform {
    translation: Vector3<f64>,
    rotation: Matrix3<f64>,
}

impl RigTransform {
    /// Create a rig transform, rejecting rotations that are not proper
    /// orthonormal matrices
    pub fn new(translation: Vector3<f64>, rotation: Matrix3<f64>) -> Result<Self> {
        if translation.iter().chain(rotation.iter()).any(|v| !v.is_finite()) {
            return Err(ScanError::InvalidInput(
                "rig transform has non-finite entries".to_string(),
            ));
        }

        let drift = (rotation.transpose() * rotation - Matrix3::identity()).norm();
        if drift > ORTHONORMAL_TOLERANCE || rotation.determinant() <= 0.0 {
            return Err(ScanError::InvalidInput(format!(
                "rig rotation is not orthonormal (drift {:.3e})",
                drift
            )));
        }

        Ok(Self {
            translation,
            rotation,
        })
    }

    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Matrix3::identity(),
        }
    }

    /// Build from a column-major 3x3 rotation (the layout depth-camera SDKs
    /// use for stream extrinsics)
    pub fn from_column_major(translation: [f64; 3], rotation: [f64; 9]) -> Result<Self> {
        Self::new(
            Vector3::from(translation),
            Matrix3::from_column_slice(&rotation),
        )
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }
}

/// End-effector pose reported by the arm at capture time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPose {
    pub position: Vector3<f64>,
    pub orientation: Rotation3<f64>,
}

impl ArmPose {
    /// Parse `[x, y, z, rx, ry, rz, ...]`. The trailing rotation vector is
    /// optional; without it the orientation is identity.
    pub fn from_slice(pose: &[f64]) -> std::result::Result<Self, CaptureError> {
        if pose.len() < 3 {
            return Err(CaptureError::InvalidPose(pose.len()));
        }

        let read = if pose.len() >= 6 { 6 } else { 3 };
        if let Some(index) = pose[..read].iter().position(|v| !v.is_finite()) {
            return Err(CaptureError::NonFinitePose(index));
        }

        let position = Vector3::new(pose[0], pose[1], pose[2]);
        let orientation = if pose.len() >= 6 {
            Rotation3::from_scaled_axis(Vector3::new(pose[3], pose[4], pose[5]))
        } else {
            Rotation3::identity()
        };

        Ok(Self {
            position,
            orientation,
        })
    }
}

/// How the secondary sensor's per-view location is derived from the arm pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryPlacement {
    /// `position + R_pose * t_rig`
    #[default]
    Composed,
    /// `position + t_rig`, ignoring the arm orientation
    Offset,
}

/// Location of the secondary sensor for a capture at `pose`
pub fn secondary_location(
    pose: &ArmPose,
    rig: &RigTransform,
    placement: SecondaryPlacement,
) -> Vector3<f64> {
    match placement {
        SecondaryPlacement::Composed => pose.position + pose.orientation * rig.translation,
        SecondaryPlacement::Offset => pose.position + rig.translation,
    }
}
