use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::CameraCalibration;
use crate::codec::tagged;
use crate::error::{Result, ScanError};
use crate::pose::RigTransform;

/// One captured image of one sensor and where it was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    /// Path relative to the session root, `/` separated
    #[serde(rename = "image")]
    pub image_reference: String,
    #[serde(with = "tagged::vector3")]
    pub location: Vector3<f64>,
    #[serde(with = "tagged::matrix3")]
    pub rotation: Matrix3<f64>,
}

impl ViewRecord {
    /// View with no orientation estimate
    pub fn at(image_reference: impl Into<String>, location: Vector3<f64>) -> Self {
        Self {
            image_reference: image_reference.into(),
            location,
            rotation: Matrix3::identity(),
        }
    }
}

/// Exported camera-rig entry for one sensor.
///
/// Field order matches the exported layout:
/// `location, rotation, views, K, dist, master, dim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    #[serde(with = "tagged::vector3")]
    pub location: Vector3<f64>,
    #[serde(with = "tagged::matrix3")]
    pub rotation: Matrix3<f64>,
    pub views: Vec<ViewRecord>,
    #[serde(rename = "K", with = "tagged::matrix3")]
    pub intrinsic_matrix: Matrix3<f64>,
    #[serde(rename = "dist", with = "tagged::vector")]
    pub distortion_coefficients: Vec<f64>,
    pub master: bool,
    #[serde(rename = "dim")]
    pub image_dimensions: (u32, u32),
}

impl SensorDescriptor {
    /// Reference sensor: identity pose, zero translation
    pub fn master(calibration: &CameraCalibration, views: Vec<ViewRecord>) -> Self {
        Self::build(calibration, views, Vector3::zeros(), Matrix3::identity(), true)
    }

    /// Sensor placed at `rig` relative to the master
    pub fn attached(
        calibration: &CameraCalibration,
        rig: &RigTransform,
        views: Vec<ViewRecord>,
    ) -> Self {
        Self::build(calibration, views, *rig.translation(), *rig.rotation(), false)
    }

    fn build(
        calibration: &CameraCalibration,
        views: Vec<ViewRecord>,
        location: Vector3<f64>,
        rotation: Matrix3<f64>,
        master: bool,
    ) -> Self {
        Self {
            location,
            rotation,
            views,
            intrinsic_matrix: *calibration.intrinsic_matrix(),
            distortion_coefficients: calibration.distortion_coefficients().to_vec(),
            master,
            image_dimensions: calibration.image_dimensions(),
        }
    }

    /// Recover the calibration this descriptor was built from
    pub fn calibration(&self) -> Result<CameraCalibration> {
        CameraCalibration::new(
            self.intrinsic_matrix,
            self.distortion_coefficients.clone(),
            self.image_dimensions,
        )
    }
}

/// Top-level export: `{ master, cameras }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Index into `cameras` of the reference sensor
    pub master: usize,
    pub cameras: Vec<SensorDescriptor>,
}

impl ExportDocument {
    pub fn new(cameras: Vec<SensorDescriptor>) -> Result<Self> {
        let masters: Vec<usize> = cameras
            .iter()
            .enumerate()
            .filter(|(_, c)| c.master)
            .map(|(i, _)| i)
            .collect();

        match masters.as_slice() {
            [master] => Ok(Self {
                master: *master,
                cameras,
            }),
            _ => Err(ScanError::InvalidInput(format!(
                "expected exactly one master sensor, found {}",
                masters.len()
            ))),
        }
    }

    pub fn master_camera(&self) -> Option<&SensorDescriptor> {
        self.cameras.get(self.master)
    }

    /// Number of views per sensor, if all sensors agree
    pub fn paired_view_count(&self) -> Option<usize> {
        let first = self.cameras.first()?.views.len();
        self.cameras
            .iter()
            .all(|c| c.views.len() == first)
            .then_some(first)
    }
}
