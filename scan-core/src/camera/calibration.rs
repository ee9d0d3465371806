use nalgebra::Matrix3;

use crate::error::{Result, ScanError};

/// Intrinsic calibration of one image sensor
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    intrinsic_matrix: Matrix3<f64>,
    distortion_coefficients: Vec<f64>,
    image_dimensions: (u32, u32),
}

impl CameraCalibration {
    /// Create a calibration from a full 3x3 intrinsic matrix
    pub fn new(
        intrinsic_matrix: Matrix3<f64>,
        distortion_coefficients: Vec<f64>,
        image_dimensions: (u32, u32),
    ) -> Result<Self> {
        if image_dimensions.0 == 0 || image_dimensions.1 == 0 {
            return Err(ScanError::InvalidInput(format!(
                "image dimensions must be positive, got {:?}",
                image_dimensions
            )));
        }
        if intrinsic_matrix.iter().any(|v| !v.is_finite()) {
            return Err(ScanError::InvalidInput(
                "intrinsic matrix has non-finite entries".to_string(),
            ));
        }
        if distortion_coefficients.iter().any(|v| !v.is_finite()) {
            return Err(ScanError::InvalidInput(
                "distortion coefficients must be finite".to_string(),
            ));
        }

        Ok(Self {
            intrinsic_matrix,
            distortion_coefficients,
            image_dimensions,
        })
    }

    /// Create a calibration from focal lengths and principal point, the
    /// way depth cameras report their stream intrinsics
    pub fn from_intrinsics(
        fx: f64,
        fy: f64,
        ppx: f64,
        ppy: f64,
        distortion_coefficients: Vec<f64>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        #[rustfmt::skip]
        let k = Matrix3::new(
            fx, 0.0, ppx,
            0.0, fy, ppy,
            0.0, 0.0, 1.0,
        );
        Self::new(k, distortion_coefficients, (width, height))
    }

    pub fn intrinsic_matrix(&self) -> &Matrix3<f64> {
        &self.intrinsic_matrix
    }

    pub fn distortion_coefficients(&self) -> &[f64] {
        &self.distortion_coefficients
    }

    /// Get image dimensions (width, height)
    pub fn image_dimensions(&self) -> (u32, u32) {
        self.image_dimensions
    }

    /// Get focal lengths
    pub fn focal_length(&self) -> (f64, f64) {
        (self.intrinsic_matrix[(0, 0)], self.intrinsic_matrix[(1, 1)])
    }

    /// Get principal point
    pub fn principal_point(&self) -> (f64, f64) {
        (self.intrinsic_matrix[(0, 2)], self.intrinsic_matrix[(1, 2)])
    }
}
