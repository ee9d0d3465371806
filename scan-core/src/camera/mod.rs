//! Camera calibration types

mod calibration;

pub use calibration::CameraCalibration;
