//! Data model and export protocol for arm-mounted stereo scans

pub mod camera;
pub mod codec;
pub mod error;
pub mod grid;
pub mod pose;
pub mod rig;

pub use camera::CameraCalibration;
pub use codec::{Decoded, DecodedTree, NumericArray};
pub use error::{CaptureError, CodecError, Result, ScanError, StorageError};
pub use grid::{GridPattern, GridScan};
pub use pose::{ArmPose, RigTransform, SecondaryPlacement};
pub use rig::{ExportDocument, SensorDescriptor, ViewRecord};
