use std::path::PathBuf;
use thiserror::Error;

/// Common errors across the scan pipeline
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Directory or file persistence failures. Fatal for a scan session.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Directory is not writable: {}", path.display())]
    NotWritable { path: PathBuf },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("Failed to serialize export: {0}")]
    Serialize(String),

    #[error("Unsupported archive version {found} (expected {expected})")]
    ArchiveVersion { found: u32, expected: u32 },

    #[error("{count} image writes failed, first {}", first.display())]
    UnwrittenImages { first: PathBuf, count: usize },
}

/// Misuse of a session or a malformed frame pair
#[derive(Error, Debug, PartialEq)]
pub enum CaptureError {
    #[error("Calibration not set for {0} sensor")]
    MissingCalibration(&'static str),

    #[error("Rig transform not set")]
    MissingRigTransform,

    #[error("Frame pair mismatch: primary {primary}, secondary {secondary}")]
    FrameMismatch { primary: String, secondary: String },

    #[error(
        "Frame size {actual:?} does not match calibrated size {expected:?} for {sensor} sensor"
    )]
    CalibrationMismatch {
        sensor: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Pose has {0} elements, at least 3 are required")]
    InvalidPose(usize),

    #[error("Pose element {0} is not finite")]
    NonFinitePose(usize),

    #[error("Depth frames cannot be stored as {0}")]
    LossyDepth(String),

    #[error("Session is sealed")]
    Sealed,
}

/// Failures decoding tagged numeric arrays
#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Tagged array is missing its data field")]
    MissingData,

    #[error("Array data is ragged at depth {0}")]
    Ragged(usize),

    #[error("Array element is not numeric: {0}")]
    NonNumeric(String),

    #[error("Array shape does not match data: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
