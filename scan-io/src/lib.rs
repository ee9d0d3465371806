//! Capture sessions, frame persistence and export files for stereo scans

pub mod device;
pub mod driver;
pub mod export;
pub mod image;
pub mod mock;
pub mod session;
pub mod sink;

pub use device::{FrameSet, FrameSource, MotionController, RigCalibration};
pub use driver::{DriverOptions, ScanDriver, ScanSummary};
pub use image::{Frame, FrameKind, ImageError, RasterFormat};
pub use session::{ScanSession, SessionOptions};
pub use sink::{ImageSink, WriteTicket};
