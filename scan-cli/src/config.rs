//! Configuration for the scan front end
//!
//! Loaded from a TOML file. Every section and field is optional:
//!
//! ```toml
//! [session]
//! output = "./scans"
//! image_format = "png"
//! writer_threads = 4
//!
//! [grid]
//! width = 1000
//! bottom = 200
//! top = 700
//! pattern = "stepped"
//!
//! [camera]
//! width = 1280
//! height = 720
//!
//! [driver]
//! target_scale = 0.001
//! log_every = 50
//!
//! [logging]
//! level = "debug"
//! ```

use scan_core::grid::GridScan;
use scan_io::driver::DriverOptions;
use scan_io::session::SessionOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub session: SessionConfig,
    pub grid: GridScan,
    pub camera: CameraConfig,
    pub driver: DriverOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Parent directory for scan output
    pub output: PathBuf,
    /// Put each scan in its own `scan_<unix time>` subdirectory
    pub timestamped: bool,
    #[serde(flatten)]
    pub options: SessionOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("."),
            timestamped: true,
            options: SessionOptions::default(),
        }
    }
}

/// Simulated stereo camera
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Sensor separation in metres
    pub baseline: f64,
    pub color: bool,
    pub depth: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            baseline: 0.05,
            color: false,
            depth: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Box<dyn Error>> {
        let config: ScanConfig = toml::from_str(contents)?;
        config.grid.validate()?;
        Ok(config)
    }

    /// Render the effective configuration, defaults included
    pub fn to_toml(&self) -> Result<String, Box<dyn Error>> {
        Ok(toml::to_string_pretty(self)?)
    }
}
