//! Exported two-sensor rig description

mod descriptor;

pub use descriptor::{ExportDocument, SensorDescriptor, ViewRecord};
