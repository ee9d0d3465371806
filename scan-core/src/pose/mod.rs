//! Rig and arm pose transformations

mod transforms;

pub use transforms::{secondary_location, ArmPose, RigTransform, SecondaryPlacement};
