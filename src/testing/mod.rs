//! Testing utilities for crabpreview
//!
//! Provides an in-memory two-camera driver plus recording display and zoom
//! collaborators, so the whole preview pipeline runs without hardware.

pub mod simulated;

pub use simulated::{
    DeviceProfile, DriverLog, FailurePoint, RecordingDisplay, RecordingZoom, SimulatedDevice,
    SimulatedDriver, SimulatedSurface, ZoomBinding,
};
