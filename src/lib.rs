//! crabpreview: serialized camera preview lifecycle management
//!
//! Opens a capture device, negotiates preview and picture sizes against what
//! the hardware reports, streams into a display surface and drives the torch,
//! all from a single command worker thread.
//!
//! # Features
//! - Exact aspect-ratio size negotiation with deterministic tie-breaks
//! - Flash/torch state machine that follows recording
//! - Front/back switching with automatic restart
//! - Weak display back-reference; nothing is posted to a dropped UI
//! - In-memory simulated driver for offline testing
//!
//! # Usage
//! ```rust,no_run
//! use crabpreview::testing::{RecordingDisplay, SimulatedDriver};
//! use crabpreview::{CommandWorker, Display};
//! use std::sync::Arc;
//!
//! let display: Arc<dyn Display> = RecordingDisplay::new();
//! let worker = CommandWorker::builder(Box::new(SimulatedDriver::new()))
//!     .display(&display)
//!     .spawn()?;
//!
//! let camera = worker.handle();
//! camera.start_preview(1920, 1080)?;
//! camera.toggle_flash()?;
//! worker.shutdown()?;
//! # Ok::<(), crabpreview::errors::WorkerError>(())
//! ```
pub mod capability;
pub mod config;
pub mod device;
pub mod display;
pub mod errors;
pub mod facing;
pub mod flash;
pub mod invariant;
pub mod negotiate;
pub mod session;
pub mod types;
pub mod worker;
pub mod zoom;

// Testing utilities - simulated driver for offline testing
pub mod testing;

// Re-exports for convenience
pub use capability::Capabilities;
pub use config::PreviewConfig;
pub use device::{CameraDevice, CameraDriver, OrientationOracle, PreviewSurface, SensorOrientation};
pub use display::{Display, DisplayListener, UiEvent, UiMailbox, UiReceiver};
pub use errors::{ConfigError, DeviceError, DriverError, PreviewError, StreamError, WorkerError};
pub use session::{CaptureSession, SessionState};
pub use types::{CaptureParameters, DeviceId, FlashMode, FpsRange, Size};
pub use worker::{CameraHandle, Command, CommandWorker, SessionSnapshot};
pub use zoom::{ZoomControl, ZoomTarget};

/// Initialize logging for the preview pipeline
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabpreview=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabpreview");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_repeatable() {
        init_logging();
        init_logging();
        assert!(std::env::var("RUST_LOG").is_ok());
    }
}
