//! Error taxonomy.
//!
//! Drivers report [`DriverError`]; the session translates every driver error
//! into one of [`DeviceError`], [`ConfigError`] or [`StreamError`] so raw
//! driver failures never leak to callers.

use std::fmt;
use thiserror::Error;

/// Classification of a raw driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Device is held by another process.
    Busy,
    /// No device with that id.
    NotFound,
    /// Surface or transport I/O failed.
    Io,
    /// Driver runtime failure.
    Runtime,
    /// Driver refused a parameter set.
    Rejected,
}

/// Error reported by the device/driver layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Busy, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NotFound, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Io, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Runtime, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Rejected, message)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DriverError {}

/// Failure to acquire a device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("camera is busy: {0}")]
    Busy(String),
    #[error("camera not found: {0}")]
    NotFound(String),
    #[error("failed to open camera: {0}")]
    Unknown(String),
}

impl From<DriverError> for DeviceError {
    fn from(err: DriverError) -> Self {
        match err.kind {
            DriverErrorKind::Busy => DeviceError::Busy(err.message),
            DriverErrorKind::NotFound => DeviceError::NotFound(err.message),
            _ => DeviceError::Unknown(err.to_string()),
        }
    }
}

/// Failure while negotiating or committing capture parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("device rejected parameters: {0}")]
    ApplyRejected(DriverError),
    #[error("device parameters unavailable: {0}")]
    ParametersUnavailable(DriverError),
}

/// Failure while binding the output surface or starting the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("preview surface unavailable: {0}")]
    Unavailable(String),
    #[error("driver error while streaming: {0}")]
    DriverError(String),
}

impl From<DriverError> for StreamError {
    fn from(err: DriverError) -> Self {
        match err.kind {
            DriverErrorKind::Io => StreamError::Unavailable(err.message),
            _ => StreamError::DriverError(err.to_string()),
        }
    }
}

/// Any failure of the start-preview sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Command worker lifecycle failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("camera worker did not become ready within {0} ms")]
    StartupTimeout(u64),
    #[error("camera worker failed during startup")]
    StartupFailed,
    #[error("failed to spawn camera worker: {0}")]
    Spawn(String),
    #[error("camera worker is closed")]
    Closed,
    #[error("timed out waiting for camera worker")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_translation() {
        assert_eq!(
            DeviceError::from(DriverError::busy("held")),
            DeviceError::Busy("held".to_string())
        );
        assert_eq!(
            DeviceError::from(DriverError::not_found("id 9")),
            DeviceError::NotFound("id 9".to_string())
        );
        assert!(matches!(
            DeviceError::from(DriverError::runtime("hal died")),
            DeviceError::Unknown(_)
        ));
    }

    #[test]
    fn test_stream_error_translation() {
        assert!(matches!(
            StreamError::from(DriverError::io("surface gone")),
            StreamError::Unavailable(_)
        ));
        assert!(matches!(
            StreamError::from(DriverError::runtime("start failed")),
            StreamError::DriverError(_)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = PreviewError::from(DeviceError::Busy("held".to_string()));
        assert_eq!(err.to_string(), "camera is busy: held");

        let err = ConfigError::ApplyRejected(DriverError::rejected("bad fps"));
        assert_eq!(err.to_string(), "device rejected parameters: Rejected: bad fps");

        assert_eq!(
            WorkerError::StartupTimeout(50).to_string(),
            "camera worker did not become ready within 50 ms"
        );
    }
}
