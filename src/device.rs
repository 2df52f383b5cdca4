//! Driver-side collaborator traits.
//!
//! A [`CameraDriver`] opens devices; a [`CameraDevice`] is the live, exclusive
//! handle. Releasing consumes the boxed handle, so a device cannot be released
//! twice or used after release.

use crate::errors::DriverError;
use crate::types::{CaptureParameters, DeviceId, FlashParam, FocusMode, FpsRange, Size};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Opens capture devices by id.
pub trait CameraDriver: Send {
    fn open(&mut self, id: DeviceId) -> Result<Box<dyn CameraDevice>, DriverError>;
}

/// Live handle to an opened capture device.
///
/// Capability queries return `None` when the device does not report the list
/// at all. An empty list is distinct but handled the same way by callers.
pub trait CameraDevice: Send {
    fn parameters(&self) -> Result<CaptureParameters, DriverError>;
    fn set_parameters(&mut self, params: &CaptureParameters) -> Result<(), DriverError>;

    fn supported_focus_modes(&self) -> Option<Vec<FocusMode>>;
    fn supported_fps_ranges(&self) -> Option<Vec<FpsRange>>;
    fn supported_preview_sizes(&self) -> Option<Vec<Size>>;
    fn supported_picture_sizes(&self) -> Option<Vec<Size>>;
    fn supported_flash_modes(&self) -> Option<Vec<FlashParam>>;

    /// Highest zoom index, `None` when zoom is unsupported.
    fn max_zoom(&self) -> Option<u32> {
        None
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), DriverError>;
    fn set_preview_surface(&mut self, surface: Arc<dyn PreviewSurface>) -> Result<(), DriverError>;
    fn start_streaming(&mut self) -> Result<(), DriverError>;
    fn stop_streaming(&mut self) -> Result<(), DriverError>;

    fn release(self: Box<Self>);
}

/// Output surface frames are streamed into.
pub trait PreviewSurface: Send + Sync {
    fn set_default_buffer_size(&self, size: Size) -> Result<(), DriverError>;
}

/// Computes the rotation to apply so the preview appears upright.
pub trait OrientationOracle: Send {
    /// Degrees, a multiple of 90.
    fn display_orientation(&self, id: DeviceId) -> u32;
}

/// Orientation oracle driven by the display rotation and the sensor mounting.
///
/// The display rotation is shared so the UI can update it whenever the screen
/// turns; the worker reads it at configure time.
#[derive(Debug, Clone)]
pub struct SensorOrientation {
    display_rotation: Arc<AtomicU32>,
    back_sensor: u32,
    front_sensor: u32,
}

impl SensorOrientation {
    /// Typical phone mounting: back sensor at 90 degrees, front at 270.
    pub fn new() -> Self {
        Self::with_sensors(90, 270)
    }

    pub fn with_sensors(back_sensor: u32, front_sensor: u32) -> Self {
        Self {
            display_rotation: Arc::new(AtomicU32::new(0)),
            back_sensor: back_sensor % 360,
            front_sensor: front_sensor % 360,
        }
    }

    /// Handle the UI keeps to report rotation changes.
    pub fn rotation_handle(&self) -> Arc<AtomicU32> {
        self.display_rotation.clone()
    }

    pub fn set_display_rotation(&self, degrees: u32) {
        self.display_rotation.store(degrees % 360, Ordering::Relaxed);
    }
}

impl Default for SensorOrientation {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationOracle for SensorOrientation {
    fn display_orientation(&self, id: DeviceId) -> u32 {
        let rotation = self.display_rotation.load(Ordering::Relaxed) % 360;
        if id == DeviceId::FRONT {
            // front camera preview is mirrored
            let result = (self.front_sensor + rotation) % 360;
            (360 - result) % 360
        } else {
            (self.back_sensor + 360 - rotation) % 360
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_camera_orientation() {
        let oracle = SensorOrientation::new();
        assert_eq!(oracle.display_orientation(DeviceId::BACK), 90);
        oracle.set_display_rotation(90);
        assert_eq!(oracle.display_orientation(DeviceId::BACK), 0);
        oracle.set_display_rotation(270);
        assert_eq!(oracle.display_orientation(DeviceId::BACK), 180);
    }

    #[test]
    fn test_front_camera_orientation_is_mirrored() {
        let oracle = SensorOrientation::new();
        assert_eq!(oracle.display_orientation(DeviceId::FRONT), 90);
        oracle.set_display_rotation(90);
        assert_eq!(oracle.display_orientation(DeviceId::FRONT), 0);
    }

    #[test]
    fn test_rotation_handle_is_shared() {
        let oracle = SensorOrientation::with_sensors(0, 0);
        oracle.rotation_handle().store(180, Ordering::Relaxed);
        assert_eq!(oracle.display_orientation(DeviceId::BACK), 180);
    }
}
