//! Capture session: owns the live device handle.
//!
//! ```text
//! Closed --open--> OpenUnconfigured --bind_surface_and_start--> Streaming
//!    ^                   |  configure (stays)                     |
//!    +------- stop ------+---------------- stop ------------------+
//! ```
//!
//! Every failure of `bind_surface_and_start` rolls back to `Closed`. The
//! session is not thread-safe on purpose: it lives on the command worker
//! thread and nothing else touches it.

use crate::capability::Capabilities;
use crate::device::{CameraDevice, CameraDriver, OrientationOracle, PreviewSurface};
use crate::errors::{ConfigError, DeviceError, StreamError};
use crate::invariant::{
    SESSION_CONFIGURE_UNSTARTED, SESSION_HOLDS_DEVICE, SESSION_OPEN_WHILE_CLOSED, SESSION_START_ONCE,
};
use crate::negotiate::{clamp_to_preferred, select_optimal};
use crate::types::{CaptureParameters, DeviceId, Size};
use crate::zoom::{ZoomControl, ZoomTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Closed,
    OpenUnconfigured,
    Streaming,
}

struct OpenDevice {
    id: DeviceId,
    handle: Box<dyn CameraDevice>,
    capabilities: Capabilities,
    parameters: Option<CaptureParameters>,
    streaming: bool,
}

pub struct CaptureSession {
    driver: Box<dyn CameraDriver>,
    zoom: Option<Box<dyn ZoomControl>>,
    preferred: Size,
    device: Option<OpenDevice>,
    generation: u64,
}

impl CaptureSession {
    /// `preferred` is the maximum size requests are clamped to.
    pub fn new(driver: Box<dyn CameraDriver>, preferred: Size) -> Self {
        Self {
            driver,
            zoom: None,
            preferred,
            device: None,
            generation: 0,
        }
    }

    pub fn with_zoom(mut self, zoom: Box<dyn ZoomControl>) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn state(&self) -> SessionState {
        match &self.device {
            None => SessionState::Closed,
            Some(open) if open.streaming => SessionState::Streaming,
            Some(_) => SessionState::OpenUnconfigured,
        }
    }

    /// Id of the open device, `None` while closed.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.device.as_ref().map(|open| open.id)
    }

    /// Parameters last committed by `configure`.
    pub fn parameters(&self) -> Option<&CaptureParameters> {
        self.device.as_ref().and_then(|open| open.parameters.as_ref())
    }

    /// Capability snapshot of the open device.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.device.as_ref().map(|open| &open.capabilities)
    }

    pub fn device_mut(&mut self) -> Option<&mut (dyn CameraDevice + 'static)> {
        self.device.as_mut().map(|open| open.handle.as_mut())
    }

    /// Number of opens so far; identifies the current zoom target.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Acquire the device.
    ///
    /// # Panics
    /// Panics if the session already holds a device.
    pub fn open(&mut self, id: DeviceId) -> Result<(), DeviceError> {
        crate::assert_invariant!(self.device.is_none(), SESSION_OPEN_WHILE_CLOSED);

        log::info!("Opening camera {}", id);
        let handle = self.driver.open(id).map_err(|e| {
            log::error!("Failed to open camera {}: {}", id, e);
            DeviceError::from(e)
        })?;

        let capabilities = Capabilities::query(&*handle);
        self.generation += 1;
        self.device = Some(OpenDevice {
            id,
            handle,
            capabilities,
            parameters: None,
            streaming: false,
        });
        Ok(())
    }

    /// Negotiate and commit capture parameters for `requested`.
    ///
    /// On failure the session stays open with whatever was last committed;
    /// callers should read [`parameters`](Self::parameters) rather than
    /// assume the request took effect.
    ///
    /// # Panics
    /// Panics if no device is open or the session is already streaming.
    pub fn configure(
        &mut self,
        requested: Size,
        oracle: &dyn OrientationOracle,
    ) -> Result<CaptureParameters, ConfigError> {
        crate::assert_invariant!(self.device.is_some(), SESSION_HOLDS_DEVICE);
        crate::assert_invariant!(
            self.state() != SessionState::Streaming,
            SESSION_CONFIGURE_UNSTARTED
        );
        let preferred = self.preferred;
        let Some(open) = self.device.as_mut() else {
            unreachable!("invariant checked above");
        };

        let target = clamp_to_preferred(requested, preferred);
        log::info!("Requested preview {}, negotiating against {}", requested, target);

        let caps = &open.capabilities;
        let mut params = open
            .handle
            .parameters()
            .map_err(ConfigError::ParametersUnavailable)?;

        if let Some(focus) = caps.preferred_focus_mode() {
            params.focus_mode = Some(focus);
        }

        if let Some(ranges) = caps.fps_ranges.as_deref() {
            for (i, range) in ranges.iter().enumerate() {
                log::debug!("supported fps range({}) = {}", i, range);
            }
        }
        if let Some(fps) = caps.fastest_fps_range() {
            log::debug!("Selected fps range {}", fps);
            params.fps_range = Some(fps);
        }

        params.recording_hint = true;

        match caps.preview_candidates() {
            Some(candidates) => params.preview_size = select_optimal(candidates, target),
            None => log::warn!("Device reports no preview sizes, keeping {}", params.preview_size),
        }
        match caps.picture_candidates() {
            Some(candidates) => params.picture_size = select_optimal(candidates, target),
            None => log::warn!("Device reports no picture sizes, keeping {}", params.picture_size),
        }
        log::info!("Preview size {}, picture size {}", params.preview_size, params.picture_size);

        let degrees = open_orientation(oracle, open.id);
        open.handle
            .set_display_orientation(degrees)
            .map_err(ConfigError::ApplyRejected)?;
        params.display_rotation = degrees;

        open.handle
            .set_parameters(&params)
            .map_err(ConfigError::ApplyRejected)?;

        let committed = open
            .handle
            .parameters()
            .map_err(ConfigError::ParametersUnavailable)?;
        if committed.preview_size != params.preview_size {
            log::warn!(
                "Device committed preview {} instead of {}",
                committed.preview_size,
                params.preview_size
            );
        }
        open.parameters = Some(committed.clone());
        Ok(committed)
    }

    /// Size `surface` to the negotiated preview, attach it and start streaming.
    ///
    /// Any failure releases the device and leaves the session `Closed`.
    ///
    /// # Panics
    /// Panics if no device is open or the session is already streaming.
    pub fn bind_surface_and_start(&mut self, surface: Arc<dyn PreviewSurface>) -> Result<(), StreamError> {
        crate::assert_invariant!(self.device.is_some(), SESSION_HOLDS_DEVICE);
        crate::assert_invariant!(self.state() != SessionState::Streaming, SESSION_START_ONCE);

        match self.try_start(surface) {
            Ok(target) => {
                log::info!("Camera {} streaming", target.device_id);
                if let Some(zoom) = self.zoom.as_mut() {
                    zoom.bind(Some(target));
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start preview: {}", e);
                self.teardown();
                Err(e)
            }
        }
    }

    fn try_start(&mut self, surface: Arc<dyn PreviewSurface>) -> Result<ZoomTarget, StreamError> {
        let generation = self.generation;
        let Some(open) = self.device.as_mut() else {
            unreachable!("checked by caller");
        };

        let preview = match &open.parameters {
            Some(params) => params.preview_size,
            None => open.handle.parameters()?.preview_size,
        };

        surface.set_default_buffer_size(preview)?;
        open.handle.set_preview_surface(surface)?;
        open.handle.start_streaming()?;
        open.streaming = true;

        Ok(ZoomTarget {
            device_id: open.id,
            max_zoom: open.capabilities.max_zoom.unwrap_or(0),
            generation,
        })
    }

    /// Stop streaming and release the device. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.device.is_none() {
            log::debug!("Stop requested on closed session");
        }
        self.teardown();
    }

    /// Apply a zoom level for the target of `generation`, clamped to the
    /// device maximum.
    ///
    /// Returns the level applied, or `None` when there is no open device, it
    /// cannot zoom, or the request was issued for an earlier open.
    pub fn set_zoom(&mut self, generation: u64, level: u32) -> Result<Option<u32>, ConfigError> {
        if generation != self.generation {
            log::debug!("Ignoring zoom for stale generation {}", generation);
            return Ok(None);
        }
        let Some(open) = self.device.as_mut() else {
            return Ok(None);
        };
        let Some(max) = open.capabilities.max_zoom.filter(|max| *max > 0) else {
            return Ok(None);
        };

        let level = level.min(max);
        let mut params = open
            .handle
            .parameters()
            .map_err(ConfigError::ParametersUnavailable)?;
        params.zoom = level;
        open.handle
            .set_parameters(&params)
            .map_err(ConfigError::ApplyRejected)?;
        if let Some(committed) = open.parameters.as_mut() {
            committed.zoom = level;
        }
        Ok(Some(level))
    }

    /// Unbind zoom, then stop and release the device if one is held.
    fn teardown(&mut self) {
        if let Some(zoom) = self.zoom.as_mut() {
            zoom.bind(None);
        }

        if let Some(mut open) = self.device.take() {
            if open.streaming {
                if let Err(e) = open.handle.stop_streaming() {
                    log::warn!("Error stopping stream on {}: {}", open.id, e);
                }
            }
            open.handle.release();
            log::info!("Released camera {}", open.id);
        }
    }
}

fn open_orientation(oracle: &dyn OrientationOracle, id: DeviceId) -> u32 {
    let degrees = oracle.display_orientation(id) % 360;
    log::debug!("Display orientation for {}: {}", id, degrees);
    degrees
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.device.is_some() {
            log::warn!("Capture session dropped while holding a device, releasing");
            self.teardown();
        }
    }
}
