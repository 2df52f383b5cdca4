//! In-memory camera driver for offline testing
//!
//! Models the two-camera handset the preview pipeline is built for: a back
//! camera with torch and zoom, a front camera without either. Every driver
//! call is recorded in a shared [`DriverLog`] and any call can be made to
//! fail through [`FailurePoint`] injection.

use crate::capability::Capabilities;
use crate::device::{CameraDevice, CameraDriver, PreviewSurface};
use crate::display::{Display, UiEvent};
use crate::errors::DriverError;
use crate::types::{
    CaptureParameters, DeviceId, FlashParam, FocusMode, FpsRange, Size,
};
use crate::zoom::{ZoomControl, ZoomTarget};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Capabilities and starting parameters of one simulated device
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub capabilities: Capabilities,
    pub initial: CaptureParameters,
}

impl DeviceProfile {
    /// Rear camera: full focus set, torch, 60 zoom steps
    pub fn back_camera() -> Self {
        Self {
            capabilities: Capabilities {
                focus_modes: Some(vec![
                    FocusMode::Auto,
                    FocusMode::ContinuousPicture,
                    FocusMode::ContinuousVideo,
                    FocusMode::Macro,
                ]),
                fps_ranges: Some(vec![
                    FpsRange::new(15000, 15000),
                    FpsRange::new(15000, 30000),
                    FpsRange::new(24000, 30000),
                    FpsRange::new(30000, 30000),
                ]),
                preview_sizes: Some(vec![
                    Size::new(1920, 1080),
                    Size::new(1280, 720),
                    Size::new(960, 720),
                    Size::new(640, 480),
                    Size::new(352, 288),
                ]),
                picture_sizes: Some(vec![
                    Size::new(4032, 3024),
                    Size::new(4032, 2268),
                    Size::new(1920, 1080),
                    Size::new(1280, 720),
                ]),
                flash_modes: Some(vec![
                    FlashParam::Off,
                    FlashParam::Auto,
                    FlashParam::On,
                    FlashParam::Torch,
                ]),
                max_zoom: Some(60),
            },
            initial: CaptureParameters {
                flash: Some(FlashParam::Off),
                ..Default::default()
            },
        }
    }

    /// Selfie camera: fixed focus, no flash, no zoom
    pub fn front_camera() -> Self {
        Self {
            capabilities: Capabilities {
                focus_modes: Some(vec![FocusMode::Fixed]),
                fps_ranges: Some(vec![FpsRange::new(15000, 30000)]),
                preview_sizes: Some(vec![
                    Size::new(1280, 720),
                    Size::new(640, 480),
                    Size::new(320, 240),
                ]),
                picture_sizes: Some(vec![Size::new(2592, 1944), Size::new(1280, 720)]),
                flash_modes: None,
                max_zoom: None,
            },
            initial: CaptureParameters::default(),
        }
    }

    /// Device that reports no capability lists at all
    pub fn bare() -> Self {
        Self {
            capabilities: Capabilities::default(),
            initial: CaptureParameters::default(),
        }
    }
}

/// Driver call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Open,
    GetParameters,
    SetParameters,
    DisplayOrientation,
    PreviewSurface,
    StartStreaming,
    StopStreaming,
}

/// Record of every driver interaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverLog {
    /// Successful opens, in order
    pub opens: Vec<DeviceId>,
    pub releases: usize,
    /// Devices currently held
    pub open_now: usize,
    /// Highest number of devices held at once
    pub peak_open: usize,
    /// Every parameter set the driver accepted
    pub applied: Vec<CaptureParameters>,
    pub orientations: Vec<u32>,
    pub stream_starts: usize,
    pub stream_stops: usize,
}

impl DriverLog {
    /// Flash values written to the device, in order
    pub fn flash_writes(&self) -> Vec<Option<FlashParam>> {
        let mut writes = Vec::new();
        let mut last = None;
        for params in &self.applied {
            if params.flash != last {
                writes.push(params.flash);
                last = params.flash;
            }
        }
        writes
    }
}

#[derive(Debug)]
struct DriverState {
    profiles: HashMap<DeviceId, DeviceProfile>,
    failures: HashMap<FailurePoint, DriverError>,
    held: HashSet<DeviceId>,
    log: DriverLog,
}

impl DriverState {
    fn check(&self, point: FailurePoint) -> Result<(), DriverError> {
        match self.failures.get(&point) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Shared in-memory driver. Clones observe the same devices and log.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    state: Arc<Mutex<DriverState>>,
}

impl SimulatedDriver {
    /// Back camera at id 0, front camera at id 1
    pub fn new() -> Self {
        Self::with_profiles([
            (DeviceId::BACK, DeviceProfile::back_camera()),
            (DeviceId::FRONT, DeviceProfile::front_camera()),
        ])
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = (DeviceId, DeviceProfile)>) -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState {
                profiles: profiles.into_iter().collect(),
                failures: HashMap::new(),
                held: HashSet::new(),
                log: DriverLog::default(),
            })),
        }
    }

    /// Make every later call at `point` fail with `error`
    pub fn fail(&self, point: FailurePoint, error: DriverError) {
        self.lock().failures.insert(point, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn log(&self) -> DriverLog {
        self.lock().log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        // a panicking test thread must not hide the log from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for SimulatedDriver {
    fn open(&mut self, id: DeviceId) -> Result<Box<dyn CameraDevice>, DriverError> {
        let mut state = self.lock();
        state.check(FailurePoint::Open)?;

        let profile = state
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| DriverError::not_found(format!("no camera with id {}", id.0)))?;
        if !state.held.insert(id) {
            return Err(DriverError::busy(format!("camera {} already in use", id)));
        }

        state.log.opens.push(id);
        state.log.open_now += 1;
        state.log.peak_open = state.log.peak_open.max(state.log.open_now);

        Ok(Box::new(SimulatedDevice {
            id,
            capabilities: profile.capabilities,
            parameters: profile.initial,
            streaming: false,
            surface: None,
            driver: self.state.clone(),
        }))
    }
}

/// Device handle handed out by [`SimulatedDriver`]
pub struct SimulatedDevice {
    id: DeviceId,
    capabilities: Capabilities,
    parameters: CaptureParameters,
    streaming: bool,
    surface: Option<Arc<dyn PreviewSurface>>,
    driver: Arc<Mutex<DriverState>>,
}

impl SimulatedDevice {
    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.driver.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn validate(&self, params: &CaptureParameters) -> Result<(), DriverError> {
        let caps = &self.capabilities;
        if let Some(sizes) = caps.preview_candidates() {
            if !sizes.contains(&params.preview_size) {
                return Err(DriverError::rejected(format!(
                    "unsupported preview size {}",
                    params.preview_size
                )));
            }
        }
        if let (Some(flash), Some(modes)) = (params.flash, caps.flash_modes.as_deref()) {
            if !modes.contains(&flash) {
                return Err(DriverError::rejected(format!("unsupported flash mode {:?}", flash)));
            }
        }
        if let Some(max) = caps.max_zoom {
            if params.zoom > max {
                return Err(DriverError::rejected(format!("zoom {} above {}", params.zoom, max)));
            }
        }
        Ok(())
    }
}

impl CameraDevice for SimulatedDevice {
    fn parameters(&self) -> Result<CaptureParameters, DriverError> {
        self.lock().check(FailurePoint::GetParameters)?;
        Ok(self.parameters.clone())
    }

    fn set_parameters(&mut self, params: &CaptureParameters) -> Result<(), DriverError> {
        self.lock().check(FailurePoint::SetParameters)?;
        self.validate(params)?;
        self.parameters = params.clone();
        self.lock().log.applied.push(params.clone());
        Ok(())
    }

    fn supported_focus_modes(&self) -> Option<Vec<FocusMode>> {
        self.capabilities.focus_modes.clone()
    }

    fn supported_fps_ranges(&self) -> Option<Vec<FpsRange>> {
        self.capabilities.fps_ranges.clone()
    }

    fn supported_preview_sizes(&self) -> Option<Vec<Size>> {
        self.capabilities.preview_sizes.clone()
    }

    fn supported_picture_sizes(&self) -> Option<Vec<Size>> {
        self.capabilities.picture_sizes.clone()
    }

    fn supported_flash_modes(&self) -> Option<Vec<FlashParam>> {
        self.capabilities.flash_modes.clone()
    }

    fn max_zoom(&self) -> Option<u32> {
        self.capabilities.max_zoom
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.check(FailurePoint::DisplayOrientation)?;
        state.log.orientations.push(degrees);
        Ok(())
    }

    fn set_preview_surface(&mut self, surface: Arc<dyn PreviewSurface>) -> Result<(), DriverError> {
        self.lock().check(FailurePoint::PreviewSurface)?;
        self.surface = Some(surface);
        Ok(())
    }

    fn start_streaming(&mut self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.check(FailurePoint::StartStreaming)?;
        if self.surface.is_none() {
            return Err(DriverError::runtime("no preview surface attached"));
        }
        state.log.stream_starts += 1;
        drop(state);
        self.streaming = true;
        Ok(())
    }

    fn stop_streaming(&mut self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.check(FailurePoint::StopStreaming)?;
        if self.streaming {
            state.log.stream_stops += 1;
        }
        drop(state);
        self.streaming = false;
        Ok(())
    }

    fn release(self: Box<Self>) {
        let mut state = self.lock();
        state.held.remove(&self.id);
        state.log.releases += 1;
        state.log.open_now = state.log.open_now.saturating_sub(1);
    }
}

/// Preview surface that remembers the buffer sizes it was given
#[derive(Debug, Default)]
pub struct SimulatedSurface {
    sizes: Mutex<Vec<Size>>,
    failure: Option<DriverError>,
}

impl SimulatedSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Surface whose buffer sizing always fails
    pub fn failing(error: DriverError) -> Arc<Self> {
        Arc::new(Self {
            sizes: Mutex::new(Vec::new()),
            failure: Some(error),
        })
    }

    /// Most recent buffer size
    pub fn buffer_size(&self) -> Option<Size> {
        self.sizes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .copied()
    }
}

impl PreviewSurface for SimulatedSurface {
    fn set_default_buffer_size(&self, size: Size) -> Result<(), DriverError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sizes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(size);
        Ok(())
    }
}

/// Display that records every posted event
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<UiEvent>>,
    surface: Option<Arc<SimulatedSurface>>,
}

impl RecordingDisplay {
    /// Display with a ready preview surface
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            surface: Some(SimulatedSurface::new()),
        })
    }

    /// Display whose preview surface is not ready yet
    pub fn without_surface() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn surface(&self) -> Option<Arc<SimulatedSurface>> {
        self.surface.clone()
    }
}

impl Display for RecordingDisplay {
    fn post(&self, event: UiEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn preview_surface(&self) -> Option<Arc<dyn PreviewSurface>> {
        self.surface
            .clone()
            .map(|surface| surface as Arc<dyn PreviewSurface>)
    }
}

/// One `bind` call together with the driver state at that moment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomBinding {
    pub target: Option<ZoomTarget>,
    /// Devices held when the call arrived, 0 unless a driver is observed
    pub open_now: usize,
    /// Releases so far, 0 unless a driver is observed
    pub releases: usize,
}

/// Zoom controller that records its bindings. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingZoom {
    bindings: Arc<Mutex<Vec<ZoomBinding>>>,
    driver: Option<SimulatedDriver>,
}

impl RecordingZoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also capture `driver`'s held/released counts on every binding
    pub fn observing(driver: &SimulatedDriver) -> Self {
        Self {
            bindings: Arc::default(),
            driver: Some(driver.clone()),
        }
    }

    pub fn history(&self) -> Vec<ZoomBinding> {
        self.bindings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn bindings(&self) -> Vec<Option<ZoomTarget>> {
        self.history().into_iter().map(|binding| binding.target).collect()
    }

    /// Target of the most recent binding, `None` when unbound
    pub fn current(&self) -> Option<ZoomTarget> {
        self.bindings().last().copied().flatten()
    }
}

impl ZoomControl for RecordingZoom {
    fn bind(&mut self, target: Option<ZoomTarget>) {
        let (open_now, releases) = match &self.driver {
            Some(driver) => {
                let log = driver.log();
                (log.open_now, log.releases)
            }
            None => (0, 0),
        };
        self.bindings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ZoomBinding {
                target,
                open_now,
                releases,
            });
    }
}
