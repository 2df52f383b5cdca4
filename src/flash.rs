//! Flash/torch state machine.
//!
//! Transitions are pure over a [`Capabilities`] snapshot and record UI
//! notifications in an [`Outbox`]. Pushing the state to hardware is a separate
//! step ([`FlashState::apply_to_device`]) the worker runs after each change.

use crate::capability::Capabilities;
use crate::device::CameraDevice;
use crate::display::{Outbox, UiEvent};
use crate::errors::ConfigError;
use crate::types::FlashMode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashState {
    mode: FlashMode,
}

impl FlashState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FlashMode {
        self.mode
    }

    /// Re-derive availability from a freshly opened device.
    ///
    /// Always posts the resulting state so the icon matches the new device.
    pub fn refresh_availability(&mut self, caps: &Capabilities, outbox: &mut Outbox) {
        if !caps.supports_torch() {
            self.mode = FlashMode::Unavailable;
        } else if self.mode == FlashMode::Unavailable {
            self.mode = FlashMode::Off;
        }
        log::debug!("Flash availability refreshed: {:?}", self.mode);
        outbox.push(UiEvent::FlashStateChanged(self.mode));
    }

    /// Flip between `Off` and `Torch`. `caps` is `None` when no device is open.
    ///
    /// Returns whether the state changed.
    pub fn toggle(&mut self, caps: Option<&Capabilities>, outbox: &mut Outbox) -> bool {
        let Some(caps) = caps else {
            log::debug!("Flash toggle ignored, no open device");
            return false;
        };

        let next = match self.mode {
            FlashMode::Off if caps.supports_torch() => FlashMode::Torch,
            FlashMode::Torch => FlashMode::Off,
            _ => return false,
        };
        self.transition(next, outbox);
        true
    }

    /// Recording turns the torch on when it is off but supported.
    pub fn on_recording_start(&mut self, caps: Option<&Capabilities>, outbox: &mut Outbox) -> bool {
        match (self.mode, caps) {
            (FlashMode::Off, Some(caps)) if caps.supports_torch() => {
                self.transition(FlashMode::Torch, outbox);
                true
            }
            _ => false,
        }
    }

    /// Recording stop turns a lit torch off.
    pub fn on_recording_stop(&mut self, outbox: &mut Outbox) -> bool {
        if self.mode != FlashMode::Torch {
            return false;
        }
        self.transition(FlashMode::Off, outbox);
        true
    }

    /// Push the current state as the device flash parameter.
    ///
    /// No-op without a device or while unavailable.
    pub fn apply_to_device(
        &self,
        device: Option<&mut (dyn CameraDevice + 'static)>,
    ) -> Result<(), ConfigError> {
        let (Some(device), Some(param)) = (device, self.mode.as_param()) else {
            return Ok(());
        };

        let mut params = device.parameters().map_err(ConfigError::ParametersUnavailable)?;
        if params.flash == Some(param) {
            return Ok(());
        }
        params.flash = Some(param);
        device.set_parameters(&params).map_err(ConfigError::ApplyRejected)?;
        log::info!("Flash parameter set to {:?}", param);
        Ok(())
    }

    fn transition(&mut self, next: FlashMode, outbox: &mut Outbox) {
        log::debug!("Flash {:?} -> {:?}", self.mode, next);
        self.mode = next;
        outbox.push(UiEvent::FlashStateChanged(next));
    }
}
