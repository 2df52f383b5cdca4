//! Core value types shared by the negotiator, the session and the worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a physical capture device.
///
/// `BACK` and `FRONT` are the two positions the facing selector knows how to
/// flip between. Any other id can still be opened directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    pub const BACK: DeviceId = DeviceId(0);
    pub const FRONT: DeviceId = DeviceId(1);

    /// Physical position, if this id is one of the recognized ones.
    pub fn facing(self) -> Option<Facing> {
        match self {
            DeviceId::BACK => Some(Facing::Back),
            DeviceId::FRONT => Some(Facing::Front),
            _ => None,
        }
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        DeviceId::BACK
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.facing() {
            Some(facing) => write!(f, "{}({})", facing.as_str(), self.0),
            None => write!(f, "device({})", self.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Back,
    Front,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Back => "back",
            Facing::Front => "front",
        }
    }

    pub fn device_id(self) -> DeviceId {
        match self {
            Facing::Back => DeviceId::BACK,
            Facing::Front => DeviceId::FRONT,
        }
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Preview frame-rate range as reported by the driver.
///
/// Most drivers report frames-per-second scaled by 1000; the crate only ever
/// compares ranges and never interprets the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for FpsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Auto,
    ContinuousVideo,
    ContinuousPicture,
    Infinity,
    Macro,
    Fixed,
    Edof,
}

/// Flash value as understood by the device parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlashParam {
    Off,
    On,
    Auto,
    Torch,
    RedEye,
}

/// Illumination state tracked by the flash state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Unavailable,
    Off,
    On,
    Auto,
    Torch,
}

impl FlashMode {
    /// Icon the display should show for this state.
    pub fn icon(self) -> FlashIcon {
        match self {
            FlashMode::On | FlashMode::Auto | FlashMode::Torch => FlashIcon::On,
            FlashMode::Off => FlashIcon::Off,
            FlashMode::Unavailable => FlashIcon::Hidden,
        }
    }

    /// Device parameter value for this state, `None` when there is nothing to push.
    pub fn as_param(self) -> Option<FlashParam> {
        match self {
            FlashMode::Unavailable => None,
            FlashMode::Off => Some(FlashParam::Off),
            FlashMode::On => Some(FlashParam::On),
            FlashMode::Auto => Some(FlashParam::Auto),
            FlashMode::Torch => Some(FlashParam::Torch),
        }
    }
}

impl Default for FlashMode {
    fn default() -> Self {
        FlashMode::Unavailable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashIcon {
    On,
    Off,
    Hidden,
}

/// Negotiated capture settings.
///
/// Read from and written back to the device; after each apply the device's
/// copy is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureParameters {
    pub focus_mode: Option<FocusMode>,
    pub fps_range: Option<FpsRange>,
    pub preview_size: Size,
    pub picture_size: Size,
    pub display_rotation: u32,
    pub flash: Option<FlashParam>,
    pub recording_hint: bool,
    pub zoom: u32,
}

impl Default for CaptureParameters {
    fn default() -> Self {
        Self {
            focus_mode: None,
            fps_range: None,
            preview_size: Size::new(640, 480),
            picture_size: Size::new(640, 480),
            display_rotation: 0,
            flash: None,
            recording_hint: false,
            zoom: 0,
        }
    }
}
