//! Zoom collaborator binding.
//!
//! The zoom controller never holds the device. It receives a [`ZoomTarget`]
//! describing the live device and sends `Command::SetZoom` through the
//! worker; the session unbinds it before every release.

use crate::types::DeviceId;

/// Non-owning description of the device a zoom controller may drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomTarget {
    pub device_id: DeviceId,
    /// Highest zoom index, 0 when the device cannot zoom.
    pub max_zoom: u32,
    /// Incremented on every open; a stale target has an older generation.
    pub generation: u64,
}

pub trait ZoomControl: Send {
    /// `Some` on successful start, `None` on every stop and failure path.
    fn bind(&mut self, target: Option<ZoomTarget>);
}
