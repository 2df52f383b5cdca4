//! Display collaborator boundary.
//!
//! The worker never touches UI state. State transitions push [`UiEvent`]s
//! into an [`Outbox`]; once the transition has committed the worker posts
//! them through a [`DisplayLink`], a non-owning back reference that silently
//! drops events after the display is gone.

use crate::device::PreviewSurface;
use crate::types::{DeviceId, FlashMode, Size};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Notification destined for the display's own execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum UiEvent {
    PreviewSizeNegotiated(Size),
    FlashStateChanged(FlashMode),
    FacingChanged(DeviceId),
}

impl UiEvent {
    /// Route the event to the matching listener callback.
    pub fn dispatch(self, listener: &mut dyn DisplayListener) {
        match self {
            UiEvent::PreviewSizeNegotiated(size) => {
                listener.on_preview_size_negotiated(size.width, size.height)
            }
            UiEvent::FlashStateChanged(mode) => listener.on_flash_state_changed(mode),
            UiEvent::FacingChanged(id) => listener.on_facing_changed(id),
        }
    }
}

/// Callbacks the display runs on its own context.
pub trait DisplayListener {
    /// Informs layout of the negotiated preview aspect.
    fn on_preview_size_negotiated(&mut self, width: u32, height: u32);
    /// Drives flash icon visibility; see [`FlashMode::icon`].
    fn on_flash_state_changed(&mut self, mode: FlashMode);
    /// Drives front/back icon selection.
    fn on_facing_changed(&mut self, id: DeviceId);
}

/// The display collaborator as seen from the worker.
pub trait Display: Send + Sync {
    /// Hand an event to the display's own context. Must not block.
    fn post(&self, event: UiEvent);

    /// Surface the preview streams into, if the display has one ready.
    fn preview_surface(&self) -> Option<Arc<dyn PreviewSurface>>;
}

/// Weak back reference from the worker to its display.
#[derive(Clone)]
pub struct DisplayLink {
    target: Weak<dyn Display>,
}

impl DisplayLink {
    pub fn new(display: &Arc<dyn Display>) -> Self {
        Self {
            target: Arc::downgrade(display),
        }
    }

    /// A link that never reaches a display.
    pub fn detached() -> Self {
        let target: Weak<dyn Display> = Weak::<UiMailbox>::new();
        Self { target }
    }

    pub fn upgrade(&self) -> Option<Arc<dyn Display>> {
        self.target.upgrade()
    }

    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Post one event. Returns whether a display was there to receive it.
    pub fn post(&self, event: UiEvent) -> bool {
        match self.target.upgrade() {
            Some(display) => {
                display.post(event);
                true
            }
            None => {
                log::debug!("Display gone, dropping {:?}", event);
                false
            }
        }
    }
}

/// Pending UI notifications produced by a state transition.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<UiEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: UiEvent) {
        self.pending.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn events(&self) -> &[UiEvent] {
        &self.pending
    }

    /// Post everything in order. Returns how many events reached a display.
    pub fn flush(&mut self, link: &DisplayLink) -> usize {
        self.pending
            .drain(..)
            .map(|event| link.post(event))
            .filter(|delivered| *delivered)
            .count()
    }
}

/// Channel-backed [`Display`] for UIs that drain events on their own thread.
pub struct UiMailbox {
    sender: Sender<UiEvent>,
    surface: Option<Arc<dyn PreviewSurface>>,
}

/// Receiving end of a [`UiMailbox`], owned by the UI thread.
pub struct UiReceiver {
    receiver: Receiver<UiEvent>,
}

impl UiMailbox {
    pub fn new(surface: Option<Arc<dyn PreviewSurface>>) -> (Arc<Self>, UiReceiver) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Arc::new(Self { sender, surface }), UiReceiver { receiver })
    }
}

impl Display for UiMailbox {
    fn post(&self, event: UiEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("UI receiver dropped, discarding {:?}", event);
        }
    }

    fn preview_surface(&self) -> Option<Arc<dyn PreviewSurface>> {
        self.surface.clone()
    }
}

impl UiReceiver {
    /// Dispatch every queued event without waiting. Returns the count.
    pub fn drain_into(&self, listener: &mut dyn DisplayListener) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            event.dispatch(listener);
            count += 1;
        }
        count
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<UiEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn try_iter(&self) -> impl Iterator<Item = UiEvent> + '_ {
        self.receiver.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Listener {
        calls: Vec<String>,
    }

    impl DisplayListener for Listener {
        fn on_preview_size_negotiated(&mut self, width: u32, height: u32) {
            self.calls.push(format!("size {}x{}", width, height));
        }

        fn on_flash_state_changed(&mut self, mode: FlashMode) {
            self.calls.push(format!("flash {:?}", mode.icon()));
        }

        fn on_facing_changed(&mut self, id: DeviceId) {
            self.calls.push(format!("facing {}", id));
        }
    }

    #[test]
    fn test_outbox_flushes_in_order() {
        let (mailbox, receiver) = UiMailbox::new(None);
        let display: Arc<dyn Display> = mailbox;
        let link = DisplayLink::new(&display);

        let mut outbox = Outbox::new();
        outbox.push(UiEvent::FlashStateChanged(FlashMode::Off));
        outbox.push(UiEvent::FacingChanged(DeviceId::FRONT));
        assert_eq!(outbox.flush(&link), 2);
        assert!(outbox.is_empty());

        let mut listener = Listener::default();
        assert_eq!(receiver.drain_into(&mut listener), 2);
        assert_eq!(listener.calls, vec!["flash Off", "facing front(1)"]);
    }

    #[test]
    fn test_dropped_display_is_silent() {
        let (mailbox, _receiver) = UiMailbox::new(None);
        let display: Arc<dyn Display> = mailbox;
        let link = DisplayLink::new(&display);
        drop(display);

        assert!(!link.is_attached());
        assert!(!link.post(UiEvent::FlashStateChanged(FlashMode::Torch)));

        let mut outbox = Outbox::new();
        outbox.push(UiEvent::FacingChanged(DeviceId::BACK));
        assert_eq!(outbox.flush(&link), 0);
    }

    #[test]
    fn test_detached_link() {
        let link = DisplayLink::detached();
        assert!(link.upgrade().is_none());
        assert!(!link.post(UiEvent::PreviewSizeNegotiated(Size::new(1, 1))));
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&UiEvent::FlashStateChanged(FlashMode::Torch)).unwrap();
        assert_eq!(json, r#"{"event":"flash_state_changed","value":"torch"}"#);
    }
}
