//! Front/back device selection.

use crate::display::{Outbox, UiEvent};
use crate::types::{DeviceId, Facing};

/// Holds the selected device id; it survives session stop/start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacingSelector {
    selected: DeviceId,
}

impl FacingSelector {
    pub fn new(initial: DeviceId) -> Self {
        Self { selected: initial }
    }

    pub fn selected(&self) -> DeviceId {
        self.selected
    }

    /// Flip between back and front. Unrecognized ids stay put.
    ///
    /// Returns whether the id changed; on change a facing notification is
    /// queued in `outbox`.
    pub fn toggle(&mut self, outbox: &mut Outbox) -> bool {
        let next = match self.selected.facing() {
            Some(Facing::Back) => DeviceId::FRONT,
            Some(Facing::Front) => DeviceId::BACK,
            None => {
                log::warn!("Cannot toggle facing of unrecognized {}", self.selected);
                return false;
            }
        };

        log::info!("Switching camera {} -> {}", self.selected, next);
        self.selected = next;
        outbox.push(UiEvent::FacingChanged(next));
        true
    }
}

impl Default for FacingSelector {
    fn default() -> Self {
        Self::new(DeviceId::BACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_and_notifies() {
        let mut selector = FacingSelector::default();
        let mut outbox = Outbox::new();

        assert!(selector.toggle(&mut outbox));
        assert_eq!(selector.selected(), DeviceId::FRONT);
        assert!(selector.toggle(&mut outbox));
        assert_eq!(selector.selected(), DeviceId::BACK);

        assert_eq!(
            outbox.events(),
            &[
                UiEvent::FacingChanged(DeviceId::FRONT),
                UiEvent::FacingChanged(DeviceId::BACK),
            ]
        );
    }

    #[test]
    fn test_unrecognized_id_is_left_alone() {
        let mut selector = FacingSelector::new(DeviceId(5));
        let mut outbox = Outbox::new();
        assert!(!selector.toggle(&mut outbox));
        assert_eq!(selector.selected(), DeviceId(5));
        assert!(outbox.is_empty());
    }
}
