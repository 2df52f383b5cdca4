//! Device capability snapshot and the pure queries run against it.

use crate::device::CameraDevice;
use crate::types::{FlashParam, FocusMode, FpsRange, Size};
use serde::{Deserialize, Serialize};

/// Capability lists reported by one device.
///
/// Every list may be missing (`None`) or empty; neither is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub focus_modes: Option<Vec<FocusMode>>,
    pub fps_ranges: Option<Vec<FpsRange>>,
    pub preview_sizes: Option<Vec<Size>>,
    pub picture_sizes: Option<Vec<Size>>,
    pub flash_modes: Option<Vec<FlashParam>>,
    pub max_zoom: Option<u32>,
}

impl Capabilities {
    /// Snapshot all lists from an open device.
    pub fn query(device: &dyn CameraDevice) -> Self {
        let caps = Self {
            focus_modes: device.supported_focus_modes(),
            fps_ranges: device.supported_fps_ranges(),
            preview_sizes: device.supported_preview_sizes(),
            picture_sizes: device.supported_picture_sizes(),
            flash_modes: device.supported_flash_modes(),
            max_zoom: device.max_zoom(),
        };
        log::debug!("Device capabilities: {:?}", caps);
        caps
    }

    pub fn supports_torch(&self) -> bool {
        self.flash_modes
            .as_deref()
            .is_some_and(|modes| modes.contains(&FlashParam::Torch))
    }

    /// Continuous-video focus, then plain auto-focus, else `None` (leave the
    /// device default untouched).
    pub fn preferred_focus_mode(&self) -> Option<FocusMode> {
        let modes = self.focus_modes.as_deref()?;
        [FocusMode::ContinuousVideo, FocusMode::Auto]
            .into_iter()
            .find(|mode| modes.contains(mode))
    }

    /// Fastest advertised preview range, `None` when the list is absent or empty.
    pub fn fastest_fps_range(&self) -> Option<FpsRange> {
        select_fps_range(self.fps_ranges.as_deref()?)
    }

    /// Preview sizes, `None` unless there is at least one candidate.
    pub fn preview_candidates(&self) -> Option<&[Size]> {
        non_empty(self.preview_sizes.as_deref())
    }

    /// Picture sizes, `None` unless there is at least one candidate.
    pub fn picture_candidates(&self) -> Option<&[Size]> {
        non_empty(self.picture_sizes.as_deref())
    }

    pub fn supports_zoom(&self) -> bool {
        self.max_zoom.is_some_and(|max| max > 0)
    }
}

fn non_empty<T>(list: Option<&[T]>) -> Option<&[T]> {
    list.filter(|items| !items.is_empty())
}

/// Highest upper bound wins; ties go to the higher lower bound, then to the
/// earlier entry.
pub fn select_fps_range(ranges: &[FpsRange]) -> Option<FpsRange> {
    let mut best: Option<FpsRange> = None;
    for range in ranges {
        match best {
            Some(current) if (range.max, range.min) <= (current.max, current.min) => {}
            _ => best = Some(*range),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(list: &[(u32, u32)]) -> Vec<FpsRange> {
        list.iter().map(|&(min, max)| FpsRange::new(min, max)).collect()
    }

    #[test]
    fn test_fps_selects_highest_upper_bound() {
        let list = ranges(&[(5, 15), (10, 30), (15, 60)]);
        assert_eq!(select_fps_range(&list), Some(FpsRange::new(15, 60)));
    }

    #[test]
    fn test_fps_tie_breaks_on_lower_bound() {
        let list = ranges(&[(15, 30), (30, 30), (7, 30)]);
        assert_eq!(select_fps_range(&list), Some(FpsRange::new(30, 30)));
    }

    #[test]
    fn test_fps_identical_ranges_keep_first() {
        let list = ranges(&[(30, 30), (30, 30)]);
        assert_eq!(select_fps_range(&list), Some(FpsRange::new(30, 30)));
        assert_eq!(select_fps_range(&[]), None);
    }

    #[test]
    fn test_absent_fps_list_is_skipped() {
        let caps = Capabilities::default();
        assert_eq!(caps.fastest_fps_range(), None);
    }

    #[test]
    fn test_focus_preference_order() {
        let mut caps = Capabilities {
            focus_modes: Some(vec![FocusMode::Auto, FocusMode::ContinuousVideo]),
            ..Default::default()
        };
        assert_eq!(caps.preferred_focus_mode(), Some(FocusMode::ContinuousVideo));

        caps.focus_modes = Some(vec![FocusMode::Fixed, FocusMode::Auto]);
        assert_eq!(caps.preferred_focus_mode(), Some(FocusMode::Auto));

        caps.focus_modes = Some(vec![FocusMode::Fixed]);
        assert_eq!(caps.preferred_focus_mode(), None);

        caps.focus_modes = None;
        assert_eq!(caps.preferred_focus_mode(), None);
    }

    #[test]
    fn test_torch_support() {
        let mut caps = Capabilities::default();
        assert!(!caps.supports_torch());

        caps.flash_modes = Some(vec![]);
        assert!(!caps.supports_torch());

        caps.flash_modes = Some(vec![FlashParam::Off, FlashParam::Auto]);
        assert!(!caps.supports_torch());

        caps.flash_modes = Some(vec![FlashParam::Off, FlashParam::Torch]);
        assert!(caps.supports_torch());
    }

    #[test]
    fn test_empty_size_lists_are_not_candidates() {
        let caps = Capabilities {
            preview_sizes: Some(vec![]),
            picture_sizes: Some(vec![Size::new(640, 480)]),
            ..Default::default()
        };
        assert!(caps.preview_candidates().is_none());
        assert_eq!(caps.picture_candidates(), Some(&[Size::new(640, 480)][..]));
    }
}
