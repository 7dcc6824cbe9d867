//! Display-side state: widget reconciliation and user notices.

pub mod sync;

pub use sync::{Redraw, UiSync, WIDGET_BPM, WIDGET_FX_BASE, WIDGET_PRESET_BAR, WIDGET_VOLUME};

use core::fmt::Write;

use heapless::String;

use crate::preset::{PresetError, PresetSlot};

/// Short message for the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiNotice {
    PresetLoaded(PresetSlot),
    PresetSaved(PresetSlot),
    /// A received or stored preset failed validation.
    InvalidPreset(PresetError),
    SaveFailed(PresetError),
    /// An uploaded IR went live; number of points.
    IrLoaded(u16),
}

impl UiNotice {
    pub fn text(&self) -> String<32> {
        let mut text = String::new();
        let _ = match self {
            Self::PresetLoaded(slot) => write!(text, "Loaded {}", slot.label()),
            Self::PresetSaved(slot) => write!(text, "Saved {}", slot.label()),
            Self::InvalidPreset(e) => write!(text, "Invalid preset data ({})", e.code()),
            Self::SaveFailed(e) => write!(text, "Save failed ({})", e.code()),
            Self::IrLoaded(points) => write!(text, "IR loaded ({} pts)", points),
        };
        text
    }
}

/// Latest notice, replaced by newer ones until the display takes it.
#[derive(Debug, Default)]
pub struct NoticeSlot {
    notice: Option<UiNotice>,
}

impl NoticeSlot {
    pub const fn new() -> Self {
        Self { notice: None }
    }

    pub fn post(&mut self, notice: UiNotice) {
        self.notice = Some(notice);
    }

    pub fn take(&mut self) -> Option<UiNotice> {
        self.notice.take()
    }

    pub fn peek(&self) -> Option<&UiNotice> {
        self.notice.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        let slot = PresetSlot::new(5, 1).unwrap();
        assert_eq!(UiNotice::PresetSaved(slot).text().as_str(), "Saved CUSTM1-2");
        let bad = UiNotice::InvalidPreset(PresetError::ChecksumMismatch { stored: 1, computed: 2 });
        assert_eq!(bad.text().as_str(), "Invalid preset data (R04)");
        assert_eq!(UiNotice::IrLoaded(1024).text().as_str(), "IR loaded (1024 pts)");
    }

    #[test]
    fn test_newest_notice_wins() {
        let mut slot = NoticeSlot::new();
        let a = PresetSlot::new(0, 0).unwrap();
        let b = PresetSlot::new(1, 0).unwrap();
        slot.post(UiNotice::PresetLoaded(a));
        slot.post(UiNotice::PresetLoaded(b));
        assert_eq!(slot.take(), Some(UiNotice::PresetLoaded(b)));
        assert_eq!(slot.take(), None);
    }
}
