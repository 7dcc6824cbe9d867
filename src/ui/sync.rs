//! Main-screen reconciler.
//!
//! The display keeps a cache of what it last drew. Each tick compares it
//! with the live preset and reports which widgets are stale. The live preset
//! is only read here, never written.

use heapless::String;

use crate::fx::{FxId, PRESET_FX_COUNT};
use crate::preset::{PresetSlot, SharedPreset};

/// Preset label bar.
pub const WIDGET_PRESET_BAR: u8 = 0;
/// First effect button; effect `i` is widget `1 + i`.
pub const WIDGET_FX_BASE: u8 = 1;
pub const WIDGET_VOLUME: u8 = 21;
pub const WIDGET_BPM: u8 = 22;

/// Widgets to redraw after a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Redraw {
    /// Whole screen (slot change or first draw).
    pub full: bool,
    pub volume: bool,
    pub bpm: bool,
    /// Bit `i` set when effect `i`'s button changed.
    pub fx: u32,
}

impl Redraw {
    pub const FULL: Self = Self {
        full: true,
        volume: false,
        bpm: false,
        fx: 0,
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[inline]
    pub fn fx_changed(&self, fx: FxId) -> bool {
        self.fx & (1u32 << fx.index()) != 0
    }

    /// Widget indices to redraw, in screen order. Empty for a full redraw.
    pub fn widgets(&self) -> impl Iterator<Item = u8> + '_ {
        let partial = !self.full;
        (0..PRESET_FX_COUNT as u8)
            .filter(move |i| partial && self.fx & (1u32 << *i) != 0)
            .map(|i| WIDGET_FX_BASE + i)
            .chain((partial && self.volume).then_some(WIDGET_VOLUME))
            .chain((partial && self.bpm).then_some(WIDGET_BPM))
    }
}

/// What the screen currently shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct UiCache {
    bank: u8,
    number: u8,
    volume: u8,
    bpm: u8,
    enabled: [bool; PRESET_FX_COUNT],
}

impl UiCache {
    fn read(preset: &SharedPreset) -> Self {
        let (bank, number) = preset.slot();
        let mut enabled = [false; PRESET_FX_COUNT];
        for (flag, fx) in enabled.iter_mut().zip(FxId::ALL) {
            *flag = preset.is_enabled(fx);
        }
        Self {
            bank,
            number,
            volume: preset.master_volume(),
            bpm: preset.bpm(),
            enabled,
        }
    }
}

/// Polling reconciler for the main menu.
pub struct UiSync {
    cache: UiCache,
    primed: bool,
}

impl UiSync {
    pub fn new(preset: &SharedPreset) -> Self {
        Self {
            cache: UiCache::read(preset),
            primed: false,
        }
    }

    /// Compare against the live preset. Does nothing while the main menu is hidden.
    pub fn tick(&mut self, preset: &SharedPreset, visible: bool) -> Redraw {
        if !visible {
            return Redraw::default();
        }

        let live = UiCache::read(preset);
        if !self.primed || live.bank != self.cache.bank || live.number != self.cache.number {
            self.cache = live;
            self.primed = true;
            return Redraw::FULL;
        }

        let mut redraw = Redraw {
            volume: live.volume != self.cache.volume,
            bpm: live.bpm != self.cache.bpm,
            ..Default::default()
        };
        for (i, (now, was)) in live.enabled.iter().zip(&self.cache.enabled).enumerate() {
            if now != was {
                redraw.fx |= 1u32 << i;
            }
        }
        self.cache = live;
        redraw
    }

    /// Force the next visible tick to redraw everything.
    pub fn invalidate(&mut self) {
        self.primed = false;
    }

    /// `"CLEAN-1"` style label of the cached slot.
    pub fn label(&self) -> String<12> {
        PresetSlot::new(self.cache.bank, self.cache.number)
            .map(|slot| slot.label())
            .unwrap_or_default()
    }

    #[inline]
    pub fn volume(&self) -> u8 {
        self.cache.volume
    }

    #[inline]
    pub fn bpm(&self) -> u8 {
        self.cache.bpm
    }

    #[inline]
    pub fn is_enabled(&self, fx: FxId) -> bool {
        self.cache.enabled.get(fx.index()).copied().unwrap_or(false)
    }
}
