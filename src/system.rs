//! Non-effect machine state: utilities, looper, drum machine and its step
//! sequencer, metronome, NAM model bookkeeping and DSP telemetry.
//!
//! Same rules as the shared preset: one atomic per field, no locks. Work the
//! dispatcher cannot do inline (file loads) is left here as a pending flag
//! that the controller takes.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

/// Reboot flavor requested by `FLSH` / `RSTD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootMode {
    /// Stay in the bootloader until a host connects.
    Bootloader,
    /// Enter the bootloader without waiting for its timeout.
    BootloaderSkipTimeout,
}

/// Diagnostic generator selected by `UTIL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Generator {
    Noise = 0,
    Tone = 1,
    Tuner = 2,
}

impl Generator {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Noise),
            1 => Some(Self::Tone),
            2 => Some(Self::Tuner),
            _ => None,
        }
    }
}

/// Looper transport actions. Each is an edge event consumed once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopActions(u8);

impl LoopActions {
    pub const STOP: u8 = 1 << 0;
    pub const CLEAR: u8 = 1 << 1;
    pub const UNDO: u8 = 1 << 2;
    pub const REDO: u8 = 1 << 3;
    pub const CLEAR_ALL: u8 = 1 << 4;
    pub const RECORD: u8 = 1 << 5;

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Drum groove styles, indexed by the `DRUM` style byte.
pub const DRUM_STYLES: [&str; 11] = [
    "rock", "blues", "jazz", "shuffle", "pop", "metal", "latin", "rnb", "country", "funk", "swing",
];

/// Style value that selects the step sequencer instead of a MIDI file.
pub const DRUM_PATTERN_MODE: u8 = 10;

/// Highest MIDI groove variation.
pub const MAX_DRUM_NUMBER: u8 = 6;

const NO_MODEL: u8 = u8::MAX;

/// Step sequencer voices (`DRM1`/`DRM2` row byte).
pub const SEQUENCER_ROWS: usize = 8;

/// Steps per sequencer row.
pub const SEQUENCER_STEPS: usize = 16;

/// One sequencer row of step velocities.
pub type SequencerRow = [u8; SEQUENCER_STEPS];

const STEP_ZERO: AtomicU8 = AtomicU8::new(0);
const ROW_ZERO: [AtomicU8; SEQUENCER_STEPS] = [STEP_ZERO; SEQUENCER_STEPS];

/// A drum groove waiting to be loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrumLoad {
    pub style: u8,
    pub number: u8,
}

impl DrumLoad {
    /// File path of the groove, e.g. `0:/DrumMidi/rock3.mid`.
    pub fn path(&self) -> heapless::String<32> {
        use core::fmt::Write;
        let mut path = heapless::String::new();
        let style = DRUM_STYLES.get(usize::from(self.style)).copied().unwrap_or("rock");
        let _ = write!(path, "0:/DrumMidi/{}{}.mid", style, self.number);
        path
    }
}

/// Process-wide non-preset state.
pub struct SystemState {
    pub bypass: AtomicBool,

    pub noise_enabled: AtomicBool,
    pub noise_level: AtomicU8,
    pub tone_enabled: AtomicBool,
    pub tone_level: AtomicU8,
    pub tone_freq_hz: AtomicU16,
    pub tuner_enabled: AtomicBool,

    pub looper_enabled: AtomicBool,
    pub looper_level: AtomicU8,
    pub looper_sync: AtomicU8,
    loop_actions: AtomicU8,

    pub metronome_enabled: AtomicBool,
    pub metronome_level: AtomicU8,
    pub metronome_bpm: AtomicU8,
    pub metronome_pattern: AtomicU8,

    pub drum_enabled: AtomicBool,
    pub drum_level: AtomicU8,
    pub drum_bpm: AtomicU8,
    pub drum_reverb: AtomicU8,
    pub drum_style: AtomicU8,
    pub drum_number: AtomicU8,
    drum_pending: AtomicBool,

    sequencer: [[AtomicU8; SEQUENCER_STEPS]; SEQUENCER_ROWS],
    /// One bit per row edited since the controller last took it.
    sequencer_dirty: AtomicU8,

    pub midi_channel: AtomicU8,

    nam_model: AtomicU8,
    nam_pending: AtomicU8,
    models_available: AtomicU8,
    irs_available: AtomicU8,

    tuner_hz: AtomicU32,
    dsp_load: AtomicU32,
}

impl SystemState {
    pub const fn new() -> Self {
        Self {
            bypass: AtomicBool::new(false),
            noise_enabled: AtomicBool::new(false),
            noise_level: AtomicU8::new(0),
            tone_enabled: AtomicBool::new(false),
            tone_level: AtomicU8::new(0),
            tone_freq_hz: AtomicU16::new(440),
            tuner_enabled: AtomicBool::new(false),
            looper_enabled: AtomicBool::new(false),
            looper_level: AtomicU8::new(0),
            looper_sync: AtomicU8::new(0),
            loop_actions: AtomicU8::new(0),
            metronome_enabled: AtomicBool::new(false),
            metronome_level: AtomicU8::new(0),
            metronome_bpm: AtomicU8::new(120),
            metronome_pattern: AtomicU8::new(0),
            drum_enabled: AtomicBool::new(false),
            drum_level: AtomicU8::new(0),
            drum_bpm: AtomicU8::new(120),
            drum_reverb: AtomicU8::new(0),
            drum_style: AtomicU8::new(0),
            drum_number: AtomicU8::new(0),
            drum_pending: AtomicBool::new(false),
            sequencer: [ROW_ZERO; SEQUENCER_ROWS],
            sequencer_dirty: AtomicU8::new(0),
            midi_channel: AtomicU8::new(0),
            nam_model: AtomicU8::new(NO_MODEL),
            nam_pending: AtomicU8::new(NO_MODEL),
            models_available: AtomicU8::new(0),
            irs_available: AtomicU8::new(0),
            tuner_hz: AtomicU32::new(0),
            dsp_load: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    // Looper

    /// Queue edge actions; repeated actions accumulate until taken.
    pub fn push_loop_actions(&self, flags: u8) {
        if flags != 0 {
            self.loop_actions.fetch_or(flags, Ordering::AcqRel);
        }
    }

    pub fn take_loop_actions(&self) -> LoopActions {
        LoopActions(self.loop_actions.swap(0, Ordering::AcqRel))
    }

    // Drum machine

    pub fn request_drum_load(&self, style: u8, number: u8) {
        self.drum_style.store(style, Ordering::Relaxed);
        self.drum_number.store(number, Ordering::Relaxed);
        self.drum_pending.store(true, Ordering::Release);
    }

    pub fn take_drum_load(&self) -> Option<DrumLoad> {
        if !self.drum_pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(DrumLoad {
            style: self.drum_style.load(Ordering::Relaxed),
            number: self.drum_number.load(Ordering::Relaxed),
        })
    }

    // Step sequencer

    /// Write velocities starting at `first_step` and mark the row edited.
    /// Steps past the end of the row are ignored. `false` if `row` does not exist.
    pub fn set_sequencer_steps(&self, row: u8, first_step: usize, velocities: &[u8]) -> bool {
        let Some(cells) = self.sequencer.get(usize::from(row)) else {
            return false;
        };
        for (cell, &v) in cells.iter().skip(first_step).zip(velocities) {
            cell.store(v, Ordering::Relaxed);
        }
        self.sequencer_dirty.fetch_or(1 << row, Ordering::AcqRel);
        true
    }

    pub fn sequencer_row(&self, row: u8) -> Option<SequencerRow> {
        let cells = self.sequencer.get(usize::from(row))?;
        let mut out = [0u8; SEQUENCER_STEPS];
        for (dst, cell) in out.iter_mut().zip(cells) {
            *dst = cell.load(Ordering::Relaxed);
        }
        Some(out)
    }

    /// Take the lowest edited row.
    pub fn take_sequencer_row(&self) -> Option<(u8, SequencerRow)> {
        let dirty = self.sequencer_dirty.load(Ordering::Acquire);
        if dirty == 0 {
            return None;
        }
        let row = dirty.trailing_zeros() as u8;
        self.sequencer_dirty.fetch_and(!(1 << row), Ordering::AcqRel);
        self.sequencer_row(row).map(|steps| (row, steps))
    }

    // NAM models

    /// Active model index, `None` before the first load.
    pub fn nam_model(&self) -> Option<u8> {
        match self.nam_model.load(Ordering::Acquire) {
            NO_MODEL => None,
            index => Some(index),
        }
    }

    /// Pending model index, `None` if nothing is queued.
    pub fn pending_model(&self) -> Option<u8> {
        match self.nam_pending.load(Ordering::Acquire) {
            NO_MODEL => None,
            index => Some(index),
        }
    }

    /// Queue a model load. Returns `false` if `index` is the active model or
    /// no such model is available.
    pub fn request_model(&self, index: u8) -> bool {
        if index >= self.models_available() || self.nam_model() == Some(index) {
            return false;
        }
        self.nam_pending.store(index, Ordering::Release);
        true
    }

    pub fn take_pending_model(&self) -> Option<u8> {
        match self.nam_pending.swap(NO_MODEL, Ordering::AcqRel) {
            NO_MODEL => None,
            index => Some(index),
        }
    }

    /// Record that `index` finished loading.
    pub fn set_active_model(&self, index: u8) {
        self.nam_model.store(index, Ordering::Release);
    }

    #[inline]
    pub fn models_available(&self) -> u8 {
        self.models_available.load(Ordering::Relaxed)
    }

    pub fn set_models_available(&self, count: u8) {
        self.models_available.store(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn irs_available(&self) -> u8 {
        self.irs_available.load(Ordering::Relaxed)
    }

    pub fn set_irs_available(&self, count: u8) {
        self.irs_available.store(count, Ordering::Relaxed);
    }

    // Telemetry

    pub fn tuner_hz(&self) -> f32 {
        f32::from_bits(self.tuner_hz.load(Ordering::Relaxed))
    }

    pub fn set_tuner_hz(&self, hz: f32) {
        self.tuner_hz.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub fn dsp_load(&self) -> f32 {
        f32::from_bits(self.dsp_load.load(Ordering::Relaxed))
    }

    pub fn set_dsp_load(&self, load: f32) {
        self.dsp_load.store(load.to_bits(), Ordering::Relaxed);
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}
