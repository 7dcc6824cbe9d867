//! Static effect layout table.
//!
//! One [`FxLayout`] per effect slot, in canonical chain order. This table is
//! the only place that knows how many knobs and dropdowns an effect has, what
//! its dropdowns may contain, and which tag addresses it. Command lengths,
//! dropdown bounds and UI widgets are all derived from it.

use crate::protocol::Tag;

/// Upper bound on knobs per effect (fixed width in the preset binary).
pub const MAX_KNOBS: usize = 10;

/// Upper bound on dropdowns per effect (fixed width in the preset binary).
pub const MAX_DROPDOWNS: usize = 4;

/// Longest flat parameter block: enable + knobs + dropdowns.
pub const MAX_FLAT_LEN: usize = 1 + MAX_KNOBS + MAX_DROPDOWNS;

/// Number of effect slots, `GNRC` included.
pub const FX_COUNT: usize = 18;

/// Effects carried in a preset (`GNRC` is live-only).
pub const PRESET_FX_COUNT: usize = 17;

/// Effect slot identifier, in canonical chain order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FxId {
    Gate = 0,
    Comp = 1,
    AutoWah = 2,
    Overdrive = 3,
    Distortion = 4,
    Equalizer = 5,
    Harmonizer = 6,
    Vibrato = 7,
    Chorus = 8,
    Octave = 9,
    Flanger = 10,
    Phaser = 11,
    Tremolo = 12,
    AmpCab = 13,
    Delay = 14,
    Nam = 15,
    Reverb = 16,
    Generic = 17,
}

impl FxId {
    pub const ALL: [FxId; FX_COUNT] = [
        FxId::Gate,
        FxId::Comp,
        FxId::AutoWah,
        FxId::Overdrive,
        FxId::Distortion,
        FxId::Equalizer,
        FxId::Harmonizer,
        FxId::Vibrato,
        FxId::Chorus,
        FxId::Octave,
        FxId::Flanger,
        FxId::Phaser,
        FxId::Tremolo,
        FxId::AmpCab,
        FxId::Delay,
        FxId::Nam,
        FxId::Reverb,
        FxId::Generic,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<FxId> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn layout(self) -> &'static FxLayout {
        &FX_LAYOUTS[self.index()]
    }

    #[inline]
    pub fn tag(self) -> Tag {
        self.layout().tag
    }

    /// Stored in presets (everything but `GNRC`).
    #[inline]
    pub fn is_persisted(self) -> bool {
        self.index() < PRESET_FX_COUNT
    }
}

/// A dropdown parameter and its option list.
#[derive(Debug)]
pub struct Dropdown {
    pub label: &'static str,
    pub options: &'static [&'static str],
}

impl Dropdown {
    #[inline]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

/// Parameter layout of one effect.
#[derive(Debug)]
pub struct FxLayout {
    pub id: FxId,
    pub tag: Tag,
    /// Short name shown on the main screen.
    pub name: &'static str,
    pub knobs: &'static [&'static str],
    /// Largest legal knob value (100 for percent knobs, 255 for legacy raw bytes).
    pub knob_max: u8,
    pub dropdowns: &'static [Dropdown],
}

impl FxLayout {
    #[inline]
    pub fn knob_count(&self) -> usize {
        self.knobs.len()
    }

    #[inline]
    pub fn dropdown_count(&self) -> usize {
        self.dropdowns.len()
    }

    /// Bytes after the tag in a parameter command: `1 + K + D`.
    #[inline]
    pub fn flat_len(&self) -> usize {
        1 + self.knob_count() + self.dropdown_count()
    }

    /// Offset of dropdown `d` inside the flat block.
    #[inline]
    pub fn dropdown_offset(&self, d: usize) -> usize {
        1 + self.knob_count() + d
    }

    /// Option count of dropdown `d`, 0 if the effect has no such dropdown.
    pub fn option_count(&self, d: usize) -> usize {
        self.dropdowns.get(d).map_or(0, Dropdown::option_count)
    }
}

const PERCENT: u8 = 100;
const RAW: u8 = 255;

const DIST_TYPE: &[&str] = &[
    "Exp", "Soft", "Hard", "High Gain", "Fuzz", "Assymetric", "Multi Stage", "Tube Amp", "BitCrunch",
];
const OVRD_BRAND: &[&str] = &["TubeScreamer", "Blues Driver", "Klon", "ODR1"];
const DIST_BRAND: &[&str] = &["Rat", "DS2", "MetalZone", "MXR+", "BigMuff"];
const EQ_TYPE: &[&str] = &["Neutral", "Mid Scoop", "Mid Boost", "Bass Boost", "Treble Boost"];
const EQ_FREQ_SCALE: &[&str] = &["100%", "75%", "50%", "125%", "150%"];
const SCALE: &[&str] = &["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
const MODE: &[&str] = &[
    "Major", "Minor", "Harmonic Minor", "Melodic Minor", "Lydian", "Mixolydian", "Phrygian", "Dorian",
    "Locrian",
];
const HARM_INTERVAL: &[&str] = &["-2", "-3", "-4", "-5", "-6", "2", "3", "4", "5", "6"];
const SHIFT_SEMITONE: &[&str] = &["detune", "1", "2", "3", "4", "5", "6", "7", "8", "9", "11", "12"];
const SHIFT_DIRECTION: &[&str] = &["up", "down"];
const PHASER_POLES: &[&str] = &["1", "2", "3", "4"];
const TREMOLO_MODE: &[&str] = &["vintage", "harmonic"];
const WAVEFORM: &[&str] = &["Sine", "Triangle", "Saw", "Square"];
const AMP_TYPE: &[&str] = &[
    "None", "Fender 65", "Twin Reverb", "Marshall", "Orange", "Mesa", "EVH", "Friedman", "VOX", "Bassman",
    "Custom",
];
const TONE_TYPE: &[&str] = &["None", "Fender", "Marshall"];
const IR_POINTS: &[&str] = &["256", "512", "1024", "2048", "4096", "8192"];
const IR_TYPE: &[&str] = &["FIR", "FFT", "Part Conv"];
const DELAY_TYPE: &[&str] = &["Digital", "Echo", "Tape", "Multi", "Modulated", "PingPong", "Ducking"];
const DIVISION: &[&str] = &[
    "1/32", "1/16", "1/16t", "1/16d", "1/8", "1/8t", "1/8d", "1/4", "1/4t", "1/4d", "1/2", "1",
];
const DELAY_MULTI: &[&str] = &["1", "2", "3"];
const NAM_MODEL: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17", "18", "19",
    "20", "21", "22", "23", "24", "25",
];
const REVERB_ENGINE: &[&str] = &["Freeverb", "Dattorro"];
const REVERB_TYPE: &[&str] = &["Room", "Hall", "Plate", "Spring"];
const AWAH_FILTER: &[&str] = &["LowPass", "BandPass", "HighPass"];
const AWAH_MODE: &[&str] = &["Envelope", "Humanizer"];
const AWAH_DIRECTION: &[&str] = &["Up", "Down"];
const GENERIC1: &[&str] = &["A1", "B1", "C1", "D1", "E1"];
const GENERIC2: &[&str] = &["A2", "B2", "C2", "D2", "E2"];

const fn dd(label: &'static str, options: &'static [&'static str]) -> Dropdown {
    Dropdown { label, options }
}

const LAYOUTS: [FxLayout; FX_COUNT] = [
    FxLayout {
        id: FxId::Gate,
        tag: Tag::new(b"GATE"),
        name: "Gate",
        knobs: &["threshold_db", "hold", "attack", "release", "level"],
        knob_max: PERCENT,
        dropdowns: &[],
    },
    FxLayout {
        id: FxId::Comp,
        tag: Tag::new(b"COMP"),
        name: "Comp",
        knobs: &["level", "ratio", "threshold", "attack", "release", "wet", "dry", "makeup"],
        knob_max: PERCENT,
        dropdowns: &[],
    },
    FxLayout {
        id: FxId::AutoWah,
        tag: Tag::new(b"AWAH"),
        name: "Awah",
        knobs: &[
            "dry", "wet", "sensitivity", "Q", "freq_center", "freq_min", "freq_max", "attack", "decay",
        ],
        knob_max: PERCENT,
        dropdowns: &[
            dd("awah_filter", AWAH_FILTER),
            dd("awah_mode", AWAH_MODE),
            dd("awah_direction", AWAH_DIRECTION),
        ],
    },
    FxLayout {
        id: FxId::Overdrive,
        tag: Tag::new(b"OVRD"),
        name: "Ovrd",
        knobs: &[
            "level", "drive", "type", "PreLPF", "PreHPF", "PostLPF", "PostHPF", "midFreq", "Mid", "Blend",
        ],
        knob_max: PERCENT,
        dropdowns: &[dd("dist_type", DIST_TYPE), dd("ovrd_brand", OVRD_BRAND)],
    },
    FxLayout {
        id: FxId::Distortion,
        tag: Tag::new(b"DIST"),
        name: "Dist",
        knobs: &[
            "level", "drive", "type", "PreLPF", "PreHPF", "PostLPF", "PostHPF", "midFreq", "Mid", "blend",
        ],
        knob_max: PERCENT,
        dropdowns: &[dd("dist_type", DIST_TYPE), dd("dist_brand", DIST_BRAND)],
    },
    FxLayout {
        id: FxId::Equalizer,
        tag: Tag::new(b"EQUL"),
        name: "Equl",
        knobs: &["level", "hpf", "100", "200", "400", "800", "1600", "3200", "lpf", "q"],
        knob_max: PERCENT,
        dropdowns: &[dd("eq_type", EQ_TYPE), dd("eq_freq_scale", EQ_FREQ_SCALE)],
    },
    FxLayout {
        id: FxId::Harmonizer,
        tag: Tag::new(b"HARM"),
        name: "Harm",
        knobs: &["Level", "Dry", "Wet1", "Wet2", "ArpegRate", "Gate", "Glide"],
        knob_max: PERCENT,
        dropdowns: &[
            dd("Scale", SCALE),
            dd("Mode", MODE),
            dd("Harm1", HARM_INTERVAL),
            dd("Harm2", HARM_INTERVAL),
        ],
    },
    FxLayout {
        id: FxId::Vibrato,
        tag: Tag::new(b"VIBR"),
        name: "Vibr",
        knobs: &["rate", "depth", "flutter"],
        knob_max: PERCENT,
        dropdowns: &[],
    },
    FxLayout {
        id: FxId::Chorus,
        tag: Tag::new(b"CHOR"),
        name: "Chor",
        knobs: &["level", "rate", "depth", "delay", "feedback", "wet", "dry"],
        knob_max: PERCENT,
        dropdowns: &[],
    },
    FxLayout {
        id: FxId::Octave,
        tag: Tag::new(b"OCTV"),
        name: "Octv",
        knobs: &["level", "dry", "wet", "shift", "bufsize"],
        knob_max: PERCENT,
        dropdowns: &[dd("shift_semitone", SHIFT_SEMITONE), dd("shift_direction", SHIFT_DIRECTION)],
    },
    FxLayout {
        id: FxId::Flanger,
        tag: Tag::new(b"FLNG"),
        name: "Flng",
        knobs: &["level", "rate", "depth", "feedback", "delay"],
        knob_max: PERCENT,
        dropdowns: &[],
    },
    FxLayout {
        id: FxId::Phaser,
        tag: Tag::new(b"PHAS"),
        name: "Phas",
        knobs: &["level", "lfoFreq", "lfoDepth", "freq", "feedback", "wet", "dry"],
        knob_max: PERCENT,
        dropdowns: &[dd("phaser_poles", PHASER_POLES)],
    },
    FxLayout {
        id: FxId::Tremolo,
        tag: Tag::new(b"TREM"),
        name: "Trem",
        knobs: &["level", "depth", "rate", "midFreq"],
        knob_max: PERCENT,
        dropdowns: &[dd("tremolo_mode", TREMOLO_MODE), dd("waveform", WAVEFORM)],
    },
    FxLayout {
        id: FxId::AmpCab,
        tag: Tag::new(b"FIR "),
        name: "FIR ",
        knobs: &["level", "treble", "mid", "bass", "presence", "gain"],
        knob_max: PERCENT,
        dropdowns: &[
            dd("amp_type", AMP_TYPE),
            dd("tone_type", TONE_TYPE),
            dd("ir_points", IR_POINTS),
            dd("ir_type", IR_TYPE),
        ],
    },
    FxLayout {
        id: FxId::Delay,
        tag: Tag::new(b"DELY"),
        name: "Dely",
        knobs: &["level", "feedback", "time", "LPF", "dry", "wet", "depth", "rate", "ser-par"],
        knob_max: PERCENT,
        dropdowns: &[
            dd("delay_type", DELAY_TYPE),
            dd("division", DIVISION),
            dd("delay-multi", DELAY_MULTI),
        ],
    },
    FxLayout {
        id: FxId::Nam,
        tag: Tag::new(b"NAM "),
        name: "NAM ",
        knobs: &["level", "pre_att"],
        knob_max: PERCENT,
        dropdowns: &[dd("NAM_Model", NAM_MODEL)],
    },
    FxLayout {
        id: FxId::Reverb,
        tag: Tag::new(b"RVRB"),
        name: "Rvrb",
        knobs: &["level", "feedback", "damp", "dry", "wet", "freeze", "gain", "depth", "rate", "type"],
        knob_max: PERCENT,
        dropdowns: &[dd("ReverbEngine", REVERB_ENGINE), dd("ReverbType", REVERB_TYPE)],
    },
    FxLayout {
        id: FxId::Generic,
        tag: Tag::new(b"GNRC"),
        name: "Gnrc",
        knobs: &["level", "par1", "par2", "par3", "par4", "par5", "par6", "par7", "par8", "par9"],
        knob_max: RAW,
        dropdowns: &[dd("generic1", GENERIC1), dd("generic2", GENERIC2)],
    },
];

/// Canonical layout table, indexed by [`FxId`].
pub static FX_LAYOUTS: [FxLayout; FX_COUNT] = LAYOUTS;

// Table shape is checked at compile time.
const _: () = {
    let mut i = 0;
    while i < FX_COUNT {
        let layout = &LAYOUTS[i];
        assert!(layout.id as usize == i, "layout order must match FxId");
        assert!(layout.knobs.len() <= MAX_KNOBS);
        assert!(layout.dropdowns.len() <= MAX_DROPDOWNS);
        let mut d = 0;
        while d < layout.dropdowns.len() {
            let n = layout.dropdowns[d].options.len();
            assert!(n > 0 && n <= 256);
            d += 1;
        }
        i += 1;
    }
};

/// Layout for a tag, if any effect uses it.
pub fn layout_for_tag(tag: Tag) -> Option<&'static FxLayout> {
    FX_LAYOUTS.iter().find(|l| l.tag == tag)
}
