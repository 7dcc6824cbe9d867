//! System command handlers
//!
//! Effect tags are routed straight from the layout table; this file holds
//! everything else. Offsets are relative to the first byte after the tag.

use crate::ir::IR_PACKET_LEN;
use crate::logging::ms_to_us;
use crate::preset::PresetSlot;
use crate::protocol::Tag;
use crate::system::{BootMode, Generator, LoopActions, DRUM_PATTERN_MODE, MAX_DRUM_NUMBER, SEQUENCER_ROWS};
use crate::{log_info, log_warn};

use core::sync::atomic::Ordering;

use super::{Context, DispatchError, Outcome};

/// Handler signature. `params` is at least `min_len` bytes long.
pub type Handler = fn(&Context<'_>, &[u8], u64) -> Result<Outcome, DispatchError>;

/// Command descriptor
pub struct CommandDescriptor {
    pub tag: Tag,
    /// Minimum parameter bytes after the tag.
    pub min_len: usize,
    pub brief: &'static str,
    pub handler: Handler,
}

const GEN: Tag = Tag::new(b"GEN ");
const UTIL: Tag = Tag::new(b"UTIL");
const PRES: Tag = Tag::new(b"PRES");

/// List entry index that clears the list.
const LIST_CLEAR: u8 = 255;

/// Sequencer steps carried by `DRM1` (the first half) and `DRM2` (the rest).
const DRM1_STEPS: usize = 10;
const DRM2_STEPS: usize = 6;

pub(super) const COMMAND_COUNT: usize = 19;

const COMMAND_TABLE: [CommandDescriptor; COMMAND_COUNT] = [
    CommandDescriptor { tag: GEN, min_len: 3, brief: "Master volume and tempo", handler: cmd_gen },
    CommandDescriptor { tag: UTIL, min_len: 5, brief: "Noise/tone/tuner generators", handler: cmd_util },
    CommandDescriptor { tag: Tag::new(b"LOOP"), min_len: 12, brief: "Looper transport", handler: cmd_loop },
    CommandDescriptor { tag: Tag::new(b"DRUM"), min_len: 11, brief: "Drum machine", handler: cmd_drum },
    CommandDescriptor { tag: Tag::new(b"DRM1"), min_len: 1 + DRM1_STEPS, brief: "Sequencer steps 0-9", handler: cmd_steps_low },
    CommandDescriptor { tag: Tag::new(b"DRM2"), min_len: 1 + DRM2_STEPS, brief: "Sequencer steps 10-15", handler: cmd_steps_high },
    CommandDescriptor { tag: Tag::new(b"METR"), min_len: 4, brief: "Metronome", handler: cmd_metronome },
    CommandDescriptor { tag: Tag::new(b"BYPS"), min_len: 1, brief: "Global bypass", handler: cmd_bypass },
    CommandDescriptor { tag: Tag::new(b"MIDI"), min_len: 5, brief: "MIDI channel", handler: cmd_midi },
    CommandDescriptor { tag: Tag::new(b"REQL"), min_len: 0, brief: "Request model list", handler: cmd_request_list },
    CommandDescriptor { tag: PRES, min_len: 5, brief: "Select preset", handler: cmd_preset },
    CommandDescriptor { tag: Tag::new(b"FLSH"), min_len: 0, brief: "Reboot to bootloader", handler: cmd_flash },
    CommandDescriptor { tag: Tag::new(b"RSTD"), min_len: 0, brief: "Reboot to bootloader, no timeout", handler: cmd_reset_dfu },
    CommandDescriptor { tag: Tag::new(b"TUNE"), min_len: 4, brief: "Tuner frequency", handler: cmd_tuner },
    CommandDescriptor { tag: Tag::new(b"LOAD"), min_len: 4, brief: "DSP load", handler: cmd_load },
    CommandDescriptor { tag: Tag::new(b"NAML"), min_len: 1, brief: "Model list entry", handler: cmd_model_list },
    CommandDescriptor { tag: Tag::new(b"IRFL"), min_len: 1, brief: "IR list entry", handler: cmd_ir_list },
    CommandDescriptor { tag: Tag::new(b"IRLR"), min_len: IR_PACKET_LEN, brief: "IR upload data", handler: cmd_ir_data },
    CommandDescriptor { tag: Tag::new(b"IREN"), min_len: 0, brief: "IR upload end", handler: cmd_ir_end },
];

/// All system commands
pub static COMMANDS: &[CommandDescriptor] = &COMMAND_TABLE;

/// Legacy 4-byte spellings.
pub static TAG_ALIASES: &[(Tag, Tag)] = &[(Tag::new(b"_FIR"), Tag::new(b"FIR "))];

/// Legacy 2-byte prefixes, tried only after every 4-byte lookup missed.
pub static SHORT_ALIASES: &[([u8; 2], Tag)] = &[(*b"EQ", Tag::new(b"EQUL"))];

// --- Command Implementations ---

fn cmd_gen(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    ctx.preset.set_master_volume(p[0]);
    ctx.preset.set_bpm(p[2]);
    Ok(Outcome::Applied)
}

fn cmd_util(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let generator = Generator::from_u8(p[0]).ok_or(DispatchError::BadValue {
        tag: UTIL,
        offset: 0,
        value: p[0],
    })?;
    let enabled = p[1] > 0;
    let level = p[2];
    let sys = ctx.system;

    match generator {
        Generator::Noise => {
            sys.noise_enabled.store(enabled, Ordering::Relaxed);
            sys.noise_level.store(level, Ordering::Relaxed);
        }
        Generator::Tone => {
            sys.tone_enabled.store(enabled, Ordering::Relaxed);
            sys.tone_level.store(level, Ordering::Relaxed);
            sys.tone_freq_hz.store(u16::from_be_bytes([p[3], p[4]]), Ordering::Relaxed);
        }
        Generator::Tuner => sys.tuner_enabled.store(enabled, Ordering::Relaxed),
    }
    Ok(Outcome::Applied)
}

fn cmd_loop(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let sys = ctx.system;
    sys.looper_enabled.store(p[0] > 0, Ordering::Relaxed);
    sys.looper_level.store(p[1], Ordering::Relaxed);
    sys.looper_sync.store(p[11], Ordering::Relaxed);

    let actions = [
        (p[2], LoopActions::STOP),
        (p[3], LoopActions::CLEAR),
        (p[4], LoopActions::UNDO),
        (p[5], LoopActions::REDO),
        (p[6], LoopActions::CLEAR_ALL),
        (p[7], LoopActions::RECORD),
    ];
    let flags = actions
        .iter()
        .filter(|(byte, _)| *byte > 0)
        .fold(0u8, |acc, (_, flag)| acc | flag);
    sys.push_loop_actions(flags);
    Ok(Outcome::Applied)
}

fn cmd_drum(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let sys = ctx.system;
    sys.drum_enabled.store(p[0] > 0, Ordering::Relaxed);
    sys.drum_level.store(p[1], Ordering::Relaxed);
    sys.drum_bpm.store(p[2], Ordering::Relaxed);
    sys.drum_reverb.store(p[4], Ordering::Relaxed);
    ctx.preset.set_bpm(p[2]);

    let number = p[9].min(MAX_DRUM_NUMBER);
    let style = p[10];
    if style < DRUM_PATTERN_MODE {
        sys.request_drum_load(style, number);
    } else {
        sys.drum_style.store(style, Ordering::Relaxed);
        sys.drum_number.store(number, Ordering::Relaxed);
    }
    Ok(Outcome::Applied)
}

/// `[row, velocity…]` into the sequencer grid from step `first`.
fn sequencer_steps(
    ctx: &Context<'_>,
    tag: &[u8; 4],
    p: &[u8],
    first: usize,
    count: usize,
) -> Result<Outcome, DispatchError> {
    let row = p[0];
    if usize::from(row) >= SEQUENCER_ROWS {
        return Err(DispatchError::BadValue { tag: Tag::new(tag), offset: 0, value: row });
    }
    ctx.system.set_sequencer_steps(row, first, &p[1..=count]);
    Ok(Outcome::Applied)
}

fn cmd_steps_low(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    sequencer_steps(ctx, b"DRM1", p, 0, DRM1_STEPS)
}

fn cmd_steps_high(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    sequencer_steps(ctx, b"DRM2", p, DRM1_STEPS, DRM2_STEPS)
}

fn cmd_metronome(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let sys = ctx.system;
    sys.metronome_enabled.store(p[0] > 0, Ordering::Relaxed);
    sys.metronome_level.store(p[1], Ordering::Relaxed);
    sys.metronome_bpm.store(p[2], Ordering::Relaxed);
    sys.metronome_pattern.store(p[3], Ordering::Relaxed);
    Ok(Outcome::Applied)
}

fn cmd_bypass(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    ctx.system.bypass.store(p[0] > 0, Ordering::Relaxed);
    Ok(Outcome::Applied)
}

fn cmd_midi(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    ctx.system.midi_channel.store(p[4], Ordering::Relaxed);
    Ok(Outcome::Applied)
}

fn cmd_request_list(_ctx: &Context<'_>, _p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    Ok(Outcome::SendModelList)
}

fn cmd_preset(ctx: &Context<'_>, p: &[u8], now: u64) -> Result<Outcome, DispatchError> {
    let slot = PresetSlot::new(p[1], p[2])?;
    if p[3] <= 100 {
        ctx.preset.set_master_volume(p[3]);
    }
    ctx.preset.set_bpm(p[4]);

    if ctx.preset.slot() == (slot.bank(), slot.number()) {
        return Ok(Outcome::Applied);
    }
    log_info!(ctx.log, ms_to_us(now), "dispatch: preset {} requested", slot.label());
    Ok(Outcome::LoadPreset(slot))
}

fn cmd_flash(ctx: &Context<'_>, _p: &[u8], now: u64) -> Result<Outcome, DispatchError> {
    log_warn!(ctx.log, ms_to_us(now), "dispatch: FLSH, entering bootloader");
    Ok(Outcome::Reboot(BootMode::Bootloader))
}

fn cmd_reset_dfu(ctx: &Context<'_>, _p: &[u8], now: u64) -> Result<Outcome, DispatchError> {
    log_warn!(ctx.log, ms_to_us(now), "dispatch: RSTD, entering bootloader");
    Ok(Outcome::Reboot(BootMode::BootloaderSkipTimeout))
}

fn read_f32(p: &[u8]) -> f32 {
    f32::from_le_bytes([p[0], p[1], p[2], p[3]])
}

fn cmd_tuner(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    ctx.system.set_tuner_hz(read_f32(p));
    Ok(Outcome::Applied)
}

fn cmd_load(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    ctx.system.set_dsp_load(read_f32(p));
    Ok(Outcome::Applied)
}

/// New list length after an entry: 0 on clear, else grown to cover `index`.
fn list_len(current: u8, index: u8) -> u8 {
    if index == LIST_CLEAR {
        0
    } else {
        current.max(index + 1)
    }
}

fn cmd_model_list(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let sys = ctx.system;
    sys.set_models_available(list_len(sys.models_available(), p[0]));
    Ok(Outcome::Applied)
}

fn cmd_ir_list(ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let sys = ctx.system;
    sys.set_irs_available(list_len(sys.irs_available(), p[0]));
    Ok(Outcome::Applied)
}

fn cmd_ir_data(_ctx: &Context<'_>, p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    let mut packet = [0u8; IR_PACKET_LEN];
    packet.copy_from_slice(&p[..IR_PACKET_LEN]);
    Ok(Outcome::IrChunk(packet))
}

fn cmd_ir_end(_ctx: &Context<'_>, _p: &[u8], _now: u64) -> Result<Outcome, DispatchError> {
    Ok(Outcome::IrComplete)
}
