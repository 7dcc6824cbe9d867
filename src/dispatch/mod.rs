//! Tag dispatcher.
//!
//! Serial frames and BLE writes both end up here as `[tag(4)][params…]`.
//!
//! ```text
//! payload ──▶ preset blob? ──yes──▶ decode all-or-nothing ──▶ SharedPreset + DSP queue
//!               │no
//!               ▼
//!         4-byte lookup ──miss──▶ 4-byte alias ──miss──▶ 2-byte alias ──miss──▶ unknown
//!               │hit
//!               ▼
//!        length check ──▶ handler ──▶ SharedPreset / SystemState / DSP queue
//! ```
//!
//! Handlers never block. Anything slow (file loads, flash writes, reboots,
//! list transfers) is returned as an [`Outcome`] or left as a pending flag in
//! [`SystemState`] for the controller.

mod commands;
mod error;

pub use commands::{CommandDescriptor, Handler, COMMANDS, SHORT_ALIASES, TAG_ALIASES};
pub use error::DispatchError;

use heapless::FnvIndexMap;

use crate::audio::ParamQueue;
use crate::fx::{EffectParams, FxId, ParamUpdate, FX_LAYOUTS, PRESET_FX_COUNT};
use crate::ir::IR_PACKET_LEN;
use crate::logging::{ms_to_us, LogStream};
use crate::preset::{Preset, PresetBinary, PresetError, PresetSlot, SharedPreset, PRESET_VERSION};
use crate::protocol::{Tag, TAG_LEN};
use crate::stats::LinkStats;
use crate::system::{BootMode, SystemState};
use crate::{log_debug, log_info, log_warn};

/// Route table capacity (power of two).
pub const ROUTE_CAPACITY: usize = 64;

/// What the controller must do after a successful dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State updated; nothing else to do.
    Applied,
    /// Switch to another stored preset.
    LoadPreset(PresetSlot),
    /// A full preset arrived and is now live; persist and acknowledge it.
    PresetReceived(Preset),
    /// Peer asked for the NAM model list.
    SendModelList,
    /// Reboot into the bootloader.
    Reboot(BootMode),
    /// Three little-endian `f32` IR points for the upload in progress.
    IrChunk([u8; IR_PACKET_LEN]),
    /// IR upload finished.
    IrComplete,
}

/// Where a tag goes.
#[derive(Clone, Copy)]
pub enum Route {
    Effect(FxId),
    System(&'static CommandDescriptor),
}

/// Shared state a handler may touch.
pub struct Context<'a> {
    pub preset: &'a SharedPreset,
    pub system: &'a SystemState,
    pub params: &'a ParamQueue,
    pub stats: &'a LinkStats,
    pub log: &'a LogStream,
}

impl Context<'_> {
    /// Forward one effect's state to the audio domain.
    pub fn forward(&self, fx: FxId, params: &EffectParams) -> bool {
        if self.params.enqueue(ParamUpdate::new(fx, params)).is_err() {
            self.stats.record_param_drop();
            return false;
        }
        true
    }
}

pub struct Dispatcher<'a> {
    ctx: Context<'a>,
    routes: FnvIndexMap<Tag, Route, ROUTE_CAPACITY>,
}

const _: () = assert!(commands::COMMAND_COUNT + crate::fx::FX_COUNT <= ROUTE_CAPACITY);

impl<'a> Dispatcher<'a> {
    /// Build the route map from the effect layouts and the system command table.
    pub fn new(ctx: Context<'a>) -> Self {
        let mut routes = FnvIndexMap::new();
        for layout in FX_LAYOUTS.iter() {
            let _ = routes.insert(layout.tag, Route::Effect(layout.id));
        }
        for cmd in COMMANDS {
            let _ = routes.insert(cmd.tag, Route::System(cmd));
        }
        Self { ctx, routes }
    }

    #[inline]
    pub fn context(&self) -> &Context<'a> {
        &self.ctx
    }

    /// Resolve a tag, aliases included.
    pub fn route(&self, tag: Tag) -> Option<Route> {
        if let Some(route) = self.routes.get(&tag) {
            return Some(*route);
        }
        let target = TAG_ALIASES
            .iter()
            .find(|(alias, _)| *alias == tag)
            .map(|(_, target)| *target)
            .or_else(|| {
                SHORT_ALIASES
                    .iter()
                    .find(|(prefix, _)| *prefix == tag.prefix2())
                    .map(|(_, target)| *target)
            })?;
        self.routes.get(&target).copied()
    }

    /// Apply one payload.
    pub fn dispatch(&self, payload: &[u8], now_ms: u64) -> Result<Outcome, DispatchError> {
        let result = self.dispatch_inner(payload, now_ms);
        match &result {
            Ok(_) => self.ctx.stats.record_applied(),
            Err(DispatchError::UnknownTag(tag)) => {
                self.ctx.stats.record_unknown_tag();
                log_warn!(self.ctx.log, ms_to_us(now_ms), "dispatch: unknown tag '{}'", tag);
            }
            Err(e) => {
                self.ctx.stats.record_rejected();
                log_warn!(self.ctx.log, ms_to_us(now_ms), "dispatch: {}", e);
            }
        }
        result
    }

    fn dispatch_inner(&self, payload: &[u8], now_ms: u64) -> Result<Outcome, DispatchError> {
        if PresetBinary::looks_like(payload) {
            return self.apply_preset_blob(payload, now_ms);
        }

        let tag = Tag::from_payload(payload).ok_or(DispatchError::NoTag { len: payload.len() })?;
        let route = self.route(tag).ok_or(DispatchError::UnknownTag(tag))?;
        let params = &payload[TAG_LEN..];

        match route {
            Route::Effect(fx) => self.apply_effect(fx, params, now_ms),
            Route::System(cmd) => {
                if params.len() < cmd.min_len {
                    return Err(DispatchError::TooShort {
                        tag,
                        expected: cmd.min_len,
                        got: params.len(),
                    });
                }
                (cmd.handler)(&self.ctx, params, now_ms)
            }
        }
    }

    fn apply_effect(&self, fx: FxId, params: &[u8], now_ms: u64) -> Result<Outcome, DispatchError> {
        let layout = fx.layout();
        let expected = layout.flat_len();
        if params.len() < expected {
            return Err(DispatchError::TooShort {
                tag: layout.tag,
                expected,
                got: params.len(),
            });
        }
        let decoded = EffectParams::from_flat(layout, params)
            .map_err(|error| DispatchError::BadParams { fx, error })?;

        self.ctx.preset.set_params(fx, &decoded);
        if !self.ctx.forward(fx, &decoded) {
            log_warn!(self.ctx.log, ms_to_us(now_ms), "dispatch: DSP queue full, {} dropped", layout.tag);
        }

        if fx == FxId::Nam {
            self.check_model(decoded.dropdowns[0], now_ms);
        }
        Ok(Outcome::Applied)
    }

    fn check_model(&self, index: u8, now_ms: u64) {
        let system = self.ctx.system;
        if system.request_model(index) {
            log_info!(self.ctx.log, ms_to_us(now_ms), "dispatch: NAM model {} queued", index);
        } else if index >= system.models_available() {
            log_warn!(
                self.ctx.log,
                ms_to_us(now_ms),
                "dispatch: NAM index {} out of bounds (max {})",
                index,
                system.models_available()
            );
        }
    }

    /// Make `preset` live and push every effect to the audio domain.
    pub fn apply_preset(&self, preset: &Preset) -> Result<(), PresetError> {
        self.ctx.preset.apply(preset)?;
        for fx in FxId::ALL[..PRESET_FX_COUNT].iter() {
            self.ctx.forward(*fx, &self.ctx.preset.params(*fx));
        }
        Ok(())
    }

    fn apply_preset_blob(&self, payload: &[u8], now_ms: u64) -> Result<Outcome, DispatchError> {
        let blob = PresetBinary::from_bytes(payload)?;
        if blob.version() != PRESET_VERSION {
            log_warn!(
                self.ctx.log,
                ms_to_us(now_ms),
                "dispatch: preset version {:#04x}, expected {:#04x}",
                blob.version(),
                PRESET_VERSION
            );
        }
        let preset = blob.decode()?;
        self.apply_preset(&preset)?;
        log_debug!(
            self.ctx.log,
            ms_to_us(now_ms),
            "dispatch: preset '{}' {}/{} applied",
            preset.name,
            preset.bank,
            preset.number
        );
        Ok(Outcome::PresetReceived(preset))
    }
}
