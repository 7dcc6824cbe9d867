//! Cooperative main loop.
//!
//! ```text
//! SerialQueue ─┐                       ┌─▶ PresetStore (load/save)
//!              ├─▶ Dispatcher ─▶ Outcome├─▶ BLE ack / model list over UART
//! BLE queue  ──┘                       └─▶ Platform (reboot)
//!
//! then: pending model / drum / sequencer work ─▶ Platform
//!       re-advertise ─▶ BleChannel
//!       UiSync::tick ─▶ Redraw
//! ```
//!
//! Everything slow happens here, outside receive and audio context.

use embedded_hal::delay::DelayNs;

use crate::ble::{BleChannel, GattServer};
use crate::dispatch::{DispatchError, Dispatcher, Outcome};
use crate::ir::IrUpload;
use crate::logging::{ms_to_us, LogStream};
use crate::preset::{PresetError, PresetSlot, PresetStore};
use crate::protocol::{FrameTransmitter, SerialQueue, Tag, TxError, UartTx};
use crate::system::{BootMode, SequencerRow};
use crate::ui::{NoticeSlot, Redraw, UiNotice, UiSync};
use crate::{log_error, log_info, log_warn};

/// Board services the controller cannot provide itself.
pub trait Platform {
    /// Restart into the bootloader. Normally does not return.
    fn reboot(&mut self, mode: BootMode);

    /// Load NAM model `index`. `false` on failure.
    fn load_model(&mut self, index: u8) -> bool;

    /// Load a drum groove from `path`. `false` on failure.
    fn load_drum_pattern(&mut self, path: &str) -> bool;

    /// Display name of model `index`, `None` past the last model.
    fn model_name(&self, index: u8) -> Option<&str>;

    /// Hand a completed IR upload to the cabinet convolver. `false` on failure.
    fn load_ir(&mut self, points: &[f32]) -> bool;

    /// Replace one step sequencer row.
    fn set_sequencer_row(&mut self, row: u8, steps: &SequencerRow);
}

/// Model list tag.
pub const NAML: Tag = Tag::new(b"NAML");

/// Highest list index; 255 means "clear".
const MAX_LIST_INDEX: u8 = 254;

/// Streams the model list one frame per poll while the transmitter is idle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelListSender {
    #[default]
    Idle,
    Clear,
    Entry(u8),
}

impl ModelListSender {
    pub fn start(&mut self) {
        *self = Self::Clear;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        *self != Self::Idle
    }

    /// Send at most one frame. Returns `true` if a frame went out.
    pub fn step<T: UartTx, P: Platform>(
        &mut self,
        tx: &mut FrameTransmitter<'_, T>,
        platform: &P,
    ) -> Result<bool, TxError> {
        if !self.is_active() || tx.is_busy() {
            return Ok(false);
        }
        let result = match *self {
            Self::Idle => return Ok(false),
            Self::Clear => tx.send_list_clear(NAML).map(|_| Self::Entry(0)),
            Self::Entry(index) => match platform.model_name(index) {
                Some(name) if index <= MAX_LIST_INDEX => tx
                    .send_list_entry(NAML, index, name)
                    .map(|_| Self::Entry(index.wrapping_add(1))),
                _ => {
                    *self = Self::Idle;
                    return Ok(false);
                }
            },
        };
        match result {
            Ok(next) => {
                *self = next;
                Ok(true)
            }
            // Lost the race for the slot; try again next poll.
            Err(TxError::Busy) => Ok(false),
            Err(e) => {
                *self = Self::Idle;
                Err(e)
            }
        }
    }
}

/// What one [`Controller::poll`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub serial_packets: usize,
    pub ble_packets: usize,
    pub redraw: Redraw,
}

/// Main-loop state.
pub struct Controller<'a, S: PresetStore, P: Platform> {
    dispatcher: Dispatcher<'a>,
    serial: &'a SerialQueue,
    store: S,
    platform: P,
    ui: UiSync,
    notices: NoticeSlot,
    models: ModelListSender,
    ir: IrUpload,
    ui_visible: bool,
}

impl<'a, S: PresetStore, P: Platform> Controller<'a, S, P> {
    pub fn new(dispatcher: Dispatcher<'a>, serial: &'a SerialQueue, store: S, platform: P) -> Self {
        let ui = UiSync::new(dispatcher.context().preset);
        Self {
            dispatcher,
            serial,
            store,
            platform,
            ui,
            notices: NoticeSlot::new(),
            models: ModelListSender::Idle,
            ir: IrUpload::new(),
            ui_visible: true,
        }
    }

    fn log(&self) -> &'a LogStream {
        self.dispatcher.context().log
    }

    /// Load `slot` from the store and make it live.
    pub fn load_preset(&mut self, slot: PresetSlot, now_ms: u64) -> Result<(), PresetError> {
        let loaded = self
            .store
            .load(slot)
            .and_then(|preset| self.dispatcher.apply_preset(&preset));
        match loaded {
            Ok(()) => {
                log_info!(self.log(), ms_to_us(now_ms), "ctrl: preset {} loaded", slot.label());
                self.notices.post(UiNotice::PresetLoaded(slot));
                Ok(())
            }
            Err(e) => {
                log_error!(self.log(), ms_to_us(now_ms), "ctrl: load {} failed: {}", slot.label(), e);
                self.notices.post(UiNotice::InvalidPreset(e));
                Err(e)
            }
        }
    }

    /// One pass of the main loop.
    pub fn poll<T, G, D>(
        &mut self,
        now_ms: u64,
        tx: &mut FrameTransmitter<'_, T>,
        ble: &mut BleChannel<'_, G, D>,
    ) -> PollReport
    where
        T: UartTx,
        G: GattServer,
        D: DelayNs,
    {
        let mut report = PollReport::default();

        while let Some(packet) = self.serial.pop() {
            report.serial_packets += 1;
            let result = self.dispatcher.dispatch(packet.as_slice(), now_ms);
            self.handle(result, now_ms, ble);
        }
        let link = ble.link();
        while let Some(packet) = link.queue().pop() {
            report.ble_packets += 1;
            let result = self.dispatcher.dispatch(packet.as_slice(), now_ms);
            self.handle(result, now_ms, ble);
        }

        self.run_pending_loads(now_ms);

        if let Err(e) = self.models.step(tx, &self.platform) {
            log_warn!(self.log(), ms_to_us(now_ms), "ctrl: model list aborted: {}", e);
        }
        if let Err(e) = ble.poll(now_ms) {
            log_warn!(self.log(), ms_to_us(now_ms), "ctrl: re-advertise failed: {}", e);
        }

        report.redraw = self.ui.tick(self.dispatcher.context().preset, self.ui_visible);
        report
    }

    fn handle<G: GattServer, D: DelayNs>(
        &mut self,
        result: Result<Outcome, DispatchError>,
        now_ms: u64,
        ble: &mut BleChannel<'_, G, D>,
    ) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(DispatchError::Preset(e)) if e.is_invalid_data() => {
                self.notices.post(UiNotice::InvalidPreset(e));
                return;
            }
            // Already counted and logged by the dispatcher.
            Err(_) => return,
        };

        match outcome {
            Outcome::Applied => {}
            Outcome::LoadPreset(slot) => {
                let _ = self.load_preset(slot, now_ms);
            }
            Outcome::PresetReceived(preset) => match self.store.save(&preset) {
                Ok(()) => {
                    if let Ok(slot) = preset.slot() {
                        self.notices.post(UiNotice::PresetSaved(slot));
                    }
                    if let Err(e) = ble.send_ack() {
                        log_warn!(self.log(), ms_to_us(now_ms), "ctrl: ack failed: {}", e);
                    }
                }
                Err(e) => {
                    log_warn!(self.log(), ms_to_us(now_ms), "ctrl: preset not saved: {}", e);
                    self.notices.post(UiNotice::SaveFailed(e));
                }
            },
            Outcome::SendModelList => self.models.start(),
            Outcome::Reboot(mode) => {
                log_warn!(self.log(), ms_to_us(now_ms), "ctrl: reboot {:?}", mode);
                self.platform.reboot(mode);
            }
            Outcome::IrChunk(packet) => {
                self.ir.push_packet(&packet);
            }
            Outcome::IrComplete => self.finish_ir(now_ms),
        }
    }

    fn finish_ir(&mut self, now_ms: u64) {
        let points = self.ir.len();
        if self.ir.overflow() > 0 {
            log_warn!(
                self.log(),
                ms_to_us(now_ms),
                "ctrl: IR truncated, {} points dropped",
                self.ir.overflow()
            );
        }
        if points == 0 {
            log_warn!(self.log(), ms_to_us(now_ms), "ctrl: empty IR upload");
        } else if self.platform.load_ir(self.ir.points()) {
            log_info!(self.log(), ms_to_us(now_ms), "ctrl: IR loaded, {} points", points);
            self.notices.post(UiNotice::IrLoaded(points as u16));
        } else {
            log_error!(self.log(), ms_to_us(now_ms), "ctrl: IR load failed");
        }
        self.ir.clear();
    }

    fn run_pending_loads(&mut self, now_ms: u64) {
        let system = self.dispatcher.context().system;

        if let Some(index) = system.take_pending_model() {
            if self.platform.load_model(index) {
                system.set_active_model(index);
                log_info!(self.log(), ms_to_us(now_ms), "ctrl: NAM model {} loaded", index);
            } else {
                log_error!(self.log(), ms_to_us(now_ms), "ctrl: NAM model {} failed", index);
            }
        }

        if let Some(drum) = system.take_drum_load() {
            let path = drum.path();
            if !self.platform.load_drum_pattern(&path) {
                log_error!(self.log(), ms_to_us(now_ms), "ctrl: drum load {} failed", path);
            }
        }

        while let Some((row, steps)) = system.take_sequencer_row() {
            self.platform.set_sequencer_row(row, &steps);
        }
    }

    /// Main menu visibility; the reconciler idles while hidden.
    pub fn set_ui_visible(&mut self, visible: bool) {
        if visible && !self.ui_visible {
            self.ui.invalidate();
        }
        self.ui_visible = visible;
    }

    pub fn take_notice(&mut self) -> Option<UiNotice> {
        self.notices.take()
    }

    pub fn ui(&self) -> &UiSync {
        &self.ui
    }

    pub fn dispatcher(&self) -> &Dispatcher<'a> {
        &self.dispatcher
    }

    /// IR points received since the last `IREN`.
    pub fn ir_pending(&self) -> usize {
        self.ir.len()
    }

    pub fn model_list(&self) -> ModelListSender {
        self.models
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}
