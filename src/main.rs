//! JamMate control core - firmware entry point.
//!
//! 1. Open NVS (falls back to RAM presets if it is unusable)
//! 2. Bring up the DSP UART and the log UART
//! 3. Load the boot preset
//! 4. Single cooperative loop: UART bytes ─▶ receiver, controller poll, log drain
//!
//! The loop runs on its own thread: the controller carries the IR upload
//! buffer, which does not fit the default main task stack.

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::hal::delay::{FreeRtos, NON_BLOCK};
    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::uart::{self, UartDriver, UartTxDriver};
    use esp_idf_svc::hal::units::Hertz;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys;

    use jammate_core::audio::{EffectChain, ParamQueue};
    use jammate_core::ble::{BleChannel, BleLink, DisabledGatt};
    use jammate_core::config::nvs::{NvsError, NvsPresetStore};
    use jammate_core::config::{LinkConfig, CONFIG};
    use jammate_core::controller::{Controller, Platform};
    use jammate_core::dispatch::{Context, Dispatcher};
    use jammate_core::log_globals::{MAIN_LOG_STREAM, RX_LOG_STREAM};
    use jammate_core::logging::ms_to_us;
    use jammate_core::preset::{Preset, PresetError, PresetSlot, PresetStore, RamPresetStore, SharedPreset};
    use jammate_core::protocol::{FrameReceiver, FrameTransmitter, SerialQueue, TxSlot, TxStart, UartTx};
    use jammate_core::stats::{LinkFault, LinkStats};
    use jammate_core::system::{BootMode, SequencerRow, SystemState};
    use jammate_core::uart_logger::{init_uart_logger, LogDrain, UartLoggerConfig};
    use jammate_core::{log_error, log_info, log_warn};

    static SERIAL_QUEUE: SerialQueue = SerialQueue::new();
    static LINK_STATS: LinkStats = LinkStats::new();
    static TX_SLOT: TxSlot = TxSlot::new();
    static PRESET: SharedPreset = SharedPreset::new();
    static SYSTEM: SystemState = SystemState::new();
    static PARAMS: ParamQueue = ParamQueue::new();
    static BLE_LINK: BleLink = BleLink::new();

    /// SD card mount point.
    const SD_ROOT: &str = "/sdcard";
    const MODEL_DIR: &str = "/sdcard/NAM";
    const MAX_MODELS: usize = 64;
    const IR_DIR: &str = "/sdcard/IR";
    const USER_IR: &str = "/sdcard/IR/user.ir";

    /// Control loop thread stack.
    pub const CONTROL_STACK: usize = 64 * 1024;

    fn now_ms() -> u64 {
        let us = unsafe { sys::esp_timer_get_time() };
        u64::try_from(us / 1000).unwrap_or(0)
    }

    /// DSP link TX half. `write` copies into the driver ring buffer, so every
    /// frame completes immediately.
    struct DspUart<'d>(UartTxDriver<'d>);

    impl UartTx for DspUart<'_> {
        fn start_write(&mut self, frame: &[u8]) -> Result<TxStart, LinkFault> {
            self.0.write(frame).map(|_| TxStart::Complete).map_err(|_| LinkFault::Driver)
        }
    }

    /// NVS when available, RAM otherwise.
    enum BoardStore {
        Nvs(NvsPresetStore),
        Ram(RamPresetStore),
    }

    impl PresetStore for BoardStore {
        fn load(&mut self, slot: PresetSlot) -> Result<Preset, PresetError> {
            match self {
                Self::Nvs(store) => store.load(slot),
                Self::Ram(store) => store.load(slot),
            }
        }

        fn save(&mut self, preset: &Preset) -> Result<(), PresetError> {
            match self {
                Self::Nvs(store) => store.save(preset),
                Self::Ram(store) => store.save(preset),
            }
        }
    }

    struct Board {
        models: heapless::Vec<heapless::String<64>, MAX_MODELS>,
    }

    impl Board {
        fn scan_models() -> Self {
            let mut models = heapless::Vec::new();
            if let Ok(dir) = std::fs::read_dir(MODEL_DIR) {
                let mut names: Vec<String> = dir
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|n| n.ends_with(".nam"))
                    .collect();
                names.sort();
                for name in names.iter().take(MAX_MODELS) {
                    let mut s = heapless::String::new();
                    if s.push_str(name).is_ok() {
                        let _ = models.push(s);
                    }
                }
            }
            Self { models }
        }
    }

    impl Platform for Board {
        fn reboot(&mut self, mode: BootMode) {
            if mode == BootMode::Bootloader {
                force_download_boot();
            }
            unsafe { sys::esp_restart() };
        }

        fn load_model(&mut self, index: u8) -> bool {
            self.models
                .get(usize::from(index))
                .map(|name| std::fs::metadata(format!("{MODEL_DIR}/{name}")).is_ok())
                .unwrap_or(false)
        }

        fn load_drum_pattern(&mut self, path: &str) -> bool {
            let local = path.strip_prefix("0:").unwrap_or(path);
            std::fs::metadata(format!("{SD_ROOT}{local}")).is_ok()
        }

        fn model_name(&self, index: u8) -> Option<&str> {
            self.models.get(usize::from(index)).map(|s| s.as_str())
        }

        fn load_ir(&mut self, points: &[f32]) -> bool {
            let bytes: Vec<u8> = points.iter().flat_map(|p| p.to_le_bytes()).collect();
            std::fs::create_dir_all(IR_DIR).is_ok() && std::fs::write(USER_IR, bytes).is_ok()
        }

        // The step grid stays in SYSTEM; the drum engine reads it from there.
        fn set_sequencer_row(&mut self, row: u8, steps: &SequencerRow) {
            log_info!(&MAIN_LOG_STREAM, ms_to_us(now_ms()), "seq: row {} {:?}", row, steps);
        }
    }

    /// Latch the ROM into download mode for the next reset.
    #[cfg(feature = "esp32s3")]
    fn force_download_boot() {
        const RTC_CNTL_OPTION1_REG: usize = 0x6000_8128;
        const RTC_CNTL_FORCE_DOWNLOAD_BOOT: u32 = 1;
        unsafe { core::ptr::write_volatile(RTC_CNTL_OPTION1_REG as *mut u32, RTC_CNTL_FORCE_DOWNLOAD_BOOT) };
    }

    #[cfg(not(feature = "esp32s3"))]
    fn force_download_boot() {}

    fn open_store(now: u64) -> BoardStore {
        let opened = EspDefaultNvsPartition::take()
            .map_err(NvsError::from)
            .and_then(NvsPresetStore::open);
        match opened {
            Ok((store, migration)) => {
                log_info!(&MAIN_LOG_STREAM, ms_to_us(now), "nvs: presets ready ({:?})", migration);
                BoardStore::Nvs(store)
            }
            Err(e) => {
                log_error!(&MAIN_LOG_STREAM, ms_to_us(now), "nvs: {}, presets kept in RAM", e);
                BoardStore::Ram(RamPresetStore::new())
            }
        }
    }

    pub fn run() -> ! {
        let Ok(peripherals) = Peripherals::take() else {
            loop {
                FreeRtos::delay_ms(1000);
            }
        };
        let pins = peripherals.pins;

        let mut log_sink = init_uart_logger(peripherals.uart1, pins.gpio43, &UartLoggerConfig::default()).ok();
        let mut drain = LogDrain::new(&RX_LOG_STREAM, &MAIN_LOG_STREAM);

        let link = LinkConfig::DEFAULT;
        let uart_config = uart::config::Config::default().baudrate(Hertz(link.baud_rate));
        let dsp = UartDriver::new(
            peripherals.uart2,
            pins.gpio17,
            pins.gpio18,
            Option::<gpio::AnyIOPin>::None,
            Option::<gpio::AnyIOPin>::None,
            &uart_config,
        );
        let dsp = match dsp {
            Ok(dsp) => dsp,
            Err(e) => {
                log_error!(&MAIN_LOG_STREAM, ms_to_us(now_ms()), "uart: init failed: {}", e);
                loop {
                    if let Some(sink) = log_sink.as_mut() {
                        drain.drain_once(sink, ms_to_us(now_ms()));
                    }
                    FreeRtos::delay_ms(1000);
                }
            }
        };
        let (dsp_tx, dsp_rx) = dsp.into_split();

        let mut receiver = FrameReceiver::new(&SERIAL_QUEUE, &LINK_STATS, &CONFIG, &RX_LOG_STREAM);
        let mut tx = FrameTransmitter::new(DspUart(dsp_tx), &TX_SLOT, &LINK_STATS);
        // This board has no GATT binding: the app link is off and control is UART only.
        let mut ble = BleChannel::new(&BLE_LINK, &CONFIG, DisabledGatt, FreeRtos);
        if let Err(e) = ble.begin() {
            log_warn!(&MAIN_LOG_STREAM, ms_to_us(now_ms()), "ble: {}, commands over UART only", e);
        }

        let board = Board::scan_models();
        SYSTEM.set_models_available(board.models.len() as u8);

        let ctx = Context {
            preset: &PRESET,
            system: &SYSTEM,
            params: &PARAMS,
            stats: &LINK_STATS,
            log: &MAIN_LOG_STREAM,
        };
        let store = open_store(now_ms());
        let mut controller = Controller::new(Dispatcher::new(ctx), &SERIAL_QUEUE, store, board);

        let boot = PresetSlot::default();
        let _ = controller.load_preset(boot, now_ms());

        // Effects are registered by the DSP build; here the chain only keeps
        // the parameter queue moving.
        let mut chain = EffectChain::new(&PRESET, &SYSTEM, &PARAMS);

        let mut rx_buf = [0u8; 64];
        loop {
            let now = now_ms();

            match dsp_rx.read(&mut rx_buf, NON_BLOCK) {
                Ok(n) => {
                    receiver.feed_slice(&rx_buf[..n], now);
                }
                Err(_) => receiver.on_error(LinkFault::Driver, now),
            }
            receiver.check_watchdog(now);

            controller.poll(now, &mut tx, &mut ble);

            chain.drain_updates();

            if let Some(sink) = log_sink.as_mut() {
                drain.drain_once(sink, ms_to_us(now));
            }
            FreeRtos::delay_ms(1);
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();

    let control = std::thread::Builder::new()
        .name("control".into())
        .stack_size(firmware::CONTROL_STACK)
        .spawn(|| {
            firmware::run();
        });
    match control {
        Ok(handle) => {
            let _ = handle.join();
        }
        Err(e) => println!("jammate: control thread: {e}"),
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    println!("jammate: firmware entry point; build for target_os = \"espidf\"");
}
