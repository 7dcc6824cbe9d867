//! Effect chain integration tests

use core::sync::atomic::Ordering;

use jammate_core::audio::{Effect, EffectChain, ParamQueue};
use jammate_core::fx::{EffectParams, FxId, ParamUpdate};
use jammate_core::preset::SharedPreset;
use jammate_core::system::SystemState;

/// Scales by a fixed factor and remembers the last parameter block.
struct Scale {
    factor: f32,
    last_params: Vec<u8>,
    updates: usize,
    resets: usize,
}

impl Scale {
    fn new(factor: f32) -> Self {
        Self {
            factor,
            last_params: Vec::new(),
            updates: 0,
            resets: 0,
        }
    }
}

impl Effect for Scale {
    fn update_param(&mut self, params: &[u8]) {
        self.last_params = params.to_vec();
        self.updates += 1;
    }

    fn process_block(&mut self, block: &mut [f32]) {
        for s in block.iter_mut() {
            *s *= self.factor;
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

fn enabled(knob: u8) -> EffectParams {
    let mut p = EffectParams {
        enabled: true,
        ..Default::default()
    };
    p.knobs[0] = knob;
    p
}

#[test]
fn test_install_pushes_current_params() {
    let preset = SharedPreset::new();
    let system = SystemState::new();
    let queue = ParamQueue::new();
    preset.set_params(FxId::Vibrato, &enabled(33));

    let mut vib = Scale::new(1.0);
    {
        let mut chain = EffectChain::new(&preset, &system, &queue);
        chain.install(FxId::Vibrato, &mut vib);
        assert!(chain.is_installed(FxId::Vibrato));
        assert!(!chain.is_installed(FxId::Chorus));
    }
    assert_eq!(vib.last_params, vec![1, 33, 0, 0]);
}

#[test]
fn test_only_enabled_effects_process() {
    let preset = SharedPreset::new();
    let system = SystemState::new();
    let queue = ParamQueue::new();
    preset.set_params(FxId::Overdrive, &enabled(50));

    let mut ovrd = Scale::new(0.5);
    let mut chor = Scale::new(0.0);
    let mut chain = EffectChain::new(&preset, &system, &queue);
    chain.install(FxId::Overdrive, &mut ovrd);
    chain.install(FxId::Chorus, &mut chor);

    let input = [1.0f32; 8];
    let mut output = [0.0f32; 8];
    chain.process(&input, &mut output);
    assert!(output.iter().all(|&s| s == 0.5));
}

#[test]
fn test_bypass_passes_input_through() {
    let preset = SharedPreset::new();
    let system = SystemState::new();
    let queue = ParamQueue::new();
    preset.set_params(FxId::Overdrive, &enabled(50));
    preset.set_master_volume(10);
    system.bypass.store(true, Ordering::Relaxed);

    let mut ovrd = Scale::new(0.5);
    let mut chain = EffectChain::new(&preset, &system, &queue);
    chain.install(FxId::Overdrive, &mut ovrd);

    let input = [0.25f32; 4];
    let mut output = [0.0f32; 4];
    chain.process(&input, &mut output);
    assert_eq!(output, input);
}

#[test]
fn test_queued_updates_reach_effect_before_block() {
    let preset = SharedPreset::new();
    let system = SystemState::new();
    let queue = ParamQueue::new();

    let mut trem = Scale::new(1.0);
    {
        let mut chain = EffectChain::new(&preset, &system, &queue);
        chain.install(FxId::Tremolo, &mut trem);

        let p = enabled(77);
        queue.enqueue(ParamUpdate::new(FxId::Tremolo, &p)).unwrap();
        queue.enqueue(ParamUpdate::new(FxId::Delay, &p)).unwrap();

        let mut out = [0.0f32; 4];
        chain.process(&[0.0; 4], &mut out);
        assert_eq!(chain.updates_applied(), 2);
        chain.reset();
    }
    assert_eq!(trem.updates, 2);
    assert_eq!(trem.last_params[..2], [1, 77]);
    assert_eq!(trem.resets, 1);
}

#[test]
fn test_mismatched_buffers_truncate() {
    let preset = SharedPreset::new();
    let system = SystemState::new();
    let queue = ParamQueue::new();
    let mut chain = EffectChain::new(&preset, &system, &queue);

    let input = [1.0f32; 8];
    let mut output = [9.0f32; 4];
    chain.process(&input, &mut output);
    assert_eq!(output, [1.0; 4]);
}
