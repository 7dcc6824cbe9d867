//! UI reconciler tests

use jammate_core::fx::{EffectParams, FxId};
use jammate_core::preset::{Preset, PresetSlot, SharedPreset};
use jammate_core::ui::{Redraw, UiSync, WIDGET_BPM, WIDGET_FX_BASE, WIDGET_VOLUME};

fn primed(preset: &SharedPreset) -> UiSync {
    let mut ui = UiSync::new(preset);
    assert_eq!(ui.tick(preset, true), Redraw::FULL);
    ui
}

fn toggle(preset: &SharedPreset, fx: FxId, on: bool) {
    let mut p = preset.params(fx);
    p.enabled = on;
    preset.set_params(fx, &p);
}

#[test]
fn test_no_change_no_redraw() {
    let preset = SharedPreset::new();
    let mut ui = primed(&preset);
    for _ in 0..3 {
        assert!(ui.tick(&preset, true).is_empty());
    }
}

#[test]
fn test_effect_toggle_redraws_one_button() {
    let preset = SharedPreset::new();
    let mut ui = primed(&preset);

    toggle(&preset, FxId::Delay, true);
    let redraw = ui.tick(&preset, true);
    assert!(!redraw.full);
    assert!(redraw.fx_changed(FxId::Delay));
    assert!(!redraw.fx_changed(FxId::Reverb));
    assert_eq!(
        redraw.widgets().collect::<Vec<_>>(),
        vec![WIDGET_FX_BASE + FxId::Delay.index() as u8]
    );
    assert!(ui.is_enabled(FxId::Delay));

    // Knob changes alone are not shown on the main screen.
    let mut p = preset.params(FxId::Delay);
    p.knobs[0] = 99;
    preset.set_params(FxId::Delay, &p);
    assert!(ui.tick(&preset, true).is_empty());
}

#[test]
fn test_volume_and_bpm_widgets() {
    let preset = SharedPreset::new();
    let mut ui = primed(&preset);

    preset.set_master_volume(30);
    preset.set_bpm(90);
    let redraw = ui.tick(&preset, true);
    assert_eq!(redraw.widgets().collect::<Vec<_>>(), vec![WIDGET_VOLUME, WIDGET_BPM]);
    assert_eq!(ui.volume(), 30);
    assert_eq!(ui.bpm(), 90);
}

#[test]
fn test_slot_change_forces_full_redraw() {
    let preset = SharedPreset::new();
    let mut ui = primed(&preset);

    let mut next = Preset::blank(PresetSlot::new(3, 2).unwrap());
    next.effects[FxId::Gate.index()] = EffectParams {
        enabled: true,
        ..Default::default()
    };
    preset.apply(&next).unwrap();

    assert_eq!(ui.tick(&preset, true), Redraw::FULL);
    assert_eq!(ui.label().as_str(), "DISTORT-3");
    assert!(ui.tick(&preset, true).is_empty());
}

#[test]
fn test_hidden_menu_defers_changes() {
    let preset = SharedPreset::new();
    let mut ui = primed(&preset);

    toggle(&preset, FxId::Comp, true);
    assert!(ui.tick(&preset, false).is_empty());

    // Change is still pending once visible again.
    let redraw = ui.tick(&preset, true);
    assert!(redraw.fx_changed(FxId::Comp));
}

#[test]
fn test_invalidate() {
    let preset = SharedPreset::new();
    let mut ui = primed(&preset);
    ui.invalidate();
    assert_eq!(ui.tick(&preset, true), Redraw::FULL);
}
