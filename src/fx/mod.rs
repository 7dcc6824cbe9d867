//! Effect slots: layout table and parameter codec.

pub mod layout;
pub mod params;

pub use layout::{
    layout_for_tag, Dropdown, FxId, FxLayout, FX_COUNT, FX_LAYOUTS, MAX_DROPDOWNS, MAX_FLAT_LEN,
    MAX_KNOBS, PRESET_FX_COUNT,
};
pub use params::{EffectParams, FlatParams, ParamError, ParamUpdate};
