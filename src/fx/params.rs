//! Effect parameter model and the flat wire codec.
//!
//! Flat layout of one effect command, generated from [`FxLayout`]:
//!
//! ```text
//! offset: 0        1 .. K          K+1 .. K+D
//!         enable   knob0..knobK-1  dropdown0..dropdownD-1
//! ```
//!
//! No padding: offsets are only meaningful within one effect's block.

use super::layout::{FxId, FxLayout, MAX_DROPDOWNS, MAX_FLAT_LEN, MAX_KNOBS};

/// Parameter block errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamError {
    /// P01: fewer bytes than `1 + K + D`
    TooShort { expected: usize, got: usize },
    /// P02: dropdown value not below its option count
    DropdownOutOfRange { index: u8, value: u8, options: u16 },
}

impl ParamError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "P01",
            Self::DropdownOutOfRange { .. } => "P02",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "parameter block too short",
            Self::DropdownOutOfRange { .. } => "dropdown value out of range",
        }
    }
}

impl core::fmt::Display for ParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort { expected, got } => {
                write!(f, "{}: {} (need {}, got {})", self.code(), self.message(), expected, got)
            }
            Self::DropdownOutOfRange { index, value, options } => write!(
                f,
                "{}: {} (dropdown {} = {}, {} options)",
                self.code(),
                self.message(),
                index,
                value,
                options
            ),
        }
    }
}

/// State of one effect slot.
///
/// Knob and dropdown arrays are fixed width; entries past the layout's
/// declared counts stay zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectParams {
    pub enabled: bool,
    pub knobs: [u8; MAX_KNOBS],
    pub dropdowns: [u8; MAX_DROPDOWNS],
}

impl EffectParams {
    /// Decode a flat block for `layout`.
    ///
    /// Rejects short blocks and out-of-range dropdowns; clamps knobs to the
    /// layout's scale. Bytes past `1 + K + D` are ignored.
    pub fn from_flat(layout: &FxLayout, flat: &[u8]) -> Result<Self, ParamError> {
        let expected = layout.flat_len();
        if flat.len() < expected {
            return Err(ParamError::TooShort { expected, got: flat.len() });
        }

        let k = layout.knob_count();
        let mut params = EffectParams {
            enabled: flat[0] != 0,
            ..Default::default()
        };
        for (dst, &src) in params.knobs.iter_mut().zip(&flat[1..=k]) {
            *dst = src.min(layout.knob_max);
        }
        for (d, &value) in flat[1 + k..expected].iter().enumerate() {
            check_dropdown(layout, d, value)?;
            params.dropdowns[d] = value;
        }
        Ok(params)
    }

    /// Encode into the flat form for `layout`.
    pub fn to_flat(&self, layout: &FxLayout) -> FlatParams {
        let k = layout.knob_count();
        let d = layout.dropdown_count();
        let mut flat = FlatParams {
            len: layout.flat_len() as u8,
            bytes: [0; MAX_FLAT_LEN],
        };
        flat.bytes[0] = u8::from(self.enabled);
        flat.bytes[1..=k].copy_from_slice(&self.knobs[..k]);
        flat.bytes[1 + k..1 + k + d].copy_from_slice(&self.dropdowns[..d]);
        flat
    }

    /// Check dropdowns against their option counts. Undeclared slots are not inspected.
    pub fn validate(&self, layout: &FxLayout) -> Result<(), ParamError> {
        for (d, &value) in self.dropdowns[..layout.dropdown_count()].iter().enumerate() {
            check_dropdown(layout, d, value)?;
        }
        Ok(())
    }

    /// Copy with undeclared slots zeroed and knobs clamped.
    pub fn normalized(&self, layout: &FxLayout) -> Self {
        let mut out = EffectParams {
            enabled: self.enabled,
            ..Default::default()
        };
        for (dst, &src) in out.knobs.iter_mut().zip(&self.knobs[..layout.knob_count()]) {
            *dst = src.min(layout.knob_max);
        }
        let d = layout.dropdown_count();
        out.dropdowns[..d].copy_from_slice(&self.dropdowns[..d]);
        out
    }
}

fn check_dropdown(layout: &FxLayout, d: usize, value: u8) -> Result<(), ParamError> {
    let options = layout.option_count(d);
    if usize::from(value) >= options {
        return Err(ParamError::DropdownOutOfRange {
            index: d as u8,
            value,
            options: options as u16,
        });
    }
    Ok(())
}

/// Flat parameter block, as forwarded to the DSP.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlatParams {
    len: u8,
    bytes: [u8; MAX_FLAT_LEN],
}

impl FlatParams {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl core::fmt::Debug for FlatParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// One parameter update on its way to the audio domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamUpdate {
    pub fx: FxId,
    pub flat: FlatParams,
}

impl ParamUpdate {
    pub fn new(fx: FxId, params: &EffectParams) -> Self {
        Self {
            fx,
            flat: params.to_flat(fx.layout()),
        }
    }
}
