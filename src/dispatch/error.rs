//! Dispatcher error types

use crate::fx::{FxId, ParamError};
use crate::preset::PresetError;
use crate::protocol::Tag;

/// Why a payload was not applied. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// D01: payload shorter than a tag
    NoTag { len: usize },
    /// D02: tag not in the command table
    UnknownTag(Tag),
    /// D03: fewer parameter bytes than the command needs
    TooShort { tag: Tag, expected: usize, got: usize },
    /// D04: effect parameters violate the layout
    BadParams { fx: FxId, error: ParamError },
    /// D05: a field holds a value the command does not define
    BadValue { tag: Tag, offset: usize, value: u8 },
    /// D06: preset blob or preset slot rejected
    Preset(PresetError),
}

impl DispatchError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoTag { .. } => "D01",
            Self::UnknownTag(_) => "D02",
            Self::TooShort { .. } => "D03",
            Self::BadParams { .. } => "D04",
            Self::BadValue { .. } => "D05",
            Self::Preset(_) => "D06",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoTag { .. } => "payload too short for a tag",
            Self::UnknownTag(_) => "unknown tag",
            Self::TooShort { .. } => "payload too short",
            Self::BadParams { .. } => "invalid effect parameters",
            Self::BadValue { .. } => "invalid field value",
            Self::Preset(_) => "preset rejected",
        }
    }
}

impl From<PresetError> for DispatchError {
    fn from(e: PresetError) -> Self {
        Self::Preset(e)
    }
}

impl core::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoTag { len } => write!(f, "{}: {} ({} bytes)", self.code(), self.message(), len),
            Self::UnknownTag(tag) => write!(f, "{}: {} '{}'", self.code(), self.message(), tag),
            Self::TooShort { tag, expected, got } => write!(
                f,
                "{}: {} ({} needs {}, got {})",
                self.code(),
                self.message(),
                tag,
                expected,
                got
            ),
            Self::BadParams { fx, error } => {
                write!(f, "{}: {} ({}: {})", self.code(), self.message(), fx.tag(), error)
            }
            Self::BadValue { tag, offset, value } => write!(
                f,
                "{}: {} ({}[{}] = {})",
                self.code(),
                self.message(),
                tag,
                offset,
                value
            ),
            Self::Preset(e) => write!(f, "{}: {} ({})", self.code(), self.message(), e),
        }
    }
}
