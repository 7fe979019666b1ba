//! Native severity values.

use std::fmt;

use magick_ffi_common::abi::severity as raw;
use serde::{Deserialize, Serialize};

/// Severity reported by the native library.
///
/// The numeric value is kept as reported, including values this binding has
/// no name for. Values in `300..400` are warnings, `400..700` errors and
/// `700` and above fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(pub u32);

impl Severity {
    pub const UNDEFINED: Self = Self(raw::UNDEFINED);
    pub const WARNING: Self = Self(raw::WARNING);
    pub const RESOURCE_LIMIT_WARNING: Self = Self(raw::RESOURCE_LIMIT_WARNING);
    pub const OPTION_WARNING: Self = Self(raw::OPTION_WARNING);
    pub const MISSING_DELEGATE_WARNING: Self = Self(raw::MISSING_DELEGATE_WARNING);
    pub const CORRUPT_IMAGE_WARNING: Self = Self(raw::CORRUPT_IMAGE_WARNING);
    pub const BLOB_WARNING: Self = Self(raw::BLOB_WARNING);
    pub const CACHE_WARNING: Self = Self(raw::CACHE_WARNING);
    pub const CODER_WARNING: Self = Self(raw::CODER_WARNING);
    pub const ERROR: Self = Self(raw::ERROR);
    pub const RESOURCE_LIMIT_ERROR: Self = Self(raw::RESOURCE_LIMIT_ERROR);
    pub const OPTION_ERROR: Self = Self(raw::OPTION_ERROR);
    pub const MISSING_DELEGATE_ERROR: Self = Self(raw::MISSING_DELEGATE_ERROR);
    pub const CORRUPT_IMAGE_ERROR: Self = Self(raw::CORRUPT_IMAGE_ERROR);
    pub const BLOB_ERROR: Self = Self(raw::BLOB_ERROR);
    pub const CACHE_ERROR: Self = Self(raw::CACHE_ERROR);
    pub const CODER_ERROR: Self = Self(raw::CODER_ERROR);
    pub const FATAL_ERROR: Self = Self(raw::FATAL_ERROR);

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_warning(self) -> bool {
        (raw::WARNING..raw::ERROR).contains(&self.0)
    }

    /// Errors and fatal errors.
    pub fn is_error(self) -> bool {
        self.0 >= raw::ERROR
    }

    pub fn is_fatal(self) -> bool {
        self.0 >= raw::FATAL_ERROR
    }

    /// Category of the severity, independent of its level.
    pub fn kind(self) -> ExceptionKind {
        if self.0 < raw::WARNING {
            return ExceptionKind::Unknown;
        }
        ExceptionKind::from_offset(self.0 % 100)
    }
}

impl From<u32> for Severity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = if self.is_fatal() {
            "FatalError"
        } else if self.is_error() {
            "Error"
        } else if self.is_warning() {
            "Warning"
        } else {
            return write!(f, "Undefined({})", self.0);
        };
        match self.kind() {
            ExceptionKind::Unknown => write!(f, "{level}({})", self.0),
            kind => write!(f, "{kind:?}{level}"),
        }
    }
}

/// Category shared by the warning, error and fatal variants of a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    ResourceLimit,
    Type,
    Option,
    Delegate,
    MissingDelegate,
    CorruptImage,
    FileOpen,
    Blob,
    Stream,
    Cache,
    Coder,
    Filter,
    Module,
    Draw,
    Image,
    Wand,
    Random,
    XServer,
    Monitor,
    Registry,
    Configure,
    Policy,
    Unknown,
}

impl ExceptionKind {
    fn from_offset(offset: u32) -> Self {
        match offset {
            0 => Self::ResourceLimit,
            5 => Self::Type,
            10 => Self::Option,
            15 => Self::Delegate,
            20 => Self::MissingDelegate,
            25 => Self::CorruptImage,
            30 => Self::FileOpen,
            35 => Self::Blob,
            40 => Self::Stream,
            45 => Self::Cache,
            50 => Self::Coder,
            52 => Self::Filter,
            55 => Self::Module,
            60 => Self::Draw,
            65 => Self::Image,
            70 => Self::Wand,
            75 => Self::Random,
            80 => Self::XServer,
            85 => Self::Monitor,
            90 => Self::Registry,
            95 => Self::Configure,
            99 => Self::Policy,
            _ => Self::Unknown,
        }
    }
}
