//! Error types for the interop layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::exception::MagickException;

/// Error type for every fallible binding operation.
#[derive(Error, Debug)]
pub enum Error {
    /// The native library reported an error, with its related causes
    #[error(transparent)]
    Magick(#[from] MagickException),

    /// A NULL or otherwise unusable native handle reached the binding
    #[error("invalid {kind} handle")]
    InvalidHandle { kind: &'static str },

    /// The native side could not allocate the requested object
    #[error("native allocation failed: {0}")]
    Allocation(&'static str),

    /// Caller input rejected before reaching the native library
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to load the native library
    #[error("failed to load native library {path:?}: {message}")]
    LibraryLoad { path: PathBuf, message: String },

    /// Required symbol not found in the native library
    #[error("missing native symbol {symbol}: {message}")]
    MissingSymbol {
        symbol: &'static str,
        message: String,
    },

    /// The loaded library was built with a different quantum
    #[error(
        "quantum mismatch: binding uses {expected_depth}-bit (hdri: {expected_hdri}), \
         native library uses {actual_depth}-bit (hdri: {actual_hdri})"
    )]
    QuantumMismatch {
        expected_depth: u32,
        expected_hdri: bool,
        actual_depth: u32,
        actual_hdri: bool,
    },

    /// `MagickNative::initialize` was called after the layer was set up
    #[error("native layer already initialized")]
    AlreadyInitialized,

    /// An operation observed its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// The native exception behind this error, if any.
    pub fn as_magick(&self) -> Option<&MagickException> {
        match self {
            Self::Magick(exception) => Some(exception),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type alias using the interop [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::InvalidHandle { kind: "image" };
        assert_eq!(err.to_string(), "invalid image handle");

        let err = Error::QuantumMismatch {
            expected_depth: 16,
            expected_hdri: false,
            actual_depth: 8,
            actual_hdri: false,
        };
        assert!(err.to_string().contains("16-bit"));
        assert!(err.as_magick().is_none());
    }

    #[test]
    fn test_toml_error_is_config() {
        let err: Error = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }
}
