//! Error types for qrwidget operations

use serde::Serialize;
use thiserror::Error;

/// Result type alias using qrwidget's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qrwidget operations
#[derive(Error, Debug)]
pub enum Error {
    /// Submitted payload was empty or whitespace only
    #[error("Missing input: enter some text or upload a file")]
    MissingInput,

    /// A generation is already in flight for this widget
    #[error("A QR code is already being generated")]
    Busy,

    /// The encoder (or the read feeding it) failed
    #[error("{0}")]
    Generation(GenerationFailure),

    /// Uploaded file could not be read
    #[error("Failed to read file '{name}': {reason}")]
    FileRead {
        /// File name as selected by the user
        name: String,
        /// Underlying cause
        reason: String,
    },

    /// String is not a `data:` URL this crate understands
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// QR code decoding failed
    #[error("Failed to decode QR code: {0}")]
    QrDecode(String),

    /// No QR code found in image
    #[error("No QR code found in image")]
    NoQrCodeFound,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Why a generation ended in the `Failed` state
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GenerationFailure {
    /// Payload does not fit in any symbol version at the configured ECC level
    #[error("Payload of {len} bytes exceeds QR code capacity")]
    CapacityExceeded {
        /// Payload length in bytes
        len: usize,
    },

    /// Any other encoder rejection
    #[error("Failed to encode QR code: {0}")]
    Encoding(String),

    /// Encoder did not finish within the configured timeout
    #[error("QR code generation timed out after {secs}s")]
    Timeout {
        /// Configured timeout in seconds
        secs: u64,
    },

    /// The uploaded file could not be read
    #[error("Failed to read file '{name}': {reason}")]
    FileRead {
        /// File name as selected by the user
        name: String,
        /// Underlying cause
        reason: String,
    },
}

impl GenerationFailure {
    /// User-facing description shown in the failure notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => {
                "Input is too large for a QR code. Try a shorter message."
            }
            Self::Encoding(_) => "Failed to generate QR code",
            Self::Timeout { .. } => "QR code generation timed out",
            Self::FileRead { .. } => "Failed to read file",
        }
    }
}

impl From<GenerationFailure> for Error {
    fn from(failure: GenerationFailure) -> Self {
        match failure {
            GenerationFailure::FileRead { name, reason } => Error::FileRead { name, reason },
            other => Error::Generation(other),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::InvalidDataUrl(format!("base64 payload: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_read_failure_maps_to_file_read_error() {
        let err: Error = GenerationFailure::FileRead {
            name: "notes.txt".into(),
            reason: "permission denied".into(),
        }
        .into();
        assert!(matches!(err, Error::FileRead { ref name, .. } if name == "notes.txt"));
    }

    #[test]
    fn capacity_failure_has_its_own_message() {
        let failure = GenerationFailure::CapacityExceeded { len: 5000 };
        assert_ne!(
            failure.user_message(),
            GenerationFailure::Encoding("x".into()).user_message()
        );
        assert!(matches!(Error::from(failure), Error::Generation(_)));
    }
}
