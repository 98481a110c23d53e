// src/error.rs
// Core error type shared by the imaging, batch and session modules.
// The HTTP layer converts these into `web::error::ApiError`.

use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum BridgeError {
    // Errors related to files in the shared image areas
    Io(std::io::Error),
    FileNotFound(String),
    InvalidFilename(String),
    ReadTimeout { filename: String, after: Duration },

    // Errors from the image codec
    Decode(String),
    Encode(String),

    // The decoded crop does not have the size its bounds describe
    InvalidMask(String),

    // Errors related to outbound delivery
    Serialization(serde_json::Error),
    SendFailed(String),

    // A blocking task panicked or was cancelled
    TaskFailed(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Io(e) => write!(f, "I/O error: {}", e),
            BridgeError::FileNotFound(name) => write!(f, "file not found: {}", name),
            BridgeError::InvalidFilename(name) => write!(f, "invalid filename: {:?}", name),
            BridgeError::ReadTimeout { filename, after } => {
                write!(f, "reading {} timed out after {:?}", filename, after)
            }
            BridgeError::Decode(msg) => write!(f, "failed to decode image: {}", msg),
            BridgeError::Encode(msg) => write!(f, "failed to encode image: {}", msg),
            BridgeError::InvalidMask(msg) => write!(f, "invalid mask: {}", msg),
            BridgeError::Serialization(e) => write!(f, "failed to serialize message: {}", e),
            BridgeError::SendFailed(msg) => write!(f, "send failed: {}", msg),
            BridgeError::TaskFailed(msg) => write!(f, "background task failed: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Io(e) => Some(e),
            BridgeError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err)
    }
}

// Decoding is the common path for image errors; encoders map their
// failures to `Encode` explicitly.
impl From<image::ImageError> for BridgeError {
    fn from(err: image::ImageError) -> Self {
        BridgeError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err)
    }
}

impl From<tokio::task::JoinError> for BridgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        BridgeError::TaskFailed(err.to_string())
    }
}

/// Rejects anything that is not a single, plain path component.
///
/// Filenames arrive from clients and are joined onto one of the shared
/// directories, so separators, `..` and empty names are refused before any
/// filesystem access happens.
pub fn validate_filename(filename: &str) -> BridgeResult<&str> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
        || filename.contains(':');
    if invalid {
        return Err(BridgeError::InvalidFilename(filename.to_string()));
    }
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filenames_are_accepted() {
        assert_eq!(validate_filename("a.png").unwrap(), "a.png");
        assert_eq!(validate_filename("PS_OUTPUTS_00001_.png").unwrap(), "PS_OUTPUTS_00001_.png");
        assert!(validate_filename("..hidden.png").is_ok());
    }

    #[test]
    fn test_traversal_and_separators_are_rejected() {
        for name in ["", ".", "..", "../a.png", "dir/a.png", "dir\\a.png", "C:a.png"] {
            assert!(
                matches!(validate_filename(name), Err(BridgeError::InvalidFilename(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_includes_cause() {
        let err = BridgeError::ReadTimeout {
            filename: "a.png".into(),
            after: Duration::from_millis(5),
        };
        assert!(err.to_string().contains("a.png"));

        let err = BridgeError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(err.to_string().contains("boom"));
    }
}
