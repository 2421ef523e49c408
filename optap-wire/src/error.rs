//! Decoder error types

use crate::header::OpCode;
use thiserror::Error;

/// Result type alias for wire decoding
pub type Result<T> = std::result::Result<T, WireError>;

/// Failure while decoding a wire message or its embedded document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than a complete envelope header
    #[error("malformed wire message: header needs {needed} bytes, got {available}")]
    InsufficientHeader { needed: usize, available: usize },

    /// Declared message length disagrees with the bytes actually captured
    #[error("malformed wire message: declared length {declared}, {available} bytes available")]
    MalformedHeader { declared: i32, available: usize },

    /// The message body is too short to hold its flag bits
    #[error("malformed wire message: missing OP_MSG flags")]
    MalformedFlags,

    /// Checksum flag set but no room left for the trailing checksum
    #[error("malformed wire message: checksum flag set without a checksum")]
    MissingChecksum,

    /// A section body could not be read at the given body offset
    #[error("malformed OP_MSG section (kind {kind}) at offset {offset}: {reason}")]
    MalformedSection {
        kind: u8,
        offset: usize,
        reason: &'static str,
    },

    /// Opcode other than the one this decoder understands
    #[error("cannot decode result from {0}")]
    UnsupportedOpcode(OpCode),

    /// Structural validation of the document failed
    #[error("malformed OP_MSG: invalid document: {0}")]
    InvalidDocument(String),
}

impl WireError {
    /// Create an invalid document error with a custom message
    pub fn invalid_document<S: Into<String>>(msg: S) -> Self {
        WireError::InvalidDocument(msg.into())
    }

    /// Whether the failure came from the envelope header rather than the body
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            WireError::InsufficientHeader { .. } | WireError::MalformedHeader { .. }
        )
    }
}
