//! Error types for optap

use optap_wire::WireError;
use thiserror::Error;

/// Result type alias for optap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal outcome of a capture session, other than a clean end of stream
#[derive(Error, Debug)]
pub enum Error {
    /// Session could not be started (bad filter, bad configuration, device refused)
    #[error("Setup error: {0}")]
    Setup(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Capture device failed while reading
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Capture device was closed underneath the session
    #[error("Capture closed: {0}")]
    CaptureClosed(String),

    /// Wire message could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] WireError),

    /// Field lookup failed on an already validated document
    #[error("Lookup of '{key}' failed: {source}")]
    Lookup {
        key: String,
        #[source]
        source: WireError,
    },

    /// Consumer dropped the output channel
    #[error("Output channel closed")]
    ChannelClosed,

    /// Session was cancelled
    #[error("Session cancelled")]
    Cancelled,

    /// Session task panicked or was aborted
    #[error("Session task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Create a setup error with a custom message
    pub fn setup<S: Into<String>>(msg: S) -> Self {
        Error::Setup(msg.into())
    }

    /// Create a capture error with a custom message
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    pub fn lookup<S: Into<String>>(key: S, source: WireError) -> Self {
        Error::Lookup {
            key: key.into(),
            source,
        }
    }

    /// Whether the session ended because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether the session ended on a protocol decode failure
    pub fn is_fatal_decode(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Lookup { .. })
    }

    /// Whether the session failed before the first frame was read
    pub fn is_setup(&self) -> bool {
        matches!(self, Error::Setup(_) | Error::InterfaceNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optap_wire::OpCode;

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::capture("device gone").is_cancelled());
        assert!(!Error::from(WireError::MalformedFlags).is_cancelled());
        assert!(!Error::ChannelClosed.is_cancelled());
    }

    #[test]
    fn test_decode_classification() {
        let err: Error = WireError::UnsupportedOpcode(OpCode::Query).into();
        assert!(err.is_fatal_decode());
        assert!(err.to_string().contains("OP_QUERY"));

        let err = Error::lookup("x", WireError::invalid_document("bad utf-8"));
        assert!(err.is_fatal_decode());
        assert!(err.to_string().contains("'x'"));

        assert!(!Error::capture("boom").is_fatal_decode());
    }

    #[test]
    fn test_setup_classification() {
        assert!(Error::InterfaceNotFound("eth9".into()).is_setup());
        assert!(Error::setup("bad filter").is_setup());
        assert!(!Error::Cancelled.is_setup());
    }
}
