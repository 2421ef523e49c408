//! Session configuration
//!
//! Every environment-specific tuning knob lives here rather than in the
//! capture loop. All types deserialize with defaults for missing fields.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interface observed by a session
pub const DEFAULT_INTERFACE: &str = "lo";
/// Default TCP port filtered on
pub const DEFAULT_PORT: u16 = 27017;
/// Maximum capturable frame size
pub const DEFAULT_SNAPLEN: i32 = 48_000_000;
/// On-wire length of a bare ACK on the loopback path
pub const DEFAULT_ACK_FRAME_LEN: u32 = 66;
/// Default output channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Frame source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interface to capture on
    pub interface: String,
    /// TCP port to filter on
    pub port: u16,
    /// Snapshot length
    pub snaplen: i32,
    /// Promiscuous mode
    pub promiscuous: bool,
    /// Deliver packets as soon as they arrive
    pub immediate_mode: bool,
    /// Poll timeout; `None` blocks until a frame arrives
    pub read_timeout: Option<Duration>,
    /// Kernel buffer size in bytes; 0 keeps the device default
    pub buffer_size: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            port: DEFAULT_PORT,
            snaplen: DEFAULT_SNAPLEN,
            promiscuous: true,
            immediate_mode: true,
            read_timeout: None,
            buffer_size: 0,
        }
    }
}

impl CaptureConfig {
    pub fn new(interface: impl Into<String>, port: u16) -> Self {
        Self {
            interface: interface.into(),
            port,
            ..Self::default()
        }
    }

    /// BPF expression matching TCP traffic on the configured port
    pub fn filter_expression(&self) -> String {
        format!("tcp port {}", self.port)
    }

    pub fn with_snaplen(mut self, snaplen: i32) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    pub fn with_immediate_mode(mut self, immediate_mode: bool) -> Self {
        self.immediate_mode = immediate_mode;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: i32) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Read timeout in the millisecond form the capture device expects
    ///
    /// Zero means "block forever" to libpcap, so a sub-millisecond timeout
    /// is rounded up.
    pub fn read_timeout_ms(&self) -> i32 {
        match self.read_timeout {
            None => 0,
            Some(t) => i32::try_from(t.as_millis()).unwrap_or(i32::MAX).max(1),
        }
    }
}

/// Payload extractor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Frames whose on-wire length equals this are skipped without parsing
    pub ack_frame_len: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ack_frame_len: DEFAULT_ACK_FRAME_LEN,
        }
    }
}

/// What a session does with a frame that fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// End the session with the decode error
    ///
    /// TCP segments with an empty payload (handshake, FIN, window updates)
    /// never reach the decoder and are skipped under either policy.
    #[default]
    FailFast,
    /// Log, count and move on to the next frame
    SkipFrame,
}

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub capture: CaptureConfig,
    pub extractor: ExtractorConfig,
    /// Top-level field extracted from each decoded document
    pub key: String,
    /// Capacity of the output channel
    pub channel_capacity: usize,
    pub decode_policy: DecodePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            extractor: ExtractorConfig::default(),
            key: String::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            decode_policy: DecodePolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.capture.interface = interface.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.capture.port = port;
        self
    }

    pub fn with_ack_frame_len(mut self, len: u32) -> Self {
        self.extractor.ack_frame_len = len;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    /// Reject configurations no session could run with
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(Error::setup("field name must not be empty"));
        }
        if self.channel_capacity == 0 {
            return Err(Error::setup("channel capacity must be at least 1"));
        }
        if self.capture.snaplen <= 0 {
            return Err(Error::setup(format!(
                "snaplen must be positive, got {}",
                self.capture.snaplen
            )));
        }
        if self.capture.interface.is_empty() {
            return Err(Error::setup("interface name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.interface, "lo");
        assert_eq!(config.port, 27017);
        assert_eq!(config.snaplen, 48_000_000);
        assert!(config.promiscuous);
        assert!(config.read_timeout.is_none());
        assert_eq!(config.read_timeout_ms(), 0);
    }

    #[test]
    fn test_filter_expression() {
        assert_eq!(
            CaptureConfig::new("lo", 27018).filter_expression(),
            "tcp port 27018"
        );
    }

    #[test]
    fn test_read_timeout_rounds_up() {
        let config = CaptureConfig::default().with_read_timeout(Duration::from_micros(10));
        assert_eq!(config.read_timeout_ms(), 1);

        let config = CaptureConfig::default().with_read_timeout(Duration::from_millis(250));
        assert_eq!(config.read_timeout_ms(), 250);
    }

    #[test]
    fn test_validate() {
        assert!(SessionConfig::new("x").validate().is_ok());
        assert!(SessionConfig::default().validate().unwrap_err().is_setup());
        assert!(SessionConfig::new("x")
            .with_channel_capacity(0)
            .validate()
            .is_err());

        let mut config = SessionConfig::new("x");
        config.capture.snaplen = 0;
        assert!(matches!(config.validate(), Err(Error::Setup(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SessionConfig = serde_json::from_str(
            r#"{ "key": "x", "capture": { "port": 28017 }, "decode_policy": "skip_frame" }"#,
        )
        .unwrap();

        assert_eq!(config.key, "x");
        assert_eq!(config.capture.port, 28017);
        assert_eq!(config.capture.interface, "lo");
        assert_eq!(config.extractor.ack_frame_len, 66);
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.decode_policy, DecodePolicy::SkipFrame);
    }

    #[test]
    fn test_builder_setters() {
        let config = SessionConfig::new("x")
            .with_interface("lo0")
            .with_port(1234)
            .with_ack_frame_len(56)
            .with_decode_policy(DecodePolicy::SkipFrame);

        assert_eq!(config.capture.interface, "lo0");
        assert_eq!(config.capture.filter_expression(), "tcp port 1234");
        assert_eq!(config.extractor.ack_frame_len, 56);
    }
}
