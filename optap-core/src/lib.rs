//! optap core library
//!
//! Shared error taxonomy, frame type and configuration used by every stage
//! of the capture pipeline.

pub mod config;
pub mod error;
pub mod frame;

pub use config::{CaptureConfig, DecodePolicy, ExtractorConfig, SessionConfig};
pub use error::{Error, Result};
pub use frame::RawFrame;
