//! Frame sources for optap
//!
//! This crate yields raw link-layer frames to the capture loop.
//!
//! ## Features
//!
//! - **Live capture**: pcap handle on a named interface with a TCP port filter
//! - **Offline replay**: the same filter applied to a pcap file
//! - **In-memory source**: frames held in a queue, for tests and replay
//! - **BPF filters**: validation against a dead handle before any device is opened
//! - **Statistics**: kernel drop counters
//!
//! ## Example
//!
//! ```no_run
//! use optap_capture::{FrameSource, PcapSource, SourceEvent};
//! use optap_core::CaptureConfig;
//!
//! # fn main() -> optap_core::Result<()> {
//! let mut source = PcapSource::open_live(&CaptureConfig::new("lo", 27017))?;
//! while let SourceEvent::Frame(frame) = source.next_frame()? {
//!     println!("{} bytes on the wire", frame.wire_len);
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod filters;
pub mod interface;
pub mod source;
pub mod stats;

pub use capture::PcapSource;
pub use interface::{get_interface, list_interfaces, loopback_interface, InterfaceInfo};
pub use source::{FrameSource, MemorySource, SourceEvent};
pub use stats::CaptureStats;
