//! Capture session for optap
//!
//! This crate runs the capture pipeline end to end:
//! - Reading frames from a [`FrameSource`](optap_capture::FrameSource)
//! - Extracting TCP payloads and passing them through a [`SegmentStage`]
//! - Decoding wire messages and looking up one top-level field
//! - Delivering values, in capture order, on a bounded channel
//! - Honouring cooperative cancellation at the send point
//!
//! # Example
//!
//! ```no_run
//! use optap_core::SessionConfig;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> optap_core::Result<()> {
//! let config = SessionConfig::new("insert").with_port(27017);
//! let (tx, mut rx) = mpsc::channel(config.channel_capacity);
//! let cancel = CancellationToken::new();
//!
//! let task = tokio::spawn(optap_session::listen(config, tx, cancel.clone()));
//! while let Some(value) = rx.recv().await {
//!     println!("{:?}", value);
//! }
//! cancel.cancel();
//! # let _ = task.await;
//! # Ok(())
//! # }
//! ```

pub mod session;
pub mod stage;
pub mod stats;

pub use session::{listen, Session};
pub use stage::{Passthrough, SegmentStage};
pub use stats::{SessionStats, SessionStatsCounters};
