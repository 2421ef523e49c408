//! Frame parsing for optap
//!
//! Strips link, network and transport headers from captured frames to reach
//! the TCP payload, and builds synthetic frames for replay and tests.
//!
//! - [`link`] - datalink framings (Ethernet, BSD loopback, Linux cooked)
//! - [`ethernet`] - Ethernet II with a single 802.1Q tag
//! - [`ip`] - IPv4 and IPv6
//! - [`tcp`] - TCP segments
//! - [`payload`] - the per-frame payload extractor
//! - [`builder`] - fluent frame construction
//! - [`checksum`] - Internet checksum utilities
//!
//! # Quick Start
//!
//! ```rust
//! use optap_core::{ExtractorConfig, RawFrame};
//! use optap_packet::{Extracted, LinkType, PacketBuilder, PayloadExtractor};
//!
//! let data = PacketBuilder::loopback_v4(40000, 27017)
//!     .payload(b"payload".to_vec())
//!     .build()
//!     .unwrap();
//!
//! let extractor = PayloadExtractor::new(LinkType::Ethernet, &ExtractorConfig::default());
//! let frame = RawFrame::new(data);
//! match extractor.extract(&frame) {
//!     Extracted::Segment(segment) => assert_eq!(segment.payload, b"payload"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

pub mod builder;
pub mod checksum;
pub mod ethernet;
pub mod ip;
pub mod link;
pub mod payload;
pub mod tcp;

pub use builder::{BuildError, PacketBuilder};
pub use ethernet::{EtherType, EthernetFrame, MacAddress};
pub use ip::{IpProtocol, Ipv4Packet, Ipv6Packet};
pub use link::{LinkType, NetworkProtocol};
pub use payload::{Extracted, FlowKey, PayloadExtractor, Segment};
pub use tcp::{TcpFlags, TcpHeader, TcpSegment};
