//! Wire message decoding for optap
//!
//! This crate turns a captured TCP payload into the structured document it
//! carries:
//!
//! - [`header`] - the 16-byte envelope header and opcode enumeration
//! - [`op_msg`] - OP_MSG flag bits and section parsing
//! - [`document`] - document validation and top-level field lookup
//! - [`decode`](mod@decode) - the envelope-to-document decoder
//! - [`encode`] - OP_MSG construction for replay and tests
//!
//! # Example
//!
//! ```
//! use optap_wire::{decode, OpMsgBuilder};
//!
//! let body = bson::to_vec(&bson::doc! { "x": 42 }).unwrap();
//! let wm = OpMsgBuilder::new().document(body).build();
//!
//! let doc = decode(&wm).unwrap();
//! assert_eq!(doc.lookup("x").unwrap(), Some(bson::RawBson::Int32(42)));
//! assert_eq!(doc.lookup("y").unwrap(), None);
//! ```

pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod header;
pub mod op_msg;

pub use decode::{decode, decode_op_msg, read_envelope};
pub use document::Document;
pub use encode::OpMsgBuilder;
pub use error::{Result, WireError};
pub use header::{MsgHeader, OpCode, HEADER_SIZE};
pub use op_msg::{MsgFlags, OpMsg, Section, SectionKind, Sections};

pub use bson::RawBson;
