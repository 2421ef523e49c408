//! Wire message construction
//!
//! Builds complete OP_MSG envelopes. Used to synthesise traffic for replay
//! and tests; the capture path never encodes.

use crate::header::{MsgHeader, OpCode, HEADER_SIZE};
use crate::op_msg::{flags, MsgFlags, SectionKind, CHECKSUM_SIZE};
use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone)]
enum PendingSection {
    Single(Vec<u8>),
    Sequence {
        identifier: String,
        documents: Vec<Vec<u8>>,
    },
    Tag(u8),
}

/// Fluent builder for OP_MSG wire messages
///
/// # Examples
///
/// ```
/// use optap_wire::{decode, OpMsgBuilder};
///
/// let doc = bson::to_vec(&bson::doc! { "ping": 1 }).unwrap();
/// let wm = OpMsgBuilder::new().request_id(1).document(doc).build();
/// assert!(decode(&wm).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct OpMsgBuilder {
    request_id: i32,
    response_to: i32,
    op_code: OpCode,
    flags: MsgFlags,
    checksum: Option<u32>,
    sections: Vec<PendingSection>,
}

impl OpMsgBuilder {
    pub fn new() -> Self {
        Self {
            request_id: 0,
            response_to: 0,
            op_code: OpCode::Msg,
            flags: MsgFlags::default(),
            checksum: None,
            sections: Vec::new(),
        }
    }

    pub fn request_id(mut self, id: i32) -> Self {
        self.request_id = id;
        self
    }

    pub fn response_to(mut self, id: i32) -> Self {
        self.response_to = id;
        self
    }

    /// Override the opcode written to the header.
    ///
    /// The body is still laid out as OP_MSG.
    pub fn op_code(mut self, op_code: OpCode) -> Self {
        self.op_code = op_code;
        self
    }

    pub fn flags(mut self, flags: MsgFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Append a trailing checksum and set the checksum flag.
    pub fn checksum(mut self, crc: u32) -> Self {
        self.checksum = Some(crc);
        self
    }

    /// Append a single-document section holding already-encoded bytes.
    pub fn document(mut self, doc: impl Into<Vec<u8>>) -> Self {
        self.sections.push(PendingSection::Single(doc.into()));
        self
    }

    /// Append a document-sequence section.
    pub fn sequence(mut self, identifier: &str, documents: Vec<Vec<u8>>) -> Self {
        self.sections.push(PendingSection::Sequence {
            identifier: identifier.to_string(),
            documents,
        });
        self
    }

    /// Append a bare section tag with no body.
    pub fn unknown_section(mut self, tag: u8) -> Self {
        self.sections.push(PendingSection::Tag(tag));
        self
    }

    fn body_len(&self) -> usize {
        let sections: usize = self
            .sections
            .iter()
            .map(|section| match section {
                PendingSection::Single(doc) => 1 + doc.len(),
                PendingSection::Sequence {
                    identifier,
                    documents,
                } => 1 + 4 + identifier.len() + 1 + documents.iter().map(Vec::len).sum::<usize>(),
                PendingSection::Tag(_) => 1,
            })
            .sum();
        let checksum = if self.checksum.is_some() {
            CHECKSUM_SIZE
        } else {
            0
        };
        4 + sections + checksum
    }

    /// Encode the complete message.
    pub fn build(self) -> Vec<u8> {
        let total = HEADER_SIZE + self.body_len();
        let mut buf = BytesMut::with_capacity(total);

        MsgHeader::new(total as i32, self.request_id, self.response_to, self.op_code)
            .encode_into(&mut buf);

        let mut bits = self.flags.bits();
        if self.checksum.is_some() {
            bits |= flags::CHECKSUM_PRESENT;
        }
        buf.put_u32_le(bits);

        for section in &self.sections {
            match section {
                PendingSection::Single(doc) => {
                    buf.put_u8(SectionKind::SingleDocument.to_u8());
                    buf.put_slice(doc);
                }
                PendingSection::Sequence {
                    identifier,
                    documents,
                } => {
                    let size = 4
                        + identifier.len()
                        + 1
                        + documents.iter().map(Vec::len).sum::<usize>();
                    buf.put_u8(SectionKind::DocumentSequence.to_u8());
                    buf.put_i32_le(size as i32);
                    buf.put_slice(identifier.as_bytes());
                    buf.put_u8(0);
                    for doc in documents {
                        buf.put_slice(doc);
                    }
                }
                PendingSection::Tag(tag) => buf.put_u8(*tag),
            }
        }

        if let Some(crc) = self.checksum {
            buf.put_u32_le(crc);
        }

        buf.to_vec()
    }
}

impl Default for OpMsgBuilder {
    fn default() -> Self {
        Self::new()
    }
}
