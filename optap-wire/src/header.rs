//! Wire message envelope header
//!
//! Every message starts with a fixed 16-byte header:
//! ```text
//! ┌──────────────┬────────────┬─────────────┬──────────┐
//! │ messageLength│ requestID  │ responseTo  │ opCode   │
//! │ int32 LE     │ int32 LE   │ int32 LE    │ int32 LE │
//! └──────────────┴────────────┴─────────────┴──────────┘
//! ```
//!
//! `messageLength` counts the header itself.

use bytes::BufMut;
use std::fmt;

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Wire message opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Legacy reply (1)
    Reply,
    /// Legacy update (2001)
    Update,
    /// Legacy insert (2002)
    Insert,
    /// Legacy query (2004)
    Query,
    /// Legacy get-more (2005)
    GetMore,
    /// Legacy delete (2006)
    Delete,
    /// Legacy kill-cursors (2007)
    KillCursors,
    /// Compressed envelope (2012)
    Compressed,
    /// Extensible message (2013)
    Msg,
    /// Any other value
    Unknown(i32),
}

impl OpCode {
    /// Convert to the on-wire value
    pub fn to_i32(self) -> i32 {
        match self {
            OpCode::Reply => 1,
            OpCode::Update => 2001,
            OpCode::Insert => 2002,
            OpCode::Query => 2004,
            OpCode::GetMore => 2005,
            OpCode::Delete => 2006,
            OpCode::KillCursors => 2007,
            OpCode::Compressed => 2012,
            OpCode::Msg => 2013,
            OpCode::Unknown(val) => val,
        }
    }

    /// Create from the on-wire value
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => OpCode::Reply,
            2001 => OpCode::Update,
            2002 => OpCode::Insert,
            2004 => OpCode::Query,
            2005 => OpCode::GetMore,
            2006 => OpCode::Delete,
            2007 => OpCode::KillCursors,
            2012 => OpCode::Compressed,
            2013 => OpCode::Msg,
            val => OpCode::Unknown(val),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Reply => write!(f, "OP_REPLY"),
            OpCode::Update => write!(f, "OP_UPDATE"),
            OpCode::Insert => write!(f, "OP_INSERT"),
            OpCode::Query => write!(f, "OP_QUERY"),
            OpCode::GetMore => write!(f, "OP_GET_MORE"),
            OpCode::Delete => write!(f, "OP_DELETE"),
            OpCode::KillCursors => write!(f, "OP_KILL_CURSORS"),
            OpCode::Compressed => write!(f, "OP_COMPRESSED"),
            OpCode::Msg => write!(f, "OP_MSG"),
            OpCode::Unknown(val) => write!(f, "<invalid opcode {}>", val),
        }
    }
}

/// Decoded envelope header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    /// Total message length in bytes, header included
    pub message_length: i32,
    /// Identifier chosen by the sender
    pub request_id: i32,
    /// Request this message answers (0 for requests)
    pub response_to: i32,
    /// Body format selector
    pub op_code: OpCode,
}

impl MsgHeader {
    /// Create a new header.
    pub fn new(message_length: i32, request_id: i32, response_to: i32, op_code: OpCode) -> Self {
        Self {
            message_length,
            request_id,
            response_to,
            op_code,
        }
    }

    /// Decode a header from the front of `buf`.
    ///
    /// Returns the header and the bytes following it, or `None` if the buffer
    /// is shorter than [`HEADER_SIZE`].
    pub fn decode(buf: &[u8]) -> Option<(Self, &[u8])> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let word = |at: usize| i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let header = Self {
            message_length: word(0),
            request_id: word(4),
            response_to: word(8),
            op_code: OpCode::from_i32(word(12)),
        };
        Some((header, &buf[HEADER_SIZE..]))
    }

    /// Append the encoded header to `buf`.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_i32_le(self.message_length);
        buf.put_i32_le(self.request_id);
        buf.put_i32_le(self.response_to);
        buf.put_i32_le(self.op_code.to_i32());
    }

    /// Encode the header to bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut cursor = &mut out[..];
        self.encode_into(&mut cursor);
        out
    }

    /// Number of body bytes the header declares, if the length is sane.
    pub fn body_len(&self) -> Option<usize> {
        usize::try_from(self.message_length)
            .ok()
            .and_then(|len| len.checked_sub(HEADER_SIZE))
    }
}
