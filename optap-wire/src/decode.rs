//! Wire message decoding
//!
//! Stateless: one captured payload in, one validated document out.

use crate::document::Document;
use crate::error::{Result, WireError};
use crate::header::{MsgHeader, OpCode, HEADER_SIZE};
use crate::op_msg::{OpMsg, Section};
use tracing::trace;

/// Read the envelope header and bound the body by the declared length.
///
/// Fails before any body parsing when the declared length is shorter than
/// the header or longer than the bytes actually available. Bytes past the
/// declared length are ignored.
pub fn read_envelope(payload: &[u8]) -> Result<(MsgHeader, &[u8])> {
    let available = payload.len();
    let (header, _) = MsgHeader::decode(payload).ok_or(WireError::InsufficientHeader {
        needed: HEADER_SIZE,
        available,
    })?;

    let malformed = WireError::MalformedHeader {
        declared: header.message_length,
        available,
    };
    let body_len = header.body_len().ok_or_else(|| malformed.clone())?;
    let body = payload
        .get(HEADER_SIZE..HEADER_SIZE + body_len)
        .ok_or(malformed)?;

    Ok((header, body))
}

/// Decode a captured TCP payload into the document it carries.
///
/// Only OP_MSG bodies are decoded; every other opcode is reported as
/// [`WireError::UnsupportedOpcode`].
pub fn decode(payload: &[u8]) -> Result<Document> {
    let (header, body) = read_envelope(payload)?;
    match header.op_code {
        OpCode::Msg => decode_op_msg(body),
        other => Err(WireError::UnsupportedOpcode(other)),
    }
}

/// Decode an OP_MSG body.
///
/// The last single-document section becomes the result. Document-sequence
/// sections are walked only to advance past them.
pub fn decode_op_msg(body: &[u8]) -> Result<Document> {
    let msg = OpMsg::parse(body)?;
    trace!(
        checksum = msg.flags.checksum_present(),
        more_to_come = msg.flags.more_to_come(),
        exhaust_allowed = msg.flags.exhaust_allowed(),
        "OP_MSG flags"
    );

    let mut candidate = None;
    for section in msg.sections() {
        if let Section::SingleDocument(doc) = section? {
            candidate = Some(doc);
        }
    }

    Document::from_candidate(candidate)
}
