//! OP_MSG body parsing
//!
//! The body of an extensible message is a 4-byte flag word followed by a
//! run of sections, optionally terminated by a CRC-32C checksum:
//! ```text
//! ┌───────────┬──────────────────────────────────────┬────────────┐
//! │ flagBits  │ section*                             │ checksum?  │
//! │ uint32 LE │ [uint8 kind][kind-specific body] ... │ uint32 LE  │
//! └───────────┴──────────────────────────────────────┴────────────┘
//! ```
//!
//! Section kind 0 carries one length-prefixed document. Section kind 1 carries
//! `[int32 size][cstring identifier][document]*`, where `size` counts itself.

use crate::error::{Result, WireError};

/// Size of the trailing checksum when [`flags::CHECKSUM_PRESENT`] is set.
pub const CHECKSUM_SIZE: usize = 4;

/// Smallest well-formed document: length prefix plus terminating NUL.
pub const MIN_DOCUMENT_SIZE: usize = 5;

/// OP_MSG flag bits.
pub mod flags {
    /// The message ends with a CRC-32C checksum.
    pub const CHECKSUM_PRESENT: u32 = 1 << 0;
    /// The sender will send another message without waiting for a reply.
    pub const MORE_TO_COME: u32 = 1 << 1;
    /// The client is prepared for multiple replies to this request.
    pub const EXHAUST_ALLOWED: u32 = 1 << 16;
}

/// Flag word of an OP_MSG body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MsgFlags(pub u32);

impl MsgFlags {
    /// Raw flag bits
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn checksum_present(self) -> bool {
        self.0 & flags::CHECKSUM_PRESENT != 0
    }

    #[inline]
    pub fn more_to_come(self) -> bool {
        self.0 & flags::MORE_TO_COME != 0
    }

    #[inline]
    pub fn exhaust_allowed(self) -> bool {
        self.0 & flags::EXHAUST_ALLOWED != 0
    }
}

/// Section kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// A single document (0)
    SingleDocument,
    /// An identified sequence of documents (1)
    DocumentSequence,
    /// Any other tag value
    Unknown(u8),
}

impl SectionKind {
    pub fn to_u8(self) -> u8 {
        match self {
            SectionKind::SingleDocument => 0,
            SectionKind::DocumentSequence => 1,
            SectionKind::Unknown(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SectionKind::SingleDocument,
            1 => SectionKind::DocumentSequence,
            val => SectionKind::Unknown(val),
        }
    }
}

/// One section borrowed from a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section<'a> {
    /// Raw bytes of the single document, length prefix included
    SingleDocument(&'a [u8]),
    /// Sequence identifier and the raw bytes of each document
    DocumentSequence {
        identifier: &'a str,
        documents: Vec<&'a [u8]>,
    },
    /// Unknown tag; only the tag byte was consumed
    Unknown(u8),
}

/// A parsed OP_MSG body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpMsg<'a> {
    /// Flag bits
    pub flags: MsgFlags,
    /// Section bytes, checksum excluded
    pub sections: &'a [u8],
    /// Trailing checksum (not verified)
    pub checksum: Option<u32>,
}

impl<'a> OpMsg<'a> {
    /// Split an OP_MSG body into flags, section bytes and checksum.
    pub fn parse(body: &'a [u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(WireError::MalformedFlags);
        }
        let flags = MsgFlags(u32::from_le_bytes([body[0], body[1], body[2], body[3]]));
        let mut sections = &body[4..];

        let checksum = if flags.checksum_present() {
            if sections.len() < CHECKSUM_SIZE {
                return Err(WireError::MissingChecksum);
            }
            let (head, tail) = sections.split_at(sections.len() - CHECKSUM_SIZE);
            sections = head;
            Some(u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]))
        } else {
            None
        };

        Ok(Self {
            flags,
            sections,
            checksum,
        })
    }

    /// Iterate over the sections of this message.
    pub fn sections(&self) -> Sections<'a> {
        Sections::new(self.sections)
    }
}

/// Iterator over the sections of an OP_MSG body.
///
/// Every successful step consumes at least the tag byte. After the first
/// error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Sections<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Sections<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn step(&mut self, kind: u8, body: &'a [u8]) -> Result<Section<'a>> {
        let at = self.offset - 1;
        let malformed = |reason| WireError::MalformedSection {
            kind,
            offset: at,
            reason,
        };

        match SectionKind::from_u8(kind) {
            SectionKind::SingleDocument => {
                let doc = read_document(body).ok_or_else(|| malformed("truncated document"))?;
                self.offset += doc.len();
                Ok(Section::SingleDocument(doc))
            }
            SectionKind::DocumentSequence => {
                let (identifier, documents, size) = read_sequence(body).map_err(malformed)?;
                self.offset += size;
                Ok(Section::DocumentSequence {
                    identifier,
                    documents,
                })
            }
            SectionKind::Unknown(tag) => Ok(Section::Unknown(tag)),
        }
    }
}

impl<'a> Iterator for Sections<'a> {
    type Item = Result<Section<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let buf = self.buf;
        let (&kind, body) = buf.get(self.offset..)?.split_first()?;
        self.offset += 1;

        let section = self.step(kind, body);
        if section.is_err() {
            self.offset = buf.len();
        }
        Some(section)
    }
}

fn read_i32_le(buf: &[u8]) -> Option<i32> {
    let bytes = buf.get(..4)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read one length-prefixed document from the front of `buf`.
///
/// Only the length prefix is checked here; content validation happens later.
pub fn read_document(buf: &[u8]) -> Option<&[u8]> {
    let len = usize::try_from(read_i32_le(buf)?).ok()?;
    if len < MIN_DOCUMENT_SIZE {
        return None;
    }
    buf.get(..len)
}

/// Read a document-sequence section body.
///
/// Returns the identifier, the documents and the number of bytes consumed.
fn read_sequence(buf: &[u8]) -> std::result::Result<(&str, Vec<&[u8]>, usize), &'static str> {
    let size = read_i32_le(buf).ok_or("truncated sequence size")?;
    let size = usize::try_from(size).map_err(|_| "negative sequence size")?;
    if size < 5 {
        return Err("sequence size too small");
    }
    let section = buf.get(4..size).ok_or("sequence size exceeds message")?;

    let nul = section
        .iter()
        .position(|&b| b == 0)
        .ok_or("unterminated sequence identifier")?;
    let identifier =
        std::str::from_utf8(&section[..nul]).map_err(|_| "sequence identifier is not UTF-8")?;

    let mut rest = &section[nul + 1..];
    let mut documents = Vec::new();
    while !rest.is_empty() {
        let doc = read_document(rest).ok_or("truncated document in sequence")?;
        rest = &rest[doc.len()..];
        documents.push(doc);
    }

    Ok((identifier, documents, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    // {} and {"a": 1}
    const EMPTY_DOC: [u8; 5] = [5, 0, 0, 0, 0];
    const A1_DOC: [u8; 12] = [12, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];

    fn sequence(identifier: &str, docs: &[&[u8]]) -> Vec<u8> {
        let body_len: usize = docs.iter().map(|d| d.len()).sum();
        let size = 4 + identifier.len() + 1 + body_len;
        let mut out = vec![1u8];
        out.extend_from_slice(&(size as i32).to_le_bytes());
        out.extend_from_slice(identifier.as_bytes());
        out.push(0);
        for doc in docs {
            out.extend_from_slice(doc);
        }
        out
    }

    #[test]
    fn test_flags_accessors() {
        let f = MsgFlags(flags::CHECKSUM_PRESENT | flags::EXHAUST_ALLOWED);
        assert!(f.checksum_present());
        assert!(!f.more_to_come());
        assert!(f.exhaust_allowed());
        assert_eq!(MsgFlags::default().bits(), 0);
    }

    #[test]
    fn test_section_kind_conversion() {
        assert_eq!(SectionKind::from_u8(0), SectionKind::SingleDocument);
        assert_eq!(SectionKind::from_u8(1), SectionKind::DocumentSequence);
        assert_eq!(SectionKind::from_u8(9), SectionKind::Unknown(9));
        assert_eq!(SectionKind::DocumentSequence.to_u8(), 1);
    }

    #[test]
    fn test_parse_missing_flags() {
        assert_eq!(OpMsg::parse(&[0, 0, 0]), Err(WireError::MalformedFlags));
    }

    #[test]
    fn test_parse_strips_checksum() {
        let mut body = flags::CHECKSUM_PRESENT.to_le_bytes().to_vec();
        body.push(0);
        body.extend_from_slice(&EMPTY_DOC);
        body.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());

        let msg = OpMsg::parse(&body).unwrap();
        assert_eq!(msg.checksum, Some(0xDEADBEEF));
        assert_eq!(msg.sections.len(), 1 + EMPTY_DOC.len());
    }

    #[test]
    fn test_parse_checksum_flag_without_room() {
        let mut body = flags::CHECKSUM_PRESENT.to_le_bytes().to_vec();
        body.extend_from_slice(&[0, 0]);
        assert_eq!(OpMsg::parse(&body), Err(WireError::MissingChecksum));
    }

    #[test]
    fn test_sections_single_and_sequence() {
        let mut buf = sequence("documents", &[&A1_DOC, &EMPTY_DOC]);
        buf.push(0);
        buf.extend_from_slice(&A1_DOC);

        let sections: Vec<_> = Sections::new(&buf).collect::<Result<_>>().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[0],
            Section::DocumentSequence {
                identifier: "documents",
                documents: vec![&A1_DOC[..], &EMPTY_DOC[..]],
            }
        );
        assert_eq!(sections[1], Section::SingleDocument(&A1_DOC[..]));
    }

    #[test]
    fn test_unknown_kind_consumes_tag_byte() {
        let mut buf = vec![7u8, 0];
        buf.extend_from_slice(&EMPTY_DOC);

        let mut iter = Sections::new(&buf);
        assert_eq!(iter.next(), Some(Ok(Section::Unknown(7))));
        assert_eq!(iter.offset(), 1);
        assert_eq!(iter.next(), Some(Ok(Section::SingleDocument(&EMPTY_DOC[..]))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_truncated_single_document_is_error_then_fused() {
        let buf = [0u8, 40, 0, 0, 0, 0];
        let mut iter = Sections::new(&buf);
        match iter.next() {
            Some(Err(WireError::MalformedSection { kind: 0, offset: 0, .. })) => {}
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_sequence_size_exceeding_buffer() {
        let mut buf = sequence("docs", &[&A1_DOC]);
        buf.truncate(buf.len() - 3);
        let result: Result<Vec<_>> = Sections::new(&buf).collect();
        assert!(matches!(
            result,
            Err(WireError::MalformedSection { kind: 1, .. })
        ));
    }

    #[test]
    fn test_sequence_without_identifier_terminator() {
        let mut buf = vec![1u8];
        buf.extend_from_slice(&8i32.to_le_bytes());
        buf.extend_from_slice(b"abcd");
        let result: Result<Vec<_>> = Sections::new(&buf).collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_read_document_bounds() {
        assert_eq!(read_document(&EMPTY_DOC), Some(&EMPTY_DOC[..]));
        assert_eq!(read_document(&[4, 0, 0, 0]), None);
        assert_eq!(read_document(&[0xFF, 0xFF, 0xFF, 0xFF, 0]), None);
        assert_eq!(read_document(&[2, 0]), None);
    }
}
