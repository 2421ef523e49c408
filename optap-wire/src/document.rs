//! Validated structured documents and top-level field lookup
//!
//! Documents are carried in the binary BSON encoding. Parsing and element
//! decoding are delegated to the `bson` crate's raw document types; this module
//! adds the full structural walk that must succeed before any lookup happens.

use crate::error::{Result, WireError};
use bson::{RawArray, RawBson, RawBsonRef, RawDocument, RawDocumentBuf};

/// Nesting depth beyond which a document is rejected.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A document whose every element has been decoded at least once.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    raw: RawDocumentBuf,
}

impl Document {
    /// Validate `bytes` as a well-formed document.
    ///
    /// Checks the length prefix, the trailing NUL and the encoding of every
    /// element, recursing into embedded documents and arrays.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = RawDocument::from_bytes(bytes).map_err(invalid)?;
        walk_document(raw, 0)?;
        Ok(Self {
            raw: raw.to_raw_document_buf(),
        })
    }

    /// Validate the candidate left over from section parsing.
    ///
    /// A message without any single-document section has no candidate and
    /// fails here rather than producing an empty document.
    pub fn from_candidate(candidate: Option<&[u8]>) -> Result<Self> {
        match candidate {
            Some(bytes) => Self::from_bytes(bytes),
            None => Err(WireError::invalid_document("no single-document section")),
        }
    }

    /// Look up a top-level field by exact name.
    ///
    /// Returns `Ok(None)` when the key is absent. No dotted-path traversal.
    pub fn lookup(&self, key: &str) -> Result<Option<RawBson>> {
        let value = self.raw.get(key).map_err(invalid)?;
        Ok(value.map(|v| v.to_raw_bson()))
    }

    /// Raw encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// Borrow as a raw `bson` document
    pub fn as_raw(&self) -> &RawDocument {
        &self.raw
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.raw.as_bytes().len()
    }

    /// Whether the document has no fields
    pub fn is_empty(&self) -> bool {
        self.len() == crate::op_msg::MIN_DOCUMENT_SIZE
    }
}

fn invalid<E: std::fmt::Display>(err: E) -> WireError {
    WireError::InvalidDocument(err.to_string())
}

fn walk_document(doc: &RawDocument, depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(WireError::invalid_document("nesting too deep"));
    }
    for element in doc {
        let (_, value) = element.map_err(invalid)?;
        walk_value(value, depth)?;
    }
    Ok(())
}

fn walk_array(array: &RawArray, depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(WireError::invalid_document("nesting too deep"));
    }
    for element in array {
        walk_value(element.map_err(invalid)?, depth)?;
    }
    Ok(())
}

fn walk_value(value: RawBsonRef<'_>, depth: usize) -> Result<()> {
    match value {
        RawBsonRef::Document(doc) => walk_document(doc, depth + 1),
        RawBsonRef::Array(array) => walk_array(array, depth + 1),
        RawBsonRef::JavaScriptCodeWithScope(code) => walk_document(code.scope, depth + 1),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn encode(doc: &bson::Document) -> Vec<u8> {
        bson::to_vec(doc).unwrap()
    }

    #[test]
    fn test_lookup_found() {
        let bytes = encode(&doc! { "x": 7, "name": "frame" });
        let doc = Document::from_bytes(&bytes).unwrap();

        assert_eq!(doc.lookup("x").unwrap(), Some(RawBson::Int32(7)));
        assert_eq!(
            doc.lookup("name").unwrap(),
            Some(RawBson::String("frame".to_string()))
        );
    }

    #[test]
    fn test_lookup_absent_is_not_an_error() {
        let bytes = encode(&doc! { "x": 7 });
        let doc = Document::from_bytes(&bytes).unwrap();
        assert_eq!(doc.lookup("y").unwrap(), None);
    }

    #[test]
    fn test_lookup_is_top_level_only() {
        let bytes = encode(&doc! { "outer": { "inner": 1 } });
        let doc = Document::from_bytes(&bytes).unwrap();

        assert_eq!(doc.lookup("inner").unwrap(), None);
        assert_eq!(doc.lookup("outer.inner").unwrap(), None);
        assert!(doc.lookup("outer").unwrap().is_some());
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::from_bytes(&[5, 0, 0, 0, 0]).unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn test_missing_candidate_fails() {
        let err = Document::from_candidate(None).unwrap_err();
        assert!(matches!(err, WireError::InvalidDocument(_)));
    }

    #[test]
    fn test_length_prefix_mismatch_rejected() {
        let mut bytes = encode(&doc! { "x": 1 });
        bytes[0] += 1;
        assert!(Document::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let mut bytes = encode(&doc! { "x": 1 });
        let last = bytes.len() - 1;
        bytes[last] = 1;
        assert!(Document::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_corrupt_nested_element_rejected() {
        let mut bytes = encode(&doc! { "outer": { "s": "abc" } });
        // Inflate the nested string's length prefix past its document.
        let pos = bytes
            .windows(2)
            .position(|w| w == [b's', 0])
            .unwrap()
            + 2;
        bytes[pos] = 0x7F;
        assert!(Document::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_as_bytes_matches_input() {
        let bytes = encode(&doc! { "a": true });
        let doc = Document::from_bytes(&bytes).unwrap();
        assert_eq!(doc.as_bytes(), &bytes[..]);
        assert_eq!(doc.as_raw().as_bytes(), &bytes[..]);
    }
}
