//! Segment stage between payload extraction and decoding
//!
//! Each captured TCP payload passes through a stage before the decoder sees
//! it. The default stage hands every payload on untouched; a reassembling
//! stage keyed on [`FlowKey`](optap_packet::FlowKey) can buffer partial
//! messages and release them once complete.

use optap_packet::Segment;
use std::borrow::Cow;

/// Transforms captured segments into complete wire messages
pub trait SegmentStage {
    /// Accept one segment, returning message bytes ready to decode
    ///
    /// `None` holds the segment back; nothing is decoded for this frame.
    fn process<'a>(&mut self, segment: Segment<'a>) -> Option<Cow<'a, [u8]>>;
}

/// Forwards every payload as-is, one segment per message
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl SegmentStage for Passthrough {
    fn process<'a>(&mut self, segment: Segment<'a>) -> Option<Cow<'a, [u8]>> {
        Some(Cow::Borrowed(segment.payload))
    }
}

impl<S: SegmentStage + ?Sized> SegmentStage for Box<S> {
    fn process<'a>(&mut self, segment: Segment<'a>) -> Option<Cow<'a, [u8]>> {
        (**self).process(segment)
    }
}
