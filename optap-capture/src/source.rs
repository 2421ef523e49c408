//! Frame source abstraction

use crate::stats::CaptureStats;
use optap_core::{RawFrame, Result};
use optap_packet::LinkType;
use std::collections::VecDeque;

/// Result of one read from a frame source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A frame was captured
    Frame(RawFrame),
    /// The poll timeout elapsed without a frame
    Idle,
    /// The source is exhausted and will never yield again
    End,
}

/// A blocking producer of captured frames
///
/// `next_frame` may block until a frame arrives; sources configured with a
/// poll timeout return [`SourceEvent::Idle`] instead of blocking forever.
/// An `Err` is terminal.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<SourceEvent>;

    /// Framing of the frames this source yields
    fn link_type(&self) -> LinkType;

    /// Kernel-level capture counters, where the source has them
    fn stats(&mut self) -> Option<CaptureStats> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<SourceEvent> {
        (**self).next_frame()
    }

    fn link_type(&self) -> LinkType {
        (**self).link_type()
    }

    fn stats(&mut self) -> Option<CaptureStats> {
        (**self).stats()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Result<SourceEvent> {
        (**self).next_frame()
    }

    fn link_type(&self) -> LinkType {
        (**self).link_type()
    }

    fn stats(&mut self) -> Option<CaptureStats> {
        (**self).stats()
    }
}

/// Frame source replaying frames held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    link: LinkType,
    frames: VecDeque<RawFrame>,
    idle_when_empty: bool,
}

impl MemorySource {
    pub fn new(link: LinkType, frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            link,
            frames: frames.into_iter().collect(),
            idle_when_empty: false,
        }
    }

    /// Report [`SourceEvent::Idle`] rather than [`SourceEvent::End`] once drained,
    /// like a live capture with a poll timeout on a quiet interface
    pub fn idle_when_empty(mut self) -> Self {
        self.idle_when_empty = true;
        self
    }

    pub fn push(&mut self, frame: RawFrame) {
        self.frames.push_back(frame);
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<SourceEvent> {
        Ok(match self.frames.pop_front() {
            Some(frame) => SourceEvent::Frame(frame),
            None if self.idle_when_empty => SourceEvent::Idle,
            None => SourceEvent::End,
        })
    }

    fn link_type(&self) -> LinkType {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(event: SourceEvent) -> Vec<u8> {
        match event {
            SourceEvent::Frame(frame) => frame.data,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_memory_source_order_and_end() {
        let mut source = MemorySource::new(
            LinkType::Ethernet,
            vec![RawFrame::new(vec![1]), RawFrame::new(vec![2])],
        );
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.link_type(), LinkType::Ethernet);

        assert_eq!(data(source.next_frame().unwrap()), vec![1]);
        assert_eq!(data(source.next_frame().unwrap()), vec![2]);
        assert_eq!(source.next_frame().unwrap(), SourceEvent::End);
        assert_eq!(source.next_frame().unwrap(), SourceEvent::End);
        assert!(source.stats().is_none());
    }

    #[test]
    fn test_memory_source_idles() {
        let mut source = MemorySource::new(LinkType::Null, Vec::new()).idle_when_empty();
        assert_eq!(source.next_frame().unwrap(), SourceEvent::Idle);

        source.push(RawFrame::new(vec![7]));
        assert_eq!(data(source.next_frame().unwrap()), vec![7]);
        assert_eq!(source.next_frame().unwrap(), SourceEvent::Idle);
    }

    #[test]
    fn test_boxed_source() {
        let mut source: Box<dyn FrameSource> =
            Box::new(MemorySource::new(LinkType::LinuxSll, vec![RawFrame::new(vec![3])]));
        assert_eq!(source.link_type(), LinkType::LinuxSll);
        assert_eq!(data(source.next_frame().unwrap()), vec![3]);
    }
}
