//! The capture session loop
//!
//! One cooperative loop per session: read a frame, extract its TCP payload,
//! decode the wire message, look up the configured field and send the value
//! downstream. Values leave in capture order. Only the send suspends.

use bson::RawBson;
use optap_capture::{FrameSource, PcapSource, SourceEvent};
use optap_core::{DecodePolicy, Error, RawFrame, Result, SessionConfig};
use optap_packet::{Extracted, PayloadExtractor};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::stage::{Passthrough, SegmentStage};
use crate::stats::{SessionStats, SessionStatsCounters};

/// A configured capture session
pub struct Session<S = Passthrough> {
    id: Uuid,
    config: SessionConfig,
    stage: S,
    stats: Arc<SessionStatsCounters>,
}

impl Session<Passthrough> {
    /// Create a session, rejecting configurations it could not run with
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: Uuid::now_v7(),
            config,
            stage: Passthrough,
            stats: Arc::new(SessionStatsCounters::default()),
        })
    }
}

impl<S: SegmentStage> Session<S> {
    /// Replace the segment stage
    pub fn with_stage<T: SegmentStage>(self, stage: T) -> Session<T> {
        Session {
            id: self.id,
            config: self.config,
            stage,
            stats: self.stats,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    /// Shared counters, readable while the session runs elsewhere
    pub fn stats_handle(&self) -> Arc<SessionStatsCounters> {
        Arc::clone(&self.stats)
    }

    /// Output channel sized from the configuration
    pub fn channel(&self) -> (mpsc::Sender<RawBson>, mpsc::Receiver<RawBson>) {
        mpsc::channel(self.config.channel_capacity)
    }

    /// Drive the loop until the source ends, an error occurs or `cancel` fires
    ///
    /// Returns `Ok(())` only when the source is exhausted. Cancellation is
    /// observed while waiting to send, and between reads when the source
    /// reports an idle poll; a read already blocked in the source is not
    /// interrupted.
    pub async fn run<F: FrameSource>(
        &mut self,
        mut source: F,
        out: &mpsc::Sender<RawBson>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let span = info_span!("session", id = %self.id);
        async move {
            let extractor = PayloadExtractor::new(source.link_type(), &self.config.extractor);
            info!(
                key = %self.config.key,
                link = %extractor.link_type(),
                policy = ?self.config.decode_policy,
                "Session started"
            );

            let result = self.drive(&mut source, &extractor, out, cancel).await;

            match &result {
                Ok(()) => info!("Session finished: source exhausted"),
                Err(e) if e.is_cancelled() => info!("Session cancelled"),
                Err(e) => error!(error = %e, "Session failed"),
            }
            let stats = self.stats.snapshot();
            info!(
                frames = stats.frames_seen,
                decoded = stats.decoded,
                emitted = stats.emitted,
                "Session statistics"
            );
            if let Some(capture) = source.stats() {
                info!(%capture, "Capture statistics");
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn drive<F: FrameSource>(
        &mut self,
        source: &mut F,
        extractor: &PayloadExtractor,
        out: &mpsc::Sender<RawBson>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            let frame = match source.next_frame()? {
                SourceEvent::Frame(frame) => frame,
                SourceEvent::Idle => {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    tokio::task::yield_now().await;
                    continue;
                }
                SourceEvent::End => return Ok(()),
            };

            let Some(value) = self.process(extractor, &frame)? else {
                continue;
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                sent = out.send(value) => {
                    if sent.is_err() {
                        return Err(Error::ChannelClosed);
                    }
                    self.stats.record_emitted();
                }
            }
        }
    }

    /// Run one frame through extraction, decoding and lookup
    ///
    /// `Ok(None)` means the frame was passed over.
    fn process(&mut self, extractor: &PayloadExtractor, frame: &RawFrame) -> Result<Option<RawBson>> {
        self.stats.record_frame();

        let segment = match extractor.extract(frame) {
            Extracted::Segment(segment) => segment,
            Extracted::SkippedAckLength => {
                self.stats.record_ack_skip();
                debug!(wire_len = frame.wire_len, "Skipping bare ACK frame");
                return Ok(None);
            }
            Extracted::SkippedNoTcp => {
                self.stats.record_non_tcp();
                debug!(wire_len = frame.wire_len, "Skipping frame without TCP");
                return Ok(None);
            }
        };

        if segment.payload.is_empty() {
            self.stats.record_empty_payload();
            debug!(flow = %segment.flow, "Skipping empty TCP payload");
            return Ok(None);
        }

        let flow = segment.flow;
        let Some(message) = self.stage.process(segment) else {
            trace!(%flow, "Segment held by stage");
            return Ok(None);
        };
        trace!(%flow, len = message.len(), "Decoding message");

        let doc = match optap_wire::decode(&message) {
            Ok(doc) => doc,
            Err(e) => return self.decode_failure(Error::Decode(e)),
        };
        self.stats.record_decoded();

        match doc.lookup(&self.config.key) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                self.stats.record_key_miss();
                debug!(key = %self.config.key, "Field not present");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Lookup failed on a validated document");
                self.decode_failure(Error::lookup(self.config.key.as_str(), e))
            }
        }
    }

    fn decode_failure(&self, err: Error) -> Result<Option<RawBson>> {
        match self.config.decode_policy {
            DecodePolicy::FailFast => Err(err),
            DecodePolicy::SkipFrame => {
                self.stats.record_skipped_failure();
                debug!(error = %err, "Skipping undecodable frame");
                Ok(None)
            }
        }
    }
}

impl<S: SegmentStage + Send + 'static> Session<S> {
    /// Run the session on a blocking thread
    ///
    /// Frame sources block in their reads, so the loop gets a thread of its
    /// own. Must be called from within a Tokio runtime.
    pub fn spawn<F>(
        self,
        source: F,
        out: mpsc::Sender<RawBson>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<()>>
    where
        F: FrameSource + Send + 'static,
    {
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || {
            let mut session = self;
            handle.block_on(session.run(source, &out, &cancel))
        })
    }
}

/// Capture live traffic and stream the configured field of each message to `out`
///
/// Opens the configured interface with the port filter installed, then runs
/// until cancelled or until capture or decoding fails. The result tells a
/// cancellation ([`Error::is_cancelled`]) apart from every other ending.
pub async fn listen(
    config: SessionConfig,
    out: mpsc::Sender<RawBson>,
    cancel: CancellationToken,
) -> Result<()> {
    let session = Session::new(config)?;
    let id = session.id();
    let capture = session.config().capture.clone();

    let source = tokio::task::spawn_blocking(move || PcapSource::open_live(&capture))
        .await
        .map_err(|e| join_failure(id, e))??;

    session
        .spawn(source, out, cancel)
        .await
        .map_err(|e| join_failure(id, e))?
}

fn join_failure(id: Uuid, e: JoinError) -> Error {
    if e.is_panic() {
        error!(%id, "Capture task panicked");
        Error::TaskFailed("capture task panicked".to_string())
    } else {
        error!(%id, error = %e, "Failed to join capture task");
        Error::TaskFailed(format!("failed to join capture task: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use optap_capture::MemorySource;
    use optap_packet::{LinkType, PacketBuilder};
    use optap_wire::OpMsgBuilder;

    fn message_frame(doc: &bson::Document) -> RawFrame {
        let wm = OpMsgBuilder::new()
            .document(bson::to_vec(doc).unwrap())
            .build();
        RawFrame::new(
            PacketBuilder::loopback_v4(40000, 27017)
                .payload(wm)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_new_validates() {
        assert!(Session::new(SessionConfig::new("x")).is_ok());
        assert!(matches!(
            Session::new(SessionConfig::default()),
            Err(Error::Setup(_))
        ));
    }

    #[test]
    fn test_channel_capacity() {
        let session = Session::new(SessionConfig::new("x").with_channel_capacity(3)).unwrap();
        let (tx, _rx) = session.channel();
        assert_eq!(tx.max_capacity(), 3);
    }

    #[tokio::test]
    async fn test_run_emits_value() {
        let mut session = Session::new(SessionConfig::new("x")).unwrap();
        let source = MemorySource::new(
            LinkType::Ethernet,
            vec![message_frame(&doc! { "x": "hello" })],
        );
        let (tx, mut rx) = session.channel();

        session
            .run(source, &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(RawBson::String("hello".into())));
        assert_eq!(session.stats().emitted, 1);
    }

    #[tokio::test]
    async fn test_key_miss_is_not_an_error() {
        let mut session = Session::new(SessionConfig::new("missing")).unwrap();
        let source = MemorySource::new(LinkType::Ethernet, vec![message_frame(&doc! { "x": 1 })]);
        let (tx, mut rx) = session.channel();

        session
            .run(source, &tx, &CancellationToken::new())
            .await
            .unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, None);
        let stats = session.stats();
        assert_eq!(stats.decoded, 1);
        assert_eq!(stats.key_misses, 1);
        assert_eq!(stats.emitted, 0);
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let mut session = Session::new(SessionConfig::new("x")).unwrap();
        let source = MemorySource::new(LinkType::Ethernet, vec![message_frame(&doc! { "x": 1 })]);
        let (tx, rx) = session.channel();
        drop(rx);

        let err = session
            .run(source, &tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
        assert!(!err.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawn_runs_to_end() {
        let session = Session::new(SessionConfig::new("x")).unwrap();
        let stats = session.stats_handle();
        let (tx, mut rx) = session.channel();
        let source = MemorySource::new(
            LinkType::Ethernet,
            vec![message_frame(&doc! { "x": 1 }), message_frame(&doc! { "x": 2 })],
        );

        let handle = session.spawn(source, tx, CancellationToken::new());
        assert_eq!(rx.recv().await, Some(RawBson::Int32(1)));
        assert_eq!(rx.recv().await, Some(RawBson::Int32(2)));

        handle.await.unwrap().unwrap();
        assert_eq!(stats.snapshot().emitted, 2);
    }
}
