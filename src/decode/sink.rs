//! Output seams between reassembly, decoding, and the logging collaborator.
//!
//! [`FlushSink`] consumes raw flow flushes from the engine; [`RecordSink`]
//! consumes decoded records. Keeping both behind traits lets the decode stage
//! run inline (tests, simple embeddings) or on a worker pool without the
//! engine knowing the difference.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{decode_flush, DecodedRecord, DecoderRegistry};
use crate::flow::FlowFlush;

/// Consumer of decoded records.
pub trait RecordSink: Send + Sync {
    /// Take ownership of a finished record.
    ///
    /// Must not block for long; it runs on the decode path.
    fn emit(&self, record: DecodedRecord);
}

/// Consumer of raw flow flushes (expiry, forced flush, close, eviction).
pub trait FlushSink: Send + Sync {
    fn submit(&self, flush: FlowFlush);
}

/// Records queued onto an mpsc channel for the logging collaborator.
///
/// A disconnected receiver drops records with a debug log; a passive engine
/// never treats output loss as fatal.
pub struct ChannelSink {
    tx: Sender<DecodedRecord>,
}

impl ChannelSink {
    pub fn new(tx: Sender<DecodedRecord>) -> Self {
        Self { tx }
    }
}

impl RecordSink for ChannelSink {
    fn emit(&self, record: DecodedRecord) {
        if self.tx.send(record).is_err() {
            debug!("record receiver disconnected, dropping record");
        }
    }
}

/// In-memory record sink for tests and small embeddings.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<DecodedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all records emitted so far.
    pub fn take(&self) -> Vec<DecodedRecord> {
        std::mem::take(&mut self.records.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: DecodedRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// Synchronous flush handling: decode on the caller's thread.
///
/// Suitable when decoders are cheap relative to the packet rate; use
/// [`DecodePool`](super::DecodePool) to keep slow decoders off the ingestion
/// path.
pub struct InlineDecode {
    registry: DecoderRegistry,
    sink: Arc<dyn RecordSink>,
}

impl InlineDecode {
    pub fn new(registry: DecoderRegistry, sink: Arc<dyn RecordSink>) -> Self {
        Self { registry, sink }
    }
}

impl FlushSink for InlineDecode {
    fn submit(&self, flush: FlowFlush) {
        decode_flush(&self.registry, self.sink.as_ref(), flush);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::TelnetDecoder;
    use crate::flow::{FlowKey, FlushReason};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::mpsc;

    fn telnet_key() -> FlowKey {
        FlowKey::new(
            IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)),
            4000,
            IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8)),
            23,
        )
    }

    fn transcript_flush() -> FlowFlush {
        FlowFlush {
            key: telnet_key(),
            data: b"login: root\r\npassword: hunter2\r\n".to_vec(),
            reason: FlushReason::IdleTimeout,
        }
    }

    // Test 1: InlineDecode decodes and forwards to the record sink
    #[test]
    fn test_inline_decode() {
        let mut registry = DecoderRegistry::new();
        registry.register(TelnetDecoder::default());
        let sink = Arc::new(MemorySink::new());
        let inline = InlineDecode::new(registry, sink.clone());

        inline.submit(transcript_flush());

        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].protocol, "telnet");
        assert_eq!(records[0].text, b"login: root\r\npassword: hunter2\r\n");
    }

    // Test 2: ChannelSink delivers through the channel
    #[test]
    fn test_channel_sink() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink::new(tx);

        sink.emit(DecodedRecord {
            key: telnet_key(),
            protocol: "telnet",
            text: b"hi\r\n".to_vec(),
        });

        let record = rx.try_recv().unwrap();
        assert_eq!(record.text, b"hi\r\n");
    }

    // Test 3: ChannelSink survives a dropped receiver
    #[test]
    fn test_channel_sink_disconnected() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let sink = ChannelSink::new(tx);

        sink.emit(DecodedRecord {
            key: telnet_key(),
            protocol: "telnet",
            text: b"hi\r\n".to_vec(),
        });
    }

    // Test 4: MemorySink take drains
    #[test]
    fn test_memory_sink_take() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(DecodedRecord {
            key: telnet_key(),
            protocol: "telnet",
            text: b"hi\r\n".to_vec(),
        });
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
