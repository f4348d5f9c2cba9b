//! Protocol decoding of reassembled flow buffers.
//!
//! A [`Decoder`] turns one raw reassembled buffer into normalized,
//! human-readable bytes, or rejects it as uninteresting by returning `None`.
//! Decoders are registered in a [`DecoderRegistry`] keyed by TCP port and are
//! invoked only at flush/expire boundaries, never per packet.
//!
//! ## Components
//!
//! - [`Decoder`] - Trait for protocol-specific decoders
//! - [`DecoderRegistry`] - Port-keyed decoder dispatch
//! - [`DecodedRecord`] - Normalized output handed to a [`RecordSink`]
//! - [`TelnetDecoder`] - Reference decoder (option stripping, ASCII checks)
//! - [`InlineDecode`] / [`DecodePool`] - Synchronous and pooled flush handling

mod pool;
mod sink;
mod telnet;

pub use pool::DecodePool;
pub use sink::{ChannelSink, FlushSink, InlineDecode, MemorySink, RecordSink};
pub use telnet::TelnetDecoder;

use smallvec::SmallVec;
use tracing::trace;

use crate::flow::{FlowFlush, FlowKey};

/// Normalized output of a decoder for one flow.
///
/// Immutable once produced; ownership passes to the logging collaborator
/// through a [`RecordSink`].
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub key: FlowKey,
    /// Name of the decoder that produced the text.
    pub protocol: &'static str,
    /// Normalized text, already bounded by the decoder's output limit.
    pub text: Vec<u8>,
}

impl DecodedRecord {
    /// Length of the normalized text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Trait for decoding a reassembled buffer into normalized application data.
///
/// Decoders are stateless and operate on one complete buffer at a time.
/// Returning `None` means "nothing interesting here" and is a normal outcome,
/// not an error.
pub trait Decoder: Send + Sync {
    /// Protocol identifier (e.g., "telnet").
    fn name(&self) -> &'static str;

    /// Port this decoder claims when registered without an explicit port.
    fn default_port(&self) -> u16;

    /// Decode raw reassembled bytes into normalized text.
    fn decode(&self, raw: &[u8]) -> Option<Vec<u8>>;
}

/// Registry of decoders keyed by TCP port.
pub struct DecoderRegistry {
    decoders: SmallVec<[(u16, Box<dyn Decoder>); 4]>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self {
            decoders: SmallVec::new(),
        }
    }

    /// Register a decoder on its default port.
    pub fn register<D: Decoder + 'static>(&mut self, decoder: D) {
        let port = decoder.default_port();
        self.register_on(port, decoder);
    }

    /// Register a decoder on an explicit port, shadowing any earlier
    /// registration for that port.
    pub fn register_on<D: Decoder + 'static>(&mut self, port: u16, decoder: D) {
        self.decoders.retain(|(p, _)| *p != port);
        self.decoders.push((port, Box::new(decoder)));
    }

    /// Look up a decoder by port.
    pub fn get(&self, port: u16) -> Option<&dyn Decoder> {
        self.decoders
            .iter()
            .find(|(p, _)| *p == port)
            .map(|(_, d)| d.as_ref())
    }

    /// Find the decoder for a flow.
    ///
    /// The destination port is consulted first, then the source port: a
    /// half-duplex server-to-client flow carries the service port as its
    /// source.
    pub fn for_flow(&self, key: &FlowKey) -> Option<&dyn Decoder> {
        self.get(key.dst_port).or_else(|| self.get(key.src_port))
    }

    /// Registered (port, decoder-name) pairs.
    pub fn entries(&self) -> Vec<(u16, &'static str)> {
        self.decoders.iter().map(|(p, d)| (*p, d.name())).collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one flushed flow and emit the result, if any, to the sink.
///
/// Flows without a registered decoder and decodes that reject the buffer are
/// dropped silently (logged at trace level).
pub fn decode_flush(registry: &DecoderRegistry, sink: &dyn RecordSink, flush: FlowFlush) {
    let Some(decoder) = registry.for_flow(&flush.key) else {
        trace!(flow = %flush.key, "no decoder registered, dropping flush");
        return;
    };

    match decoder.decode(&flush.data) {
        Some(text) => sink.emit(DecodedRecord {
            key: flush.key,
            protocol: decoder.name(),
            text,
        }),
        None => trace!(
            flow = %flush.key,
            decoder = decoder.name(),
            bytes = flush.data.len(),
            "decode rejected buffer"
        ),
    }
}
