//! # flowsift
//!
//! Passive, best-effort TCP stream reconstruction with pluggable
//! application-layer decoders.
//!
//! Given a sequence of captured IP/TCP packets belonging to many concurrent
//! connections, flowsift reassembles each connection's byte stream on a
//! half-duplex, arrival-order basis and hands reassembled buffers to
//! protocol-specific decoders that extract human-readable application data
//! (the built-in reference decoder reconstructs Telnet session transcripts).
//!
//! Capture itself, filter compilation, and output persistence are external
//! collaborators: this crate starts at "here is a raw IP datagram and its
//! capture timestamp" and ends at "here is a decoded record for your sink".
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowsift::decode::{DecoderRegistry, InlineDecode, MemorySink, TelnetDecoder};
//! use flowsift::flow::{now_micros, Engine, EngineConfig};
//!
//! let config = EngineConfig::default();
//!
//! let mut registry = DecoderRegistry::new();
//! registry.register(TelnetDecoder::from_config(&config));
//!
//! let sink = Arc::new(MemorySink::new());
//! let flush = Arc::new(InlineDecode::new(registry, sink.clone()));
//! let mut engine = Engine::new(config, flush);
//!
//! // From the capture loop:
//! // engine.ingest_datagram(&frame, capture_ts_us)?;
//!
//! // Periodically (or via flow::Sweeper on its own thread):
//! engine.sweep(now_micros());
//!
//! for record in sink.take() {
//!     println!("{} [{}]", record.key, record.protocol);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                            flowsift                              |
//! +------------------------------------------------------------------+
//! |  packet/  - raw IPv4/IPv6 + TCP datagram parsing (etherparse)    |
//! |  flow/    - FlowKey, FlowTable, Engine, background Sweeper       |
//! |  decode/  - Decoder trait, registry, Telnet decoder, sinks,      |
//! |             bounded decode worker pool                           |
//! |  error/   - Error types                                          |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Design notes
//!
//! - **Best-effort**: payload is appended in packet-arrival order; there is
//!   no sequence-number reordering, retransmission detection, checksum
//!   validation, or fragment reassembly. Lost or reordered capture degrades
//!   the transcript instead of halting the pipeline.
//! - **Half-duplex**: each direction of a connection is an independent flow.
//!   Correlate the two halves with [`flow::FlowKey::reversed`] if a merged
//!   session view is wanted.
//! - **Non-blocking decode**: decoders run only at flush/expire boundaries,
//!   inline or on a bounded [`decode::DecodePool`], never on the per-packet
//!   path.

pub mod decode;
pub mod error;
pub mod flow;
pub mod packet;

// Re-export commonly used types at crate root for convenience
pub use decode::{
    ChannelSink, DecodePool, DecodedRecord, Decoder, DecoderRegistry, FlushSink, InlineDecode,
    MemorySink, RecordSink, TelnetDecoder,
};
pub use error::{Error, PacketError, Result};
pub use flow::{
    now_micros, Engine, EngineConfig, Flow, FlowFlush, FlowKey, FlowState, FlowTable, FlushReason,
    Sweeper,
};
pub use packet::{parse_datagram, TcpSegment, IP_PROTO_TCP};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
