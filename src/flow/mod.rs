//! Flow tracking and best-effort stream reassembly.
//!
//! ## Components
//!
//! - [`FlowKey`] / [`Flow`] / [`FlowTable`] - per-connection reassembly state
//! - [`Engine`] - consumes packets, manages buffers, emits flushes
//! - [`Sweeper`] - periodic expiry of idle flows
//!
//! Reassembly is deliberately best-effort: payload is appended in
//! packet-arrival order with no sequence-number reordering, gap detection, or
//! retransmission handling. Out-of-order capture produces out-of-order
//! transcript bytes rather than an error.
//!
//! ## Example
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
//! let flush_sink = Arc::new(InlineDecode::new(registry, sink.clone()));
//! let mut engine = Engine::new(config, flush_sink);
//!
//! // Feed captured datagrams...
//! // engine.ingest_datagram(&frame, now_micros());
//! engine.sweep(now_micros());
//! ```

mod engine;
mod sweeper;
mod table;

pub use engine::{now_micros, Engine, EngineConfig, FlowFlush, FlushReason};
pub use sweeper::Sweeper;
pub use table::{Flow, FlowKey, FlowState, FlowTable};
