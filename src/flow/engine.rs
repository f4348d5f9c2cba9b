use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use crate::decode::FlushSink;
use crate::error::{Error, Result};
use crate::packet::{parse_datagram, TcpSegment};

use super::{FlowKey, FlowTable};

/// Why a flow buffer left the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// No packet for longer than the idle timeout.
    IdleTimeout,
    /// The per-flow buffer cap was reached; the flow stays alive.
    BufferFull,
    /// FIN or RST observed on the flow.
    Closed,
    /// Evicted to make room for a new flow.
    Evicted,
    /// Engine shutdown drain.
    Shutdown,
}

impl FlushReason {
    /// Return a string representation of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::IdleTimeout => "idle_timeout",
            FlushReason::BufferFull => "buffer_full",
            FlushReason::Closed => "closed",
            FlushReason::Evicted => "evicted",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

/// A reassembled buffer leaving the engine for the decode pipeline.
///
/// Ownership of the bytes transfers atomically from the flow table to the
/// flush sink; the engine keeps nothing behind.
#[derive(Debug)]
pub struct FlowFlush {
    pub key: FlowKey,
    pub data: Vec<u8>,
    pub reason: FlushReason,
}

/// Configuration for the [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Flow idle timeout (microseconds).
    pub idle_timeout_us: i64,
    /// Maximum reassembly buffer per flow (bytes); exceeding it forces a
    /// flush.
    pub max_flow_buffer: usize,
    /// Maximum normalized output per decoded record (bytes).
    pub max_output_bytes: usize,
    /// Minimum line count before a transcript is considered interesting.
    pub min_interesting_lines: usize,
    /// Maximum concurrent flows before LRU eviction kicks in.
    pub max_flows: usize,
    /// Cadence of the background sweeper.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout_us: 30_000_000,        // 30 seconds
            max_flow_buffer: 1024 * 1024,       // 1 MB per flow
            max_output_bytes: 4096,
            min_interesting_lines: 2,
            max_flows: 4096,
            sweep_interval: Duration::from_secs(5),
        }
    }
}

/// Current wall-clock time in microseconds since the Unix epoch.
///
/// Fallback timestamp for callers without capture timestamps.
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Best-effort stream reconstruction engine.
///
/// Consumes captured TCP segments, appends their payloads to per-flow buffers
/// in arrival order, and hands buffers to the flush sink when a flow expires,
/// closes, overflows its buffer cap, or is evicted. Decoding never happens on
/// the per-packet path.
pub struct Engine {
    table: FlowTable,
    flush_sink: Arc<dyn FlushSink>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig, flush_sink: Arc<dyn FlushSink>) -> Self {
        Self {
            table: FlowTable::new(config.max_flows),
            flush_sink,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of flows currently tracked.
    pub fn active_flows(&self) -> usize {
        self.table.len()
    }

    /// Ingest a raw IP datagram captured at `ts_us`.
    ///
    /// Malformed or non-TCP datagrams are dropped without state change; the
    /// returned error is informational and ingestion may simply continue.
    pub fn ingest_datagram(&mut self, data: &[u8], ts_us: i64) -> Result<()> {
        let segment = match parse_datagram(data) {
            Ok(segment) => segment,
            Err(e) => {
                debug!(error = %e, bytes = data.len(), "dropping malformed packet");
                return Err(Error::Malformed(e));
            }
        };
        self.ingest_segment(&segment, ts_us)
    }

    /// Ingest an already-parsed TCP segment captured at `ts_us`.
    ///
    /// Payload bytes are appended in arrival order; there is no
    /// sequence-number reordering or gap handling. An empty payload creates no
    /// flow; FIN/RST close an existing flow once its final payload (if any)
    /// has been appended.
    pub fn ingest_segment(&mut self, segment: &TcpSegment<'_>, ts_us: i64) -> Result<()> {
        let key = FlowKey::new(
            segment.src_ip,
            segment.src_port,
            segment.dst_ip,
            segment.dst_port,
        );

        if !segment.payload.is_empty() {
            let (evicted, flow) = self.table.lookup_or_create(key, ts_us)?;
            flow.append(segment.payload, ts_us);

            let overflow = if flow.buffer_len() >= self.config.max_flow_buffer {
                Some(flow.take_buffer())
            } else {
                None
            };

            if let Some(mut old) = evicted {
                old.expire();
                let flush = FlowFlush {
                    key: old.key(),
                    data: old.take_buffer(),
                    reason: FlushReason::Evicted,
                };
                debug!(flow = %flush.key, "flow table full, evicting oldest flow");
                self.submit(flush);
            }

            if let Some(data) = overflow {
                trace!(flow = %key, bytes = data.len(), "flow buffer cap reached, flushing");
                self.submit(FlowFlush {
                    key,
                    data,
                    reason: FlushReason::BufferFull,
                });
            }
        }

        if segment.fin || segment.rst {
            self.close(&key);
        }

        Ok(())
    }

    /// Explicit-close fast path: flush and forget a flow without waiting for
    /// the idle timeout. No-op for unknown keys.
    pub fn close(&mut self, key: &FlowKey) {
        if let Some(mut flow) = self.table.remove(key) {
            flow.expire();
            trace!(flow = %key, "flow closed");
            self.submit(FlowFlush {
                key: flow.key(),
                data: flow.take_buffer(),
                reason: FlushReason::Closed,
            });
        }
    }

    /// Expire every flow idle for longer than the configured timeout.
    ///
    /// Returns the number of flows expired. Idempotent per flow: once removed
    /// here, a flow cannot expire again.
    pub fn sweep(&mut self, now_us: i64) -> usize {
        let threshold = now_us - self.config.idle_timeout_us;
        let idle: Vec<FlowKey> = self.table.idle_since(threshold).map(|f| f.key()).collect();

        for key in &idle {
            if let Some(mut flow) = self.table.remove(key) {
                flow.expire();
                self.submit(FlowFlush {
                    key: flow.key(),
                    data: flow.take_buffer(),
                    reason: FlushReason::IdleTimeout,
                });
            }
        }

        if !idle.is_empty() {
            debug!(expired = idle.len(), remaining = self.table.len(), "sweep cycle");
        }
        idle.len()
    }

    /// Drain every remaining flow through the sink. Shutdown path.
    pub fn flush_all(&mut self) {
        let flushes: Vec<FlowFlush> = self
            .table
            .drain()
            .map(|mut flow| {
                flow.expire();
                FlowFlush {
                    key: flow.key(),
                    data: flow.take_buffer(),
                    reason: FlushReason::Shutdown,
                }
            })
            .collect();

        for flush in flushes {
            self.submit(flush);
        }
    }

    /// Hand a flush to the sink, discarding empty buffers (a flow that was
    /// already force-flushed may expire with nothing new to say).
    fn submit(&self, flush: FlowFlush) {
        if flush.data.is_empty() {
            return;
        }
        self.flush_sink.submit(flush);
    }
}
