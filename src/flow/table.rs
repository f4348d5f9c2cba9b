use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use crate::error::Error;

/// Key identifying one unidirectional TCP stream.
///
/// Deliberately directional: the two halves of a connection hash to two
/// distinct keys and are tracked as two independent flows. A higher layer may
/// correlate them by matching a key against its [`reversed`](FlowKey::reversed)
/// counterpart.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct FlowKey {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub fn new(src_ip: IpAddr, src_port: u16, dst_ip: IpAddr, dst_port: u16) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
        }
    }

    /// The key of the opposite direction of the same connection.
    pub fn reversed(&self) -> Self {
        Self {
            src_ip: self.dst_ip,
            dst_ip: self.src_ip,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.src_ip, self.src_port, self.dst_ip, self.dst_port
        )
    }
}

/// Lifecycle state of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Active,
    Expired,
}

impl FlowState {
    /// Return a string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Active => "active",
            FlowState::Expired => "expired",
        }
    }
}

/// One in-progress stream reconstruction.
///
/// Payload bytes are appended in packet-arrival order. There is no
/// sequence-number reordering, gap detection, or retransmission handling; the
/// buffer is a best-effort transcript of what was captured, in the order it
/// was captured.
#[derive(Debug)]
pub struct Flow {
    key: FlowKey,
    buffer: Vec<u8>,
    last_seen: i64,
    state: FlowState,
}

impl Flow {
    pub fn new(key: FlowKey, now_us: i64) -> Self {
        Self {
            key,
            buffer: Vec::new(),
            last_seen: now_us,
            state: FlowState::Active,
        }
    }

    pub fn key(&self) -> FlowKey {
        self.key
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Timestamp (microseconds) of the most recent packet for this flow.
    pub fn last_seen(&self) -> i64 {
        self.last_seen
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Append payload and refresh the activity timestamp.
    pub fn append(&mut self, payload: &[u8], now_us: i64) {
        self.buffer.extend_from_slice(payload);
        self.last_seen = now_us;
    }

    /// Take the buffered bytes, leaving the flow alive with an empty buffer.
    pub fn take_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Mark the flow expired. Terminal; an expired flow never re-enters the
    /// table.
    pub fn expire(&mut self) {
        self.state = FlowState::Expired;
    }
}

/// Mapping from [`FlowKey`] to [`Flow`] with a bounded population.
///
/// Insertion at capacity evicts the least-recently-seen flow from the table
/// and hands it back to the caller, so its bytes can still be flushed through
/// the decode pipeline instead of vanishing.
pub struct FlowTable {
    flows: HashMap<FlowKey, Flow>,
    max_flows: usize,
}

impl FlowTable {
    pub fn new(max_flows: usize) -> Self {
        Self {
            flows: HashMap::with_capacity(max_flows.min(4096)),
            max_flows,
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn max_flows(&self) -> usize {
        self.max_flows
    }

    pub fn get(&self, key: &FlowKey) -> Option<&Flow> {
        self.flows.get(key)
    }

    /// Return the existing flow for `key`, or insert a new active one.
    ///
    /// When the table is full and `key` is unseen, the least-recently-seen
    /// flow is removed first and returned alongside the borrow so the caller
    /// can flush it. Fails with [`Error::ResourceExhausted`] only when nothing
    /// can be evicted (a zero-capacity table).
    pub fn lookup_or_create(
        &mut self,
        key: FlowKey,
        now_us: i64,
    ) -> Result<(Option<Flow>, &mut Flow), Error> {
        let mut evicted = None;
        if !self.flows.contains_key(&key) && self.flows.len() >= self.max_flows {
            evicted = self.evict_lru();
            if evicted.is_none() {
                return Err(Error::ResourceExhausted {
                    active: self.flows.len(),
                });
            }
        }

        let flow = self
            .flows
            .entry(key)
            .or_insert_with(|| Flow::new(key, now_us));
        Ok((evicted, flow))
    }

    /// Remove and return a flow if present.
    pub fn remove(&mut self, key: &FlowKey) -> Option<Flow> {
        self.flows.remove(key)
    }

    /// Remove and return the least-recently-seen flow.
    pub fn evict_lru(&mut self) -> Option<Flow> {
        let key = self
            .flows
            .values()
            .min_by_key(|flow| flow.last_seen)
            .map(|flow| flow.key)?;
        self.flows.remove(&key)
    }

    /// Lazily iterate over flows whose `last_seen` is older than `threshold`.
    ///
    /// Borrows the table, so each sweep cycle restarts the scan.
    pub fn idle_since(&self, threshold_us: i64) -> impl Iterator<Item = &Flow> + '_ {
        self.flows
            .values()
            .filter(move |flow| flow.last_seen < threshold_us)
    }

    /// Drain every flow out of the table (shutdown path).
    pub fn drain(&mut self) -> impl Iterator<Item = Flow> + '_ {
        self.flows.drain().map(|(_, flow)| flow)
    }
}
