//! Bounded decode worker pool.
//!
//! Decoding happens only at flush/expire boundaries, but a slow decoder must
//! still never stall packet ingestion. The pool puts a bounded queue between
//! the engine and a fixed set of worker threads; when the queue is full the
//! flush is dropped (best-effort engine, same policy as every other overload
//! path here).

use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, trace};

use super::{decode_flush, DecoderRegistry, FlushSink, RecordSink};
use crate::flow::FlowFlush;

/// Fixed-size pool of decode workers fed by a bounded queue.
pub struct DecodePool {
    tx: Mutex<Option<SyncSender<FlowFlush>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DecodePool {
    /// Spawn `workers` decode threads behind a queue of `queue_depth` flushes.
    pub fn new(
        workers: usize,
        queue_depth: usize,
        registry: Arc<DecoderRegistry>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let (tx, rx) = sync_channel::<FlowFlush>(queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|i| {
                let rx = Arc::clone(&rx);
                let registry = Arc::clone(&registry);
                let sink = Arc::clone(&sink);
                std::thread::Builder::new()
                    .name(format!("decode-{i}"))
                    .spawn(move || loop {
                        let flush = {
                            let guard = rx.lock().unwrap();
                            guard.recv()
                        };
                        match flush {
                            Ok(flush) => {
                                trace!(flow = %flush.key, "decoding flushed flow");
                                decode_flush(&registry, sink.as_ref(), flush);
                            }
                            // Sender gone: pool is shutting down.
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn decode worker")
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Stop accepting flushes, let in-flight decodes finish, and join the
    /// workers. Safe to call more than once.
    pub fn shutdown(&self) {
        self.tx.lock().unwrap().take();
        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl FlushSink for DecodePool {
    fn submit(&self, flush: FlowFlush) {
        let guard = self.tx.lock().unwrap();
        let Some(tx) = guard.as_ref() else {
            debug!(flow = %flush.key, "decode pool shut down, dropping flush");
            return;
        };
        match tx.try_send(flush) {
            Ok(()) => {}
            Err(TrySendError::Full(flush)) => {
                debug!(flow = %flush.key, "decode queue full, dropping flush");
            }
            Err(TrySendError::Disconnected(flush)) => {
                debug!(flow = %flush.key, "decode workers gone, dropping flush");
            }
        }
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
