//! Background timeout sweeper.
//!
//! Packet arrival alone never expires a flow; a connection that simply goes
//! quiet would otherwise sit in the table forever. The sweeper gives
//! [`Engine::sweep`] a cadence on its own thread, serialized with ingestion
//! through the shared mutex, and can be stopped cleanly between cycles.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tracing::trace;

use super::engine::{now_micros, Engine};

/// Handle to a running background sweeper.
pub struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a sweeper calling `engine.sweep` at the cadence configured in
    /// the engine's [`EngineConfig`](super::EngineConfig) (`sweep_interval`).
    pub fn spawn(engine: Arc<Mutex<Engine>>) -> Self {
        let interval = engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .config()
            .sweep_interval;

        let (stop, rx) = channel::<()>();
        let handle = std::thread::Builder::new()
            .name("flow-sweeper".to_string())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        // A panicking ingester poisons the mutex; the table
                        // is still sound (flushes happen after mutation), so
                        // keep sweeping rather than dying silently.
                        let expired = engine
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .sweep(now_micros());
                        if expired > 0 {
                            trace!(expired, "sweeper cycle");
                        }
                    }
                    // Stop signal, or the handle was dropped.
                    _ => break,
                }
            })
            .expect("failed to spawn sweeper thread");

        Self { stop, handle }
    }

    /// Stop the sweeper between cycles and wait for the thread to exit.
    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}
