//! `SourcePump` — producer-side lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! SourcePump::new()
//!     └─► start(writer)      → pump thread spawned, status = Running
//!         └─► stop()         → running=false, thread joined, writer returned,
//!                              status = Stopped
//! ```
//!
//! `start()`/`stop()` in the wrong state return an error rather than
//! panicking. The writer comes back from `stop()` so it can be reunited with
//! its reader and the FIFO resized while both sides are quiet.

pub mod pump;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    buffering::FifoWriter,
    error::{FifoError, Result},
    events::{PumpStatus, PumpStatusEvent},
    source::GeneratorHandle,
};

/// Broadcast channel capacity for status events.
const STATUS_CHANNEL_CAP: usize = 64;

/// How the pump commits samples to the FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteMode {
    /// `FifoWriter::write` per sample.
    Copy,
    /// `FifoWriter::stage` then `FifoWriter::bump_index` per sample.
    InPlace,
}

/// Configuration for `SourcePump`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PumpConfig {
    /// Sleep when no write request is pending (ms). Default: 1.
    pub idle_sleep_ms: u64,
    /// Default: `Copy`.
    pub write_mode: WriteMode,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 1,
            write_mode: WriteMode::Copy,
        }
    }
}

/// Drives a `SampleGenerator` into a `FifoWriter` on a background thread,
/// writing only when the FIFO signals free space.
///
/// `SourcePump` is `Send + Sync`; share it behind an `Arc` if the stop
/// request comes from another task.
pub struct SourcePump {
    config: PumpConfig,
    generator: GeneratorHandle,
    /// `true` while the pump thread is active.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<PumpStatus>>,
    status_tx: broadcast::Sender<PumpStatusEvent>,
    diagnostics: Arc<pump::PumpDiagnostics>,
    worker: Mutex<Option<JoinHandle<FifoWriter>>>,
}

impl SourcePump {
    /// Create a pump. Does not start it — call `start()` with a writer.
    pub fn new(config: PumpConfig, generator: GeneratorHandle) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAP);
        Self {
            config,
            generator,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(PumpStatus::Idle)),
            status_tx,
            diagnostics: Arc::new(pump::PumpDiagnostics::default()),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the pump thread feeding `writer`.
    ///
    /// # Errors
    /// - `FifoError::AlreadyRunning` if already started; `writer` is dropped.
    /// - `FifoError::Io` if the OS refuses to spawn the thread.
    pub fn start(&self, writer: FifoWriter) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(FifoError::AlreadyRunning);
        }

        self.diagnostics.reset();
        self.running.store(true, Ordering::SeqCst);

        let ctx = pump::PumpContext {
            config: self.config.clone(),
            generator: self.generator.clone(),
            events: writer.subscribe(),
            writer,
            running: Arc::clone(&self.running),
            diagnostics: Arc::clone(&self.diagnostics),
        };

        let handle = std::thread::Builder::new()
            .name("fifo-pump".into())
            .spawn(move || pump::run(ctx))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(PumpStatus::Error, Some(e.to_string()));
                FifoError::Io(e)
            })?;

        *worker = Some(handle);
        self.set_status(PumpStatus::Running, None);
        info!("pump running");
        Ok(())
    }

    /// Stop the pump thread and take the writer back.
    ///
    /// # Errors
    /// - `FifoError::NotRunning` if not started.
    /// - `FifoError::PumpFailed` if the thread panicked; the writer is lost.
    pub fn stop(&self) -> Result<FifoWriter> {
        let handle = self.worker.lock().take().ok_or(FifoError::NotRunning)?;

        self.running.store(false, Ordering::SeqCst);
        info!("pump stop requested");

        match handle.join() {
            Ok(writer) => {
                self.set_status(PumpStatus::Stopped, None);
                Ok(writer)
            }
            Err(_) => {
                error!("pump thread panicked");
                self.set_status(PumpStatus::Error, Some("pump thread panicked".into()));
                Err(FifoError::PumpFailed("pump thread panicked".into()))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current pump status (snapshot).
    pub fn status(&self) -> PumpStatus {
        *self.status.lock()
    }

    /// Subscribe to pump status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<PumpStatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn generator(&self) -> &GeneratorHandle {
        &self.generator
    }

    /// Snapshot of pump counters for observability.
    pub fn diagnostics_snapshot(&self) -> pump::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn set_status(&self, new_status: PumpStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(PumpStatusEvent {
            status: new_status,
            detail,
        });
    }
}

impl Drop for SourcePump {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.get_mut().take() {
            let _ = handle.join();
        }
    }
}
