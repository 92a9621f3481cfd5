//! Blocking pump loop.
//!
//! ## Per iteration
//!
//! ```text
//! 1. Drain pending FifoEvents (non-blocking)
//! 2. Coalesce DataWrite requests: the largest one wins
//! 3. Clamp the request to the writer's free space
//! 4. Generate that many samples and write them
//! 5. Nothing requested → sleep idle_sleep_ms
//! ```
//!
//! The loop runs on its own thread and hands the `FifoWriter` back when
//! `running` clears, so the FIFO can be reunited and resized.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

use super::{PumpConfig, WriteMode};
use crate::buffering::{FifoWriter, Sample};
use crate::events::FifoEvent;
use crate::source::GeneratorHandle;

/// Samples generated per lock of the generator.
const GENERATE_BATCH: usize = 1024;

pub struct PumpDiagnostics {
    pub write_requests: AtomicUsize,
    pub samples_generated: AtomicUsize,
    pub samples_released: AtomicUsize,
    pub clamped_requests: AtomicUsize,
    pub lagged_events: AtomicUsize,
    pub idle_sleeps: AtomicUsize,
}

impl Default for PumpDiagnostics {
    fn default() -> Self {
        Self {
            write_requests: AtomicUsize::new(0),
            samples_generated: AtomicUsize::new(0),
            samples_released: AtomicUsize::new(0),
            clamped_requests: AtomicUsize::new(0),
            lagged_events: AtomicUsize::new(0),
            idle_sleeps: AtomicUsize::new(0),
        }
    }
}

impl PumpDiagnostics {
    pub fn reset(&self) {
        self.write_requests.store(0, Ordering::Relaxed);
        self.samples_generated.store(0, Ordering::Relaxed);
        self.samples_released.store(0, Ordering::Relaxed);
        self.clamped_requests.store(0, Ordering::Relaxed);
        self.lagged_events.store(0, Ordering::Relaxed);
        self.idle_sleeps.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            write_requests: self.write_requests.load(Ordering::Relaxed),
            samples_generated: self.samples_generated.load(Ordering::Relaxed),
            samples_released: self.samples_released.load(Ordering::Relaxed),
            clamped_requests: self.clamped_requests.load(Ordering::Relaxed),
            lagged_events: self.lagged_events.load(Ordering::Relaxed),
            idle_sleeps: self.idle_sleeps.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub write_requests: usize,
    pub samples_generated: usize,
    pub samples_released: usize,
    pub clamped_requests: usize,
    pub lagged_events: usize,
    pub idle_sleeps: usize,
}

/// All context the pump needs, passed as one struct so the closure stays tidy.
pub struct PumpContext {
    pub config: PumpConfig,
    pub generator: GeneratorHandle,
    pub writer: FifoWriter,
    /// Subscribed before the thread starts so no early signal is missed.
    pub events: broadcast::Receiver<FifoEvent>,
    pub running: Arc<AtomicBool>,
    pub diagnostics: Arc<PumpDiagnostics>,
}

/// Run the pump until `ctx.running` becomes false, then return the writer.
pub fn run(mut ctx: PumpContext) -> FifoWriter {
    info!(
        capacity = ctx.writer.capacity(),
        chunk_size = ctx.writer.chunk_size(),
        "pump started"
    );

    let mut scratch = vec![Sample::ZERO; GENERATE_BATCH];
    let idle = Duration::from_millis(ctx.config.idle_sleep_ms);

    loop {
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        match pending_request(&mut ctx) {
            Some(requested) => {
                fill_fifo(&mut ctx, &mut scratch, requested);
            }
            None => {
                ctx.diagnostics.idle_sleeps.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(idle);
            }
        }
    }

    let snap = ctx.diagnostics.snapshot();
    info!(
        write_requests = snap.write_requests,
        samples_generated = snap.samples_generated,
        samples_released = snap.samples_released,
        clamped_requests = snap.clamped_requests,
        lagged_events = snap.lagged_events,
        "pump stopped — diagnostics"
    );

    ctx.writer
}

/// Drain every queued event and return the coalesced write request.
fn pending_request(ctx: &mut PumpContext) -> Option<usize> {
    let mut requested: Option<usize> = None;

    loop {
        match ctx.events.try_recv() {
            Ok(FifoEvent::DataWrite { available }) => {
                ctx.diagnostics
                    .write_requests
                    .fetch_add(1, Ordering::Relaxed);
                requested = Some(requested.map_or(available, |r| r.max(available)));
            }
            Ok(FifoEvent::DataRead { count }) => {
                ctx.diagnostics
                    .samples_released
                    .fetch_add(count, Ordering::Relaxed);
            }
            Err(TryRecvError::Lagged(missed)) => {
                // Lost signals may include a DataWrite; ask for everything
                // and let the free-space clamp decide.
                warn!(missed, "pump lagged behind FIFO events");
                ctx.diagnostics
                    .lagged_events
                    .fetch_add(missed as usize, Ordering::Relaxed);
                requested = Some(ctx.writer.capacity());
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    requested
}

/// Write `min(requested, free_space)` generated samples. Returns the count.
fn fill_fifo(ctx: &mut PumpContext, scratch: &mut [Sample], requested: usize) -> usize {
    let free = ctx.writer.free_space();
    let n = requested.min(free);
    if n < requested {
        ctx.diagnostics
            .clamped_requests
            .fetch_add(1, Ordering::Relaxed);
        debug!(requested, free, "write request clamped to free space");
    }

    let mut generator = ctx.generator.0.lock();
    let mut remaining = n;
    while remaining > 0 {
        let batch = remaining.min(scratch.len());
        generator.fill(&mut scratch[..batch]);
        match ctx.config.write_mode {
            WriteMode::Copy => {
                for &sample in &scratch[..batch] {
                    ctx.writer.write(sample);
                }
            }
            WriteMode::InPlace => {
                for &sample in &scratch[..batch] {
                    ctx.writer.stage(sample);
                    ctx.writer.bump_index();
                }
            }
        }
        remaining -= batch;
    }

    ctx.diagnostics
        .samples_generated
        .fetch_add(n, Ordering::Relaxed);
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::buffering::SampleSourceFifo;
    use crate::source::RampGenerator;

    fn context(writer: FifoWriter, write_mode: WriteMode) -> PumpContext {
        let events = writer.subscribe();
        PumpContext {
            config: PumpConfig {
                idle_sleep_ms: 1,
                write_mode,
            },
            generator: GeneratorHandle::new(RampGenerator::new()),
            writer,
            events,
            running: Arc::new(AtomicBool::new(true)),
            diagnostics: Arc::new(PumpDiagnostics::default()),
        }
    }

    #[test]
    fn nothing_pending_means_no_request() {
        let (writer, _reader) = SampleSourceFifo::new(1024, 64).split();
        let mut ctx = context(writer, WriteMode::Copy);
        assert_eq!(pending_request(&mut ctx), None);
    }

    #[test]
    fn largest_data_write_wins() {
        let (writer, mut reader) = SampleSourceFifo::new(1024, 64).split();
        let mut ctx = context(writer, WriteMode::Copy);

        reader.read_advance(10); // init → 1024
        reader.read_advance(5); // delta 113 → 512

        assert_eq!(pending_request(&mut ctx), Some(1024));
        let snap = ctx.diagnostics.snapshot();
        assert_eq!(snap.write_requests, 2);
        assert_eq!(snap.samples_released, 15);
    }

    #[test]
    fn fill_is_clamped_to_free_space() {
        let (writer, mut reader) = SampleSourceFifo::new(1024, 64).split();
        let mut ctx = context(writer, WriteMode::Copy);
        let mut scratch = vec![Sample::ZERO; GENERATE_BATCH];

        reader.read_advance(10);
        let requested = pending_request(&mut ctx).unwrap();
        let written = fill_fifo(&mut ctx, &mut scratch, requested);

        // occupancy 128 - 10 = 118, one chunk kept behind the reader
        assert_eq!(written, 1024 - 118 - 64);
        assert_eq!(ctx.writer.free_space(), 0);
        assert_eq!(ctx.writer.write_iterator(), 970);
        assert_eq!(ctx.diagnostics.snapshot().clamped_requests, 1);
    }

    #[test]
    fn in_place_mode_writes_same_stream() {
        let (writer, reader) = SampleSourceFifo::new(256, 64).split();
        let mut ctx = context(writer, WriteMode::InPlace);
        let mut scratch = vec![Sample::ZERO; 16];

        let written = fill_fifo(&mut ctx, &mut scratch, 40);
        assert_eq!(written, 40);

        let samples = reader.window(256 + 128 + 40, 40).to_vec();
        for (i, pair) in samples.windows(2).enumerate() {
            assert!(RampGenerator::is_successor(pair[0], pair[1]), "break at {i}");
        }
        assert_eq!(RampGenerator::counter_of(samples[0]), 0);
    }

    #[test]
    fn lag_requests_everything() {
        let (writer, mut reader) = SampleSourceFifo::new(4096, 1024).split();
        let mut ctx = context(writer, WriteMode::Copy);

        // Overflow the 1024-slot event channel.
        for _ in 0..600 {
            reader.read_advance(1);
        }
        assert_eq!(pending_request(&mut ctx), Some(4096));
        assert!(ctx.diagnostics.snapshot().lagged_events > 0);
    }

    #[test]
    fn run_returns_writer_when_stopped() {
        let (writer, _reader) = SampleSourceFifo::new(256, 64).split();
        let ctx = context(writer, WriteMode::Copy);
        ctx.running.store(false, Ordering::SeqCst);
        let writer = run(ctx);
        assert_eq!(writer.write_iterator(), 128);
    }
}
