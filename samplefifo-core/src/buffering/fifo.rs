//! Mirrored sample FIFO.
//!
//! ## Layout
//!
//! ```text
//!   0            ir          iw   capacity       capacity+ir          2*capacity
//!   |------------|-----------|----|--------------|-----------------------|
//!   |<------------ primary ------>|<------------- mirror --------------->|
//! ```
//!
//! Every write lands at both `iw` and `iw + capacity`, so `capacity`
//! samples are always contiguous from any offset in `[0, capacity)`. A
//! consumer that advances by `n` gets back `capacity + ir`; the `n` samples
//! it just released are the slots `[capacity + ir - n, capacity + ir)`.
//!
//! ## Ownership
//!
//! The write cursor belongs to the producer, the read cursor to the
//! consumer. Each side loads its own cursor `Relaxed` and publishes it with
//! `Release`; the opposite side reads it with `Acquire`. Slots are
//! `AtomicU32` so concurrent access stays defined without a lock.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::broadcast;
use tracing::debug;

use super::sample::Sample;
use crate::error::{FifoError, Result};
use crate::events::FifoEvent;

/// Flow-control events buffered per subscriber before it starts lagging.
const EVENT_CHANNEL_CAP: usize = 1024;

/// Lifecycle state of the FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoState {
    /// Freshly constructed or resized; the next `read_advance` signals the
    /// full capacity.
    Initialized,
    /// At least one `read_advance` has happened since the last (re)init.
    Steady,
}

pub struct FifoDiagnostics {
    pub samples_written: AtomicUsize,
    pub samples_read: AtomicUsize,
    pub read_advances: AtomicUsize,
    pub data_write_full: AtomicUsize,
    pub data_write_half: AtomicUsize,
    pub resizes: AtomicUsize,
}

impl Default for FifoDiagnostics {
    fn default() -> Self {
        Self {
            samples_written: AtomicUsize::new(0),
            samples_read: AtomicUsize::new(0),
            read_advances: AtomicUsize::new(0),
            data_write_full: AtomicUsize::new(0),
            data_write_half: AtomicUsize::new(0),
            resizes: AtomicUsize::new(0),
        }
    }
}

impl FifoDiagnostics {
    pub fn reset(&self) {
        self.samples_written.store(0, Ordering::Relaxed);
        self.samples_read.store(0, Ordering::Relaxed);
        self.read_advances.store(0, Ordering::Relaxed);
        self.data_write_full.store(0, Ordering::Relaxed);
        self.data_write_half.store(0, Ordering::Relaxed);
        self.resizes.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FifoDiagnosticsSnapshot {
        FifoDiagnosticsSnapshot {
            samples_written: self.samples_written.load(Ordering::Relaxed),
            samples_read: self.samples_read.load(Ordering::Relaxed),
            read_advances: self.read_advances.load(Ordering::Relaxed),
            data_write_full: self.data_write_full.load(Ordering::Relaxed),
            data_write_half: self.data_write_half.load(Ordering::Relaxed),
            resizes: self.resizes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FifoDiagnosticsSnapshot {
    pub samples_written: usize,
    pub samples_read: usize,
    pub read_advances: usize,
    pub data_write_full: usize,
    pub data_write_half: usize,
    pub resizes: usize,
}

/// Panics unless `capacity > 0` and `chunk_size <= capacity / 4`.
fn assert_geometry(capacity: usize, chunk_size: usize) {
    assert!(capacity > 0, "FIFO capacity must be positive");
    assert!(
        chunk_size <= capacity / 4,
        "chunk size {chunk_size} exceeds capacity/4 ({})",
        capacity / 4
    );
}

/// State shared by the owned FIFO and its split halves.
struct FifoCore {
    data: Box<[AtomicU32]>,
    size: usize,
    chunk_size: usize,
    ir: AtomicUsize,
    iw: AtomicUsize,
    init: AtomicBool,
    events: broadcast::Sender<FifoEvent>,
    diagnostics: Arc<FifoDiagnostics>,
}

impl FifoCore {
    fn new(
        size: usize,
        chunk_size: usize,
        events: broadcast::Sender<FifoEvent>,
        diagnostics: Arc<FifoDiagnostics>,
    ) -> Self {
        assert_geometry(size, chunk_size);

        let data = (0..2 * size).map(|_| AtomicU32::new(0)).collect();
        Self {
            data,
            size,
            chunk_size,
            ir: AtomicUsize::new(0),
            iw: AtomicUsize::new(chunk_size * 2),
            init: AtomicBool::new(true),
            events,
            diagnostics,
        }
    }

    #[inline]
    fn write(&self, sample: Sample) {
        let iw = self.iw.load(Ordering::Relaxed);
        let bits = sample.to_bits();
        self.data[iw].store(bits, Ordering::Relaxed);
        self.data[iw + self.size].store(bits, Ordering::Relaxed);
        self.iw.store((iw + 1) % self.size, Ordering::Release);
        self.diagnostics
            .samples_written
            .fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn stage(&self, sample: Sample) {
        let iw = self.iw.load(Ordering::Relaxed);
        self.data[iw].store(sample.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    fn bump_index(&self) -> usize {
        let iw = self.iw.load(Ordering::Relaxed);
        let bits = self.data[iw].load(Ordering::Relaxed);
        self.data[iw + self.size].store(bits, Ordering::Relaxed);
        let next = (iw + 1) % self.size;
        self.iw.store(next, Ordering::Release);
        self.diagnostics
            .samples_written
            .fetch_add(1, Ordering::Relaxed);
        next
    }

    fn read_advance(&self, nb_samples: usize) -> usize {
        assert!(
            nb_samples < self.chunk_size / 2,
            "read_advance({nb_samples}) must stay below chunk_size/2 ({})",
            self.chunk_size / 2
        );

        let ir = (self.ir.load(Ordering::Relaxed) + nb_samples) % self.size;
        self.ir.store(ir, Ordering::Release);
        let read_until = self.size + ir;

        let _ = self.events.send(FifoEvent::DataRead { count: nb_samples });
        self.diagnostics
            .read_advances
            .fetch_add(1, Ordering::Relaxed);
        self.diagnostics
            .samples_read
            .fetch_add(nb_samples, Ordering::Relaxed);

        let iw = self.iw.load(Ordering::Acquire);
        let delta = iw as isize - ir as isize;
        let size = self.size as isize;
        let half = size / 2;

        if self.init.swap(false, Ordering::Relaxed) {
            let _ = self.events.send(FifoEvent::DataWrite {
                available: self.size,
            });
            self.diagnostics
                .data_write_full
                .fetch_add(1, Ordering::Relaxed);
        } else if (delta > 0 && delta <= half) || (delta <= 0 && delta + size <= half) {
            let _ = self.events.send(FifoEvent::DataWrite {
                available: self.size / 2,
            });
            self.diagnostics
                .data_write_half
                .fetch_add(1, Ordering::Relaxed);
        }

        read_until
    }

    fn read_iterator(&self) -> usize {
        self.size + self.ir.load(Ordering::Acquire)
    }

    fn write_iterator(&self) -> usize {
        self.iw.load(Ordering::Acquire)
    }

    fn occupancy(&self) -> usize {
        let iw = self.iw.load(Ordering::Acquire);
        let ir = self.ir.load(Ordering::Acquire);
        (iw + self.size - ir) % self.size
    }

    fn free_space(&self) -> usize {
        let guard = self.chunk_size.max(1);
        self.size.saturating_sub(self.occupancy() + guard)
    }

    fn window(&self, end: usize, len: usize) -> ReadWindow<'_> {
        assert!(
            end <= 2 * self.size && len <= end,
            "window [{}, {end}) outside mirrored store of {}",
            end.wrapping_sub(len),
            2 * self.size
        );
        ReadWindow {
            slots: &self.data[end - len..end],
        }
    }

    fn sample_at(&self, pos: usize) -> Sample {
        Sample::from_bits(self.data[pos].load(Ordering::Relaxed))
    }

    fn state(&self) -> FifoState {
        if self.init.load(Ordering::Relaxed) {
            FifoState::Initialized
        } else {
            FifoState::Steady
        }
    }
}

/// Contiguous view into the mirrored store.
///
/// Slots are read one at a time; a concurrent producer may replace samples
/// it is entitled to overwrite, but never tears an individual sample.
#[derive(Clone, Copy)]
pub struct ReadWindow<'a> {
    slots: &'a [AtomicU32],
}

impl<'a> ReadWindow<'a> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Sample> {
        self.slots
            .get(idx)
            .map(|slot| Sample::from_bits(slot.load(Ordering::Relaxed)))
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + 'a {
        let slots: &'a [AtomicU32] = self.slots;
        slots
            .iter()
            .map(|slot| Sample::from_bits(slot.load(Ordering::Relaxed)))
    }

    /// Copy the window into `out`.
    ///
    /// # Panics
    /// If `out.len() != self.len()`, like `slice::copy_from_slice`.
    pub fn copy_to_slice(&self, out: &mut [Sample]) {
        assert_eq!(
            out.len(),
            self.slots.len(),
            "destination length does not match window length"
        );
        for (dst, sample) in out.iter_mut().zip(self.iter()) {
            *dst = sample;
        }
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.iter().collect()
    }
}

impl std::fmt::Debug for ReadWindow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadWindow")
            .field("len", &self.slots.len())
            .finish_non_exhaustive()
    }
}

/// Fixed-capacity sample FIFO with a mirrored backing store.
///
/// Owned form: all operations are available and `resize` is allowed. Call
/// [`split`](Self::split) to hand the write side to a producer thread and
/// the read side to a consumer thread.
pub struct SampleSourceFifo {
    core: Arc<FifoCore>,
}

impl SampleSourceFifo {
    /// Allocate a FIFO of `capacity` samples.
    ///
    /// # Panics
    /// If `capacity == 0` or `chunk_size > capacity / 4`.
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAP);
        let diagnostics = Arc::new(FifoDiagnostics::default());
        Self {
            core: Arc::new(FifoCore::new(capacity, chunk_size, events, diagnostics)),
        }
    }

    /// Reallocate and reinitialize. Content is discarded; subscribers and
    /// diagnostics carry over.
    ///
    /// # Panics
    /// If `capacity == 0` or `chunk_size > capacity / 4`.
    pub fn resize(&mut self, capacity: usize, chunk_size: usize) {
        debug!(capacity, chunk_size, "resizing sample FIFO");
        let events = self.core.events.clone();
        let diagnostics = Arc::clone(&self.core.diagnostics);
        diagnostics.resizes.fetch_add(1, Ordering::Relaxed);
        self.core = Arc::new(FifoCore::new(capacity, chunk_size, events, diagnostics));
    }

    pub fn write(&mut self, sample: Sample) {
        self.core.write(sample);
    }

    /// Fill the slot at the write position without committing it.
    pub fn stage(&mut self, sample: Sample) {
        self.core.stage(sample);
    }

    /// Commit the staged slot: mirror it and advance. Returns the new write
    /// position.
    pub fn bump_index(&mut self) -> usize {
        self.core.bump_index()
    }

    /// Release `nb_samples` and return the position the released run ends at.
    ///
    /// # Panics
    /// If `nb_samples >= chunk_size / 2`.
    pub fn read_advance(&mut self, nb_samples: usize) -> usize {
        self.core.read_advance(nb_samples)
    }

    pub fn read_iterator(&self) -> usize {
        self.core.read_iterator()
    }

    pub fn write_iterator(&self) -> usize {
        self.core.write_iterator()
    }

    /// View `[end - len, end)` of the mirrored store.
    ///
    /// # Panics
    /// If `end > 2 * capacity` or `len > end`.
    pub fn window(&self, end: usize, len: usize) -> ReadWindow<'_> {
        self.core.window(end, len)
    }

    /// Read one slot of the mirrored store (`pos < 2 * capacity`).
    pub fn sample_at(&self, pos: usize) -> Sample {
        self.core.sample_at(pos)
    }

    pub fn capacity(&self) -> usize {
        self.core.size
    }

    pub fn chunk_size(&self) -> usize {
        self.core.chunk_size
    }

    pub fn state(&self) -> FifoState {
        self.core.state()
    }

    /// Samples written but not yet released, modulo capacity.
    pub fn occupancy(&self) -> usize {
        self.core.occupancy()
    }

    /// Samples the producer can write while leaving `chunk_size` slots (at
    /// least one) untouched behind the read cursor, so the run released by
    /// the last `read_advance` stays intact until the next one.
    pub fn free_space(&self) -> usize {
        self.core.free_space()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FifoEvent> {
        self.core.events.subscribe()
    }

    pub fn diagnostics(&self) -> Arc<FifoDiagnostics> {
        Arc::clone(&self.core.diagnostics)
    }

    /// Split into producer and consumer halves.
    pub fn split(self) -> (FifoWriter, FifoReader) {
        let writer = FifoWriter {
            core: Arc::clone(&self.core),
        };
        let reader = FifoReader { core: self.core };
        (writer, reader)
    }
}

impl std::fmt::Debug for SampleSourceFifo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleSourceFifo")
            .field("capacity", &self.core.size)
            .field("chunk_size", &self.core.chunk_size)
            .field("read_iterator", &self.core.read_iterator())
            .field("write_iterator", &self.core.write_iterator())
            .field("state", &self.core.state())
            .finish()
    }
}

/// Producer half. Owns the write cursor.
pub struct FifoWriter {
    core: Arc<FifoCore>,
}

impl FifoWriter {
    #[inline]
    pub fn write(&mut self, sample: Sample) {
        self.core.write(sample);
    }

    #[inline]
    pub fn stage(&mut self, sample: Sample) {
        self.core.stage(sample);
    }

    #[inline]
    pub fn bump_index(&mut self) -> usize {
        self.core.bump_index()
    }

    pub fn write_iterator(&self) -> usize {
        self.core.write_iterator()
    }

    pub fn free_space(&self) -> usize {
        self.core.free_space()
    }

    pub fn capacity(&self) -> usize {
        self.core.size
    }

    pub fn chunk_size(&self) -> usize {
        self.core.chunk_size
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FifoEvent> {
        self.core.events.subscribe()
    }

    pub fn diagnostics(&self) -> Arc<FifoDiagnostics> {
        Arc::clone(&self.core.diagnostics)
    }

    /// Reunite with the matching reader so the FIFO can be resized.
    ///
    /// # Errors
    /// `FifoError::MismatchedHalves` if `reader` was split from another FIFO.
    pub fn unsplit(self, reader: FifoReader) -> Result<SampleSourceFifo> {
        if !Arc::ptr_eq(&self.core, &reader.core) {
            return Err(FifoError::MismatchedHalves);
        }
        drop(reader);
        Ok(SampleSourceFifo { core: self.core })
    }
}

/// Consumer half. Owns the read cursor.
pub struct FifoReader {
    core: Arc<FifoCore>,
}

impl FifoReader {
    /// # Panics
    /// If `nb_samples >= chunk_size / 2`.
    pub fn read_advance(&mut self, nb_samples: usize) -> usize {
        self.core.read_advance(nb_samples)
    }

    pub fn read_iterator(&self) -> usize {
        self.core.read_iterator()
    }

    pub fn window(&self, end: usize, len: usize) -> ReadWindow<'_> {
        self.core.window(end, len)
    }

    pub fn occupancy(&self) -> usize {
        self.core.occupancy()
    }

    pub fn capacity(&self) -> usize {
        self.core.size
    }

    pub fn chunk_size(&self) -> usize {
        self.core.chunk_size
    }

    pub fn state(&self) -> FifoState {
        self.core.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FifoEvent> {
        self.core.events.subscribe()
    }

    pub fn diagnostics(&self) -> Arc<FifoDiagnostics> {
        Arc::clone(&self.core.diagnostics)
    }
}
