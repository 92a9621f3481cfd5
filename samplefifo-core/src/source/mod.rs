//! Sample generator abstraction.
//!
//! The `SampleGenerator` trait decouples the pump from whatever produces
//! baseband samples (test tone, counter ramp, a modulator chain). `&mut self`
//! on `next_sample` reflects that generators carry phase or counter state;
//! all mutation is serialised through `GeneratorHandle`'s
//! `parking_lot::Mutex`.

pub mod ramp;
pub mod tone;

pub use ramp::RampGenerator;
pub use tone::ToneGenerator;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffering::Sample;

/// Contract for sample producers feeding the FIFO.
pub trait SampleGenerator: Send + 'static {
    /// Produce the next sample.
    fn next_sample(&mut self) -> Sample;

    /// Fill `out` with consecutive samples.
    fn fill(&mut self, out: &mut [Sample]) {
        for slot in out.iter_mut() {
            *slot = self.next_sample();
        }
    }

    /// Return to the initial phase / counter.
    fn reset(&mut self);
}

/// Thread-safe reference-counted handle to any `SampleGenerator` implementor.
#[derive(Clone)]
pub struct GeneratorHandle(pub Arc<Mutex<dyn SampleGenerator>>);

impl GeneratorHandle {
    /// Wrap any `SampleGenerator` in a `GeneratorHandle`.
    pub fn new<G: SampleGenerator>(generator: G) -> Self {
        Self(Arc::new(Mutex::new(generator)))
    }
}

impl std::fmt::Debug for GeneratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorHandle").finish_non_exhaustive()
    }
}
