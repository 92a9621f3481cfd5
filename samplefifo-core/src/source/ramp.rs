//! `RampGenerator` — deterministic counter samples.
//!
//! Each sample carries a 32-bit counter split across its two components, so
//! a consumer can detect dropped, repeated or reordered samples with
//! [`RampGenerator::is_successor`].

use crate::buffering::Sample;
use crate::source::SampleGenerator;

#[derive(Debug, Default)]
pub struct RampGenerator {
    counter: u32,
}

impl RampGenerator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Start the ramp at `counter`.
    pub fn starting_at(counter: u32) -> Self {
        Self { counter }
    }

    /// Counter value carried by `sample`.
    pub fn counter_of(sample: Sample) -> u32 {
        sample.to_bits()
    }

    /// True if `next` directly follows `prev` on the ramp.
    pub fn is_successor(prev: Sample, next: Sample) -> bool {
        Self::counter_of(prev).wrapping_add(1) == Self::counter_of(next)
    }
}

impl SampleGenerator for RampGenerator {
    fn next_sample(&mut self) -> Sample {
        let sample = Sample::from_bits(self.counter);
        self.counter = self.counter.wrapping_add(1);
        sample
    }

    fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up_from_start() {
        let mut ramp = RampGenerator::starting_at(41);
        let a = ramp.next_sample();
        let b = ramp.next_sample();
        assert_eq!(RampGenerator::counter_of(a), 41);
        assert!(RampGenerator::is_successor(a, b));
        assert!(!RampGenerator::is_successor(b, a));
    }

    #[test]
    fn wraps_at_u32_max() {
        let mut ramp = RampGenerator::starting_at(u32::MAX);
        let last = ramp.next_sample();
        let first = ramp.next_sample();
        assert_eq!(first, Sample::ZERO);
        assert!(RampGenerator::is_successor(last, first));
    }

    #[test]
    fn fill_and_reset() {
        let mut ramp = RampGenerator::new();
        let mut out = [Sample::ZERO; 4];
        ramp.fill(&mut out);
        assert_eq!(RampGenerator::counter_of(out[3]), 3);

        ramp.reset();
        assert_eq!(ramp.next_sample(), Sample::ZERO);
    }
}
