//! Owned run of samples copied out of the FIFO for downstream stages.

use super::sample::Sample;
use super::ReadWindow;

/// A contiguous block of I/Q samples at a known sample rate.
///
/// Allocated on the consumer thread, never on the producer path.
#[derive(Debug, Clone)]
pub struct SampleChunk {
    pub samples: Vec<Sample>,
    /// Sample rate in S/s.
    pub sample_rate: u32,
}

impl SampleChunk {
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn from_window(window: &ReadWindow<'_>, sample_rate: u32) -> Self {
        Self::new(window.to_vec(), sample_rate)
    }

    /// Returns the duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Mean squared magnitude normalised to full scale, in [0.0, 2.0].
    pub fn mean_power(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let full_scale = 32768.0f64 * 32768.0;
        let sum: f64 = self
            .samples
            .iter()
            .map(|s| s.magnitude_sq() as f64 / full_scale)
            .sum();
        sum / self.samples.len() as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_rate() {
        let chunk = SampleChunk::new(vec![Sample::ZERO; 480], 48_000);
        assert!((chunk.duration_secs() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn power_of_empty_and_silent_chunks() {
        assert_eq!(SampleChunk::new(vec![], 48_000).mean_power(), 0.0);
        assert_eq!(SampleChunk::new(vec![Sample::ZERO; 8], 48_000).mean_power(), 0.0);
    }

    #[test]
    fn power_of_full_scale_real() {
        let chunk = SampleChunk::new(vec![Sample::new(i16::MIN, 0); 4], 48_000);
        assert!((chunk.mean_power() - 1.0).abs() < 1e-12);
    }
}
