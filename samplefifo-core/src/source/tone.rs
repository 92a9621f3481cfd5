//! `ToneGenerator` — complex sinusoid test source.
//!
//! Frequency is normalised to the sample rate (cycles per sample, in
//! `[-0.5, 0.5)`), amplitude to full scale.

use std::f64::consts::TAU;

use crate::buffering::Sample;
use crate::source::SampleGenerator;

pub struct ToneGenerator {
    phase: f64,
    phase_inc: f64,
    amplitude: f64,
}

impl ToneGenerator {
    /// # Parameters
    /// - `frequency`: cycles per sample; wrapped into `[-0.5, 0.5)`.
    /// - `amplitude`: fraction of full scale, clamped to `[0.0, 1.0]`.
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        let wrapped = (frequency + 0.5).rem_euclid(1.0) - 0.5;
        Self {
            phase: 0.0,
            phase_inc: TAU * wrapped,
            amplitude: amplitude.clamp(0.0, 1.0) * i16::MAX as f64,
        }
    }

    /// Tone at `tone_hz` for a stream running at `sample_rate` S/s.
    pub fn from_rates(tone_hz: f64, sample_rate: u32, amplitude: f64) -> Self {
        Self::new(tone_hz / sample_rate as f64, amplitude)
    }

    pub fn frequency(&self) -> f64 {
        self.phase_inc / TAU
    }
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new(0.01, 0.5)
    }
}

impl SampleGenerator for ToneGenerator {
    fn next_sample(&mut self) -> Sample {
        let (sin, cos) = self.phase.sin_cos();
        let sample = Sample::new(
            (cos * self.amplitude).round() as i16,
            (sin * self.amplitude).round() as i16,
        );
        self.phase = (self.phase + self.phase_inc).rem_euclid(TAU);
        sample
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_on_real_axis() {
        let mut tone = ToneGenerator::new(0.25, 1.0);
        assert_eq!(tone.next_sample(), Sample::new(i16::MAX, 0));
        // Quarter turn per sample
        assert_eq!(tone.next_sample(), Sample::new(0, i16::MAX));
    }

    #[test]
    fn frequency_wraps_into_nyquist_band() {
        let tone = ToneGenerator::new(0.75, 0.5);
        assert_relative_eq!(tone.frequency(), -0.25, epsilon = 1e-12);

        let tone = ToneGenerator::from_rates(1_000.0, 48_000, 0.5);
        assert_relative_eq!(tone.frequency(), 1.0 / 48.0, epsilon = 1e-12);
    }

    #[test]
    fn magnitude_follows_amplitude() {
        let mut tone = ToneGenerator::new(0.013, 0.5);
        let expected = 0.5 * i16::MAX as f64;
        for _ in 0..500 {
            let s = tone.next_sample();
            let mag = (s.magnitude_sq() as f64).sqrt();
            assert_relative_eq!(mag, expected, epsilon = 1.5);
        }
    }

    #[test]
    fn reset_restarts_phase() {
        let mut tone = ToneGenerator::default();
        let first = tone.next_sample();
        tone.next_sample();
        tone.reset();
        assert_eq!(tone.next_sample(), first);
    }
}
