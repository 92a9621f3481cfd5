//! Complex baseband sample as stored in the FIFO.

/// One I/Q sample with 16-bit components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sample {
    pub real: i16,
    pub imag: i16,
}

impl Sample {
    pub const ZERO: Sample = Sample { real: 0, imag: 0 };

    pub const fn new(real: i16, imag: i16) -> Self {
        Self { real, imag }
    }

    /// Pack into a single word: real in the high half, imag in the low half.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        ((self.real as u16 as u32) << 16) | (self.imag as u16 as u32)
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            real: (bits >> 16) as u16 as i16,
            imag: bits as u16 as i16,
        }
    }

    /// Squared magnitude, widened so full-scale samples do not overflow.
    pub fn magnitude_sq(self) -> u32 {
        let re = self.real as i32;
        let im = self.imag as i32;
        (re * re) as u32 + (im * im) as u32
    }
}
