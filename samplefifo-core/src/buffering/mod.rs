//! Mirrored sample FIFO between a producer stage and a consumer stage.
//!
//! `SampleSourceFifo` is created owned, then [`split`](SampleSourceFifo::split)
//! into a `FifoWriter` for the producer thread and a `FifoReader` for the
//! consumer thread. Neither half blocks; backpressure is a `FifoEvent`
//! notification, not a wait.

pub mod chunk;
pub mod fifo;
pub mod sample;

use serde::{Deserialize, Serialize};

use crate::error::{FifoError, Result};

pub use fifo::{
    FifoDiagnostics, FifoDiagnosticsSnapshot, FifoReader, FifoState, FifoWriter, ReadWindow,
    SampleSourceFifo,
};
pub use sample::Sample;

/// Default capacity: 2^16 samples ≈ 1.4 s at 48 kS/s.
pub const DEFAULT_CAPACITY: usize = 1 << 16;

/// Default nominal transfer granularity.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Geometry of a `SampleSourceFifo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct FifoConfig {
    pub capacity: usize,
    pub chunk_size: usize,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FifoConfig {
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        Self {
            capacity,
            chunk_size,
        }
    }

    /// Check the construction contract without panicking.
    ///
    /// # Errors
    /// `FifoError::InvalidConfig` if `capacity == 0` or
    /// `chunk_size > capacity / 4`.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(FifoError::InvalidConfig("capacity must be positive".into()));
        }
        if self.chunk_size > self.capacity / 4 {
            return Err(FifoError::InvalidConfig(format!(
                "chunk size {} exceeds capacity/4 ({})",
                self.chunk_size,
                self.capacity / 4
            )));
        }
        Ok(())
    }

    /// Largest `read_advance` argument this geometry accepts, if any.
    pub fn max_read_advance(&self) -> Option<usize> {
        (self.chunk_size / 2).checked_sub(1)
    }

    /// Validate, then allocate.
    pub fn build(&self) -> Result<SampleSourceFifo> {
        self.validate()?;
        Ok(SampleSourceFifo::new(self.capacity, self.chunk_size))
    }
}

/// Create a matched writer/reader pair for `config`.
///
/// # Errors
/// `FifoError::InvalidConfig` if the geometry breaks the chunk contract.
pub fn create_sample_fifo(config: &FifoConfig) -> Result<(FifoWriter, FifoReader)> {
    Ok(config.build()?.split())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = FifoConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_read_advance(), Some(2047));
    }

    #[test]
    fn validate_reports_instead_of_panicking() {
        let err = FifoConfig::new(1024, 300).validate().unwrap_err();
        assert!(matches!(err, FifoError::InvalidConfig(_)));
        assert!(err.to_string().contains("capacity/4"));

        assert!(FifoConfig::new(0, 0).build().is_err());
    }

    #[test]
    fn tiny_chunk_allows_no_advance() {
        assert_eq!(FifoConfig::new(16, 1).max_read_advance(), None);
        assert_eq!(FifoConfig::new(16, 2).max_read_advance(), Some(0));
    }

    #[test]
    fn create_pair_shares_geometry() {
        let (writer, reader) = create_sample_fifo(&FifoConfig::new(1024, 64)).unwrap();
        assert_eq!(writer.capacity(), 1024);
        assert_eq!(reader.chunk_size(), 64);
        assert_eq!(writer.write_iterator(), 128);
        assert_eq!(reader.read_iterator(), 1024);
    }

    #[test]
    fn config_json_uses_camel_case() {
        let cfg: FifoConfig = serde_json::from_str(r#"{"chunkSize": 32}"#).unwrap();
        assert_eq!(cfg.chunk_size, 32);
        assert_eq!(cfg.capacity, DEFAULT_CAPACITY);
    }
}
