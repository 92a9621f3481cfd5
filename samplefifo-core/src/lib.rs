//! # samplefifo-core
//!
//! Mirrored sample FIFO between a real-time sample producer and a consumer
//! that reads long contiguous runs.
//!
//! ## Architecture
//!
//! ```text
//! SampleGenerator → SourcePump ──write──► SampleSourceFifo ──read_advance──► consumer
//!                        ▲                       │
//!                        └── FifoEvent::DataWrite ┘ (broadcast)
//! ```
//!
//! The write path is allocation-free and lock-free. Backpressure is a
//! notification, never a wait.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod engine;
pub mod error;
pub mod events;
pub mod settings;
pub mod source;

// Convenience re-exports for downstream crates
pub use buffering::{
    create_sample_fifo, FifoConfig, FifoReader, FifoState, FifoWriter, ReadWindow, Sample,
    SampleSourceFifo,
};
pub use engine::{PumpConfig, SourcePump, WriteMode};
pub use error::FifoError;
pub use events::{FifoEvent, PumpStatus, PumpStatusEvent};
pub use source::{GeneratorHandle, SampleGenerator};
