//! Flow-control and status events.
//!
//! | Event | Source |
//! |-------|--------|
//! | `FifoEvent` | `SampleSourceFifo::subscribe` / the split halves |
//! | `PumpStatusEvent` | `SourcePump::subscribe_status` |
//!
//! Both serialize to camelCase JSON so a metrics observer can forward them
//! as-is.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FIFO notifications
// ---------------------------------------------------------------------------

/// Notification emitted by the FIFO on every `read_advance`.
///
/// For one call, `DataRead` is always sent before `DataWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FifoEvent {
    /// The consumer released `count` samples.
    DataRead { count: usize },
    /// The producer may write up to `available` samples.
    DataWrite { available: usize },
}

// ---------------------------------------------------------------------------
// Pump status events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpStatusEvent {
    pub status: PumpStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpStatus {
    Idle,
    Running,
    Stopped,
    Error,
}
