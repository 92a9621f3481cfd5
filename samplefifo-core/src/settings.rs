//! FIFO and pump settings persisted as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buffering::FifoConfig;
use crate::engine::PumpConfig;
use crate::error::Result;

const MIN_CAPACITY: usize = 16;
const MAX_CAPACITY: usize = 1 << 24;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct FifoSettings {
    pub fifo: FifoConfig,
    pub pump: PumpConfig,
}

impl FifoSettings {
    /// Clamp every field into a range the FIFO and pump accept.
    pub fn normalize(&mut self) {
        self.fifo.capacity = self.fifo.capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
        self.fifo.chunk_size = self.fifo.chunk_size.clamp(2, self.fifo.capacity / 4);
        self.pump.idle_sleep_ms = self.pump.idle_sleep_ms.clamp(1, 20);
    }
}

/// Load settings from `path`, falling back to defaults when the file is
/// missing or unreadable. The result is always normalized.
pub fn load_settings(path: &Path) -> FifoSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<FifoSettings>(&raw).unwrap_or_else(|e| {
            warn!("ignoring malformed settings file {}: {e}", path.display());
            FifoSettings::default()
        }),
        Err(_) => FifoSettings::default(),
    };
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &FifoSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
