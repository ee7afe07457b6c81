use std::sync::Mutex;

use rusqlite::Connection;

use crate::aging::AgingThresholdConfig;
use crate::error::{Error, Result};
use crate::storage::repository::{get_config, set_config, KEY_AGING_THRESHOLDS};

/// Load/save capability for the aging threshold config.
///
/// The classifier never touches storage; callers load a config through one of
/// these, pass it in explicitly, and save user edits back.
pub trait ThresholdStore {
    /// The stored config, or the defaults when none has been saved.
    fn load_threshold_config(&self) -> Result<AgingThresholdConfig>;

    fn save_threshold_config(&self, config: &AgingThresholdConfig) -> Result<()>;
}

/// Stored as JSON under [`KEY_AGING_THRESHOLDS`] in `app_config`.
impl ThresholdStore for Connection {
    fn load_threshold_config(&self) -> Result<AgingThresholdConfig> {
        let Some(raw) = get_config(self, KEY_AGING_THRESHOLDS)? else {
            return Ok(AgingThresholdConfig::default());
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                log::warn!("Stored aging thresholds are unreadable ({e}); using defaults");
                Ok(AgingThresholdConfig::default())
            }
        }
    }

    fn save_threshold_config(&self, config: &AgingThresholdConfig) -> Result<()> {
        let raw = serde_json::to_string(config)?;
        set_config(self, KEY_AGING_THRESHOLDS, &raw)?;
        Ok(())
    }
}

/// Process-local store for embedding the engine without a database.
#[derive(Debug, Default)]
pub struct MemoryThresholdStore {
    config: Mutex<Option<AgingThresholdConfig>>,
}

impl MemoryThresholdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThresholdStore for MemoryThresholdStore {
    fn load_threshold_config(&self) -> Result<AgingThresholdConfig> {
        let guard = self
            .config
            .lock()
            .map_err(|e| Error::Other(format!("threshold store lock poisoned: {e}")))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save_threshold_config(&self, config: &AgingThresholdConfig) -> Result<()> {
        let mut guard = self
            .config
            .lock()
            .map_err(|e| Error::Other(format!("threshold store lock poisoned: {e}")))?;
        *guard = Some(config.clone());
        Ok(())
    }
}
