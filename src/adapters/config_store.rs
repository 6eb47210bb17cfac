//! In-memory configuration store.
//!
//! Holds the [`SamplingConfig`] as postcard bytes, the same encoding the
//! node's persistent storage uses, so a host test exercises the real
//! serialisation path.  Values are validated before they are stored.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SamplingConfig;

#[derive(Debug, Default)]
pub struct MemConfigStore {
    blob: Option<Vec<u8>>,
}

impl MemConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw bytes, e.g. a blob read from flash.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { blob: Some(bytes.to_vec()) }
    }

    /// Raw stored bytes, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }
}

impl ConfigPort for MemConfigStore {
    fn load(&self) -> Result<SamplingConfig, ConfigError> {
        let Some(bytes) = self.blob.as_deref() else {
            info!("Config: nothing stored, using defaults");
            return Ok(SamplingConfig::default());
        };
        let config: SamplingConfig = postcard::from_bytes(bytes).map_err(|_| {
            warn!("Config: stored blob failed to decode");
            ConfigError::Corrupted
        })?;
        config.validate()?;
        Ok(config)
    }

    fn save(&mut self, config: &SamplingConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.blob = Some(bytes);
        info!("Config: saved");
        Ok(())
    }
}
