//! The persisted configuration document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::presets::PresetStore;
use crate::registry::HubConfig;

type Result<T> = std::result::Result<T, Error>;

/// Everything that survives a restart: the registry and the presets.
///
/// Serialized as one flat JSON object with the keys `initialised`, `ip`,
/// `lightIDs`, `names`, `presetNames` and `presets`. Missing keys load as
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(flatten)]
    pub hub: HubConfig,
    #[serde(flatten)]
    pub presets: PresetStore,
}

impl DriverConfig {
    /// Forget the hub and its lights, and the presets unless `keep_presets`.
    pub fn reset(&mut self, keep_presets: bool) {
        self.hub.reset();
        if !keep_presets {
            self.presets.clear();
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::JsonDump)
    }

    /// Parse a document, repairing duplicate or dangling entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: DriverConfig = serde_json::from_str(json).map_err(Error::JsonLoad)?;
        config.normalize();
        Ok(config)
    }

    pub(crate) fn normalize(&mut self) {
        self.hub.normalize();
        self.presets.normalize();
    }
}

/// A JSON file holding a [`DriverConfig`].
///
/// Every save rewrites the whole document: it is written next to the target
/// and renamed over it, so a crash never leaves a half-written file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file is an empty configuration.
    pub fn load(&self) -> Result<DriverConfig> {
        match fs::read_to_string(&self.path) {
            Ok(json) => {
                let config = DriverConfig::from_json(&json)?;
                debug!(
                    "loaded {} light(s) and {} preset(s) from {:?}",
                    config.hub.light_ids().len(),
                    config.presets.len(),
                    self.path
                );
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no configuration at {:?}, starting empty", self.path);
                Ok(DriverConfig::default())
            }
            Err(e) => Err(Error::persist(&self.path, e)),
        }
    }

    pub fn save(&self, config: &DriverConfig) -> Result<()> {
        let json = config.to_json()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::persist(parent, e))?;
        }

        let staging = self.staging_path();
        fs::write(&staging, json).map_err(|e| Error::persist(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| Error::persist(&self.path, e))?;
        debug!("configuration written to {:?}", self.path);
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
