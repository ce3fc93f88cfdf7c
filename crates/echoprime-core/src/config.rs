// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Oracle and registry configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EchoPrimeError, Result};
use crate::types::CollapseScore;

/// Hard cap on entries per `batchSubmit` call.
pub const MAX_BATCH: usize = 100;

/// Persistent EchoPrime settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoPrimeConfig {
    pub oracle: OracleConfig,
    pub registry: RegistryConfig,
}

/// Numeric pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Collapse score window size T.
    pub window: u32,
    /// Minimum collapse score for both members of the pair.
    pub threshold: f64,
    /// Prime advances the searcher may take before giving up.
    pub max_attempts: u32,
    /// Maximum number of indices discovered concurrently.
    pub workers: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            window: 128,
            threshold: 0.95,
            max_attempts: 10_000,
            workers: 4,
        }
    }
}

impl OracleConfig {
    /// The threshold as an exact fixed-point score.
    pub fn threshold_score(&self) -> CollapseScore {
        CollapseScore::from_fraction(self.threshold)
    }
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// SQLite ledger location. `None` keeps the ledger in memory.
    pub database_path: Option<PathBuf>,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Entries per batch submission (at most 100).
    pub max_batch: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            event_capacity: 1024,
            max_batch: MAX_BATCH,
        }
    }
}

impl EchoPrimeConfig {
    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file, falling back to defaults if it is missing
    /// or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.oracle.validate()?;
        self.registry.validate()
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(EchoPrimeError::Config("window must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EchoPrimeError::Config(format!(
                "threshold {} is outside [0, 1]",
                self.threshold
            )));
        }
        if self.max_attempts == 0 {
            return Err(EchoPrimeError::Config("max_attempts must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(EchoPrimeError::Config("workers must be at least 1".into()));
        }
        Ok(())
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_batch == 0 || self.max_batch > MAX_BATCH {
            return Err(EchoPrimeError::Config(format!(
                "max_batch must be between 1 and {MAX_BATCH}"
            )));
        }
        if self.event_capacity == 0 {
            return Err(EchoPrimeError::Config("event_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Default data directory: `$XDG_DATA_HOME/echoprime`, then
/// `$HOME/.local/share/echoprime`, then the system temp directory.
pub fn default_data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local").join("share")
    } else {
        std::env::temp_dir()
    };
    base.join("echoprime")
}
