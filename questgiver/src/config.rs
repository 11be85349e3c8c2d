//! Runtime configuration.
//!
//! Settings are read from a TOML file. A missing or malformed file is not fatal:
//! [`load_config`] logs what went wrong and falls back to [`QuestgiverConfig::default`].
//!
//! ```toml
//! mod_prefix = "qg_"
//! reconcile_interval_days = 1.0
//! intel_end_delay_days = 3.0
//! blacklisted_factions = ["pirates"]
//! blacklisted_sites = []
//! whitelisted_factions = []
//! continue_text = "Continue"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use questgiver_data::{OfferSite, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config from '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config from '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config in '{path}': {}", describe(.errors))]
    Invalid {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

fn describe(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Tunables shared by every quest in a runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestgiverConfig {
    /// Namespace for durable keys and flags.
    pub mod_prefix: String,
    /// Minimum in-world days between reconciliation sweeps.
    pub reconcile_interval_days: f32,
    /// Grace delay before a completed quest's intel disappears.
    pub intel_end_delay_days: f32,
    pub blacklisted_factions: Vec<String>,
    pub blacklisted_sites: Vec<String>,
    /// Factions allowed to host offers. Empty means all of them.
    pub whitelisted_factions: Vec<String>,
    /// Label of the synthetic continue option.
    pub continue_text: String,
}

impl Default for QuestgiverConfig {
    fn default() -> Self {
        Self {
            mod_prefix: "qg_".to_string(),
            reconcile_interval_days: 1.0,
            intel_end_delay_days: 3.0,
            blacklisted_factions: Vec::new(),
            blacklisted_sites: Vec::new(),
            whitelisted_factions: Vec::new(),
            continue_text: "Continue".to_string(),
        }
    }
}

impl QuestgiverConfig {
    /// Prefix `name` with the configured namespace.
    pub fn persisted_key(&self, name: &str) -> String {
        format!("{}{name}", self.mod_prefix)
    }

    /// Whether a quest may be offered at, or point the player to, `site`.
    pub fn is_valid_quest_target(&self, site: &OfferSite) -> bool {
        if self.blacklisted_sites.iter().any(|id| id == &site.id) {
            return false;
        }
        if self.blacklisted_factions.iter().any(|id| id == &site.faction_id) {
            return false;
        }
        self.whitelisted_factions.is_empty() || self.whitelisted_factions.iter().any(|id| id == &site.faction_id)
    }

    /// Check values that deserialize fine but make no sense at runtime.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !(self.reconcile_interval_days.is_finite() && self.reconcile_interval_days >= 0.0) {
            errors.push(ValidationError::InvalidValue {
                context: format!("reconcile_interval_days = {}", self.reconcile_interval_days),
            });
        }
        if !(self.intel_end_delay_days.is_finite() && self.intel_end_delay_days >= 0.0) {
            errors.push(ValidationError::InvalidValue {
                context: format!("intel_end_delay_days = {}", self.intel_end_delay_days),
            });
        }
        if self.continue_text.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: "continue_text is empty".to_string(),
            });
        }
        let whitelisted_and_blacklisted: Vec<_> = self
            .whitelisted_factions
            .iter()
            .filter(|id| self.blacklisted_factions.contains(id))
            .collect();
        for id in whitelisted_and_blacklisted {
            errors.push(ValidationError::InvalidValue {
                context: format!("faction '{id}' is both whitelisted and blacklisted"),
            });
        }
        errors
    }
}

/// Loads configuration from a TOML file, falling back to defaults on error.
///
/// This never fails. Problems are logged at `warn` and the defaults are returned.
pub fn load_config(toml_path: &Path) -> QuestgiverConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!("questgiver config loaded from '{}'", toml_path.display());
            config
        },
        Err(e) => {
            warn!("{e}. Using default questgiver config.");
            QuestgiverConfig::default()
        },
    }
}

/// Attempts to load configuration from a TOML file.
///
/// # Errors
/// - if the file cannot be read
/// - if it is not valid TOML for [`QuestgiverConfig`]
/// - if any value fails [`QuestgiverConfig::validate`]
pub fn try_load_config(toml_path: &Path) -> Result<QuestgiverConfig, ConfigError> {
    let raw = fs::read_to_string(toml_path).map_err(|source| ConfigError::Read {
        path: toml_path.to_path_buf(),
        source,
    })?;
    let config: QuestgiverConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: toml_path.to_path_buf(),
        source,
    })?;
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Invalid {
            path: toml_path.to_path_buf(),
            errors,
        });
    }
    Ok(config)
}
