//! # Sync Configuration
//!
//! Facility identity and sync tuning, loaded from a TOML file.
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [facility]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! code = "HF-0042"
//! name = "Namaacha Health Post"
//!
//! [sync]
//! backfill_months = 12
//! movement_batch_size = 500
//! ```
//!
//! ## File Location
//! `MEDISTOCK_SYNC_CONFIG` overrides the path; otherwise the platform config
//! directory is used:
//! - `~/.config/medistock/sync.toml` (Linux)
//! - `~/Library/Application Support/org.medistock.medistock/sync.toml` (macOS)
//!
//! A missing file is not an error: defaults (with a freshly generated
//! facility id) are written back on first load.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "MEDISTOCK_SYNC_CONFIG";

// =============================================================================
// Facility Configuration
// =============================================================================

/// Identity of this facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    /// Unique facility identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Facility code known to the server (e.g., "HF-0042").
    #[serde(default)]
    pub code: String,

    /// Human-readable facility name.
    #[serde(default = "default_facility_name")]
    pub name: String,
}

fn default_facility_name() -> String {
    "Health Facility".to_string()
}

impl Default for FacilityConfig {
    fn default() -> Self {
        FacilityConfig {
            id: Uuid::new_v4().to_string(),
            code: String::new(),
            name: default_facility_name(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Tuning knobs for the sync pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// How many monthly chunks the historical backfill covers.
    /// Default: 12 (one year; a full year in one request risks timeout)
    #[serde(default = "default_backfill_months")]
    pub backfill_months: u32,

    /// Upper bound on one movement push batch.
    /// Default: 500
    #[serde(default = "default_movement_batch_size")]
    pub movement_batch_size: u32,
}

fn default_backfill_months() -> u32 {
    12
}

fn default_movement_batch_size() -> u32 {
    500
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            backfill_months: default_backfill_months(),
            movement_batch_size: default_movement_batch_size(),
        }
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub facility: FacilityConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Resolves the config file path (env override, then platform default).
    pub fn default_path() -> SyncResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dirs = directories::ProjectDirs::from("org", "medistock", "medistock")
            .ok_or_else(|| {
                SyncError::ConfigLoadFailed("Cannot determine config directory".to_string())
            })?;

        Ok(dirs.config_dir().join("sync.toml"))
    }

    /// Loads the configuration, creating it with defaults on first run.
    pub fn load() -> SyncResult<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &PathBuf) -> SyncResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "No sync config found, writing defaults");
            let config = SyncConfig::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&raw)?;
        config.validate()?;

        info!(
            facility = %config.facility.code,
            backfill_months = config.sync.backfill_months,
            "Sync config loaded"
        );
        Ok(config)
    }

    /// Saves the configuration.
    pub fn save_to(&self, path: &PathBuf) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// The facility code may be empty on first run (set during enrollment),
    /// but numeric settings must be sane.
    pub fn validate(&self) -> SyncResult<()> {
        if self.facility.id.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "facility.id must not be empty".to_string(),
            ));
        }

        if self.sync.backfill_months == 0 {
            return Err(SyncError::InvalidConfig(
                "sync.backfill_months must be at least 1".to_string(),
            ));
        }

        if self.sync.movement_batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "sync.movement_batch_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
