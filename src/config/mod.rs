//! Configuration module for the clip archiver
//!
//! This module handles archiver configuration including:
//! - Data directory locations (active, retired, archive)
//! - Stations and detectors to archive clips for
//! - Clip file wait periods and polling interval
//! - Logging
//!
//! # Config Location
//!
//! The configuration file is `archiver.toml`, looked up in this order:
//! - the path given on the command line
//! - the path in the `CLIPFLOW_CONFIG` environment variable
//! - the platform config directory:
//!   - **Linux**: `~/.config/clipflow/archiver.toml`
//!   - **macOS**: `~/Library/Application Support/clipflow/archiver.toml`
//!   - **Windows**: `%APPDATA%\clipflow\archiver.toml`
//!
//! # Example
//!
//! ```toml
//! stations = ["Alamo", "Rio Hondo"]
//! detectors = ["Dick", "Nighthawk"]
//!
//! [paths]
//! active_data_dir = "/srv/nfc/Active"
//! retired_data_dir = "/srv/nfc/Retired"
//! archive_dir = "/srv/nfc/Archive"
//!
//! [timing]
//! clip_file_wait_period_secs = 10
//! clip_file_retirement_wait_period_secs = 172800
//! poll_interval_secs = 5
//!
//! [old_bird]
//! process_station_clips = true
//! utc_offset = "-05:00"
//!
//! [old_bird.devices.Alamo]
//! recorder = "SM2+ 019657"
//! mic_output = "21c 3S12345 Output"
//! ```

use crate::error::{ArchiverError, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name, used for config and data directories
pub const APP_NAME: &str = "clipflow";

/// Config filename
pub const CONFIG_FILE: &str = "archiver.toml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "CLIPFLOW_CONFIG";

/// Default minimum age of a clip file before it is archived, in seconds
pub const DEFAULT_CLIP_FILE_WAIT_PERIOD_SECS: u64 = 10;

/// Default minimum age of an archived clip file before it is retired (two days)
pub const DEFAULT_CLIP_FILE_RETIREMENT_WAIT_PERIOD_SECS: u64 = 172_800;

/// Default pause between archiver passes, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default name of the Old Bird detector whose station clips are processed
pub const DEFAULT_OLD_BIRD_DETECTOR_NAME: &str = "Dick";

/// Default offset of station local time from UTC
pub const DEFAULT_STATION_UTC_OFFSET: &str = "+00:00";

const CLIPS_DIR: &str = "Clips";

// ==================== Config Locations ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_NAME))
}

/// Get the config file path, honoring `CLIPFLOW_CONFIG`
pub fn default_config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => config_dir().map(|p| p.join(CONFIG_FILE)),
    }
}

fn default_data_dir(name: &str) -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(name)
}

// ==================== Sections ====================

/// Data directory locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of station directories whose clips are being archived
    pub active_data_dir: PathBuf,

    /// Root of station directories that retired clips are moved to
    pub retired_data_dir: PathBuf,

    /// Local archive directory. Remote archives are not supported, so
    /// archiving requires this to be set.
    pub archive_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            active_data_dir: default_data_dir("Active"),
            retired_data_dir: default_data_dir("Retired"),
            archive_dir: Some(default_data_dir("Archive")),
        }
    }
}

/// Clip file age thresholds and polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub clip_file_wait_period_secs: u64,
    pub clip_file_retirement_wait_period_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            clip_file_wait_period_secs: DEFAULT_CLIP_FILE_WAIT_PERIOD_SECS,
            clip_file_retirement_wait_period_secs: DEFAULT_CLIP_FILE_RETIREMENT_WAIT_PERIOD_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl TimingConfig {
    pub fn clip_file_wait_period(&self) -> Duration {
        Duration::from_secs(self.clip_file_wait_period_secs)
    }

    pub fn clip_file_retirement_wait_period(&self) -> Duration {
        Duration::from_secs(self.clip_file_retirement_wait_period_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Handling of clips written by the Old Bird detectors
///
/// Old Bird clip files land in station directories. When processing is on,
/// they are either deleted or converted into clips of `detector_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OldBirdConfig {
    /// Detector whose clip file names match the Old Bird naming pattern
    pub detector_name: String,

    /// Process Old Bird clip files left in station directories
    pub process_station_clips: bool,

    /// Delete processed clip files instead of converting them
    pub delete_station_clips: bool,

    /// Offset of station local time from UTC, as `+HH:MM` or `-HH:MM`.
    /// Old Bird clip file names are in station local time.
    pub utc_offset: String,

    /// Recording device of each station, by station name
    pub devices: BTreeMap<String, OldBirdDevice>,
}

/// Recorder and microphone output an Old Bird detector listens to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OldBirdDevice {
    pub recorder: String,
    pub mic_output: String,
}

impl Default for OldBirdConfig {
    fn default() -> Self {
        Self {
            detector_name: DEFAULT_OLD_BIRD_DETECTOR_NAME.to_string(),
            process_station_clips: false,
            delete_station_clips: false,
            utc_offset: DEFAULT_STATION_UTC_OFFSET.to_string(),
            devices: BTreeMap::new(),
        }
    }
}

impl OldBirdConfig {
    /// Whether station clip files are converted into clips
    pub fn converts_station_clips(&self) -> bool {
        self.process_station_clips && !self.delete_station_clips
    }

    /// Whether station clip files are deleted
    pub fn deletes_station_clips(&self) -> bool {
        self.process_station_clips && self.delete_station_clips
    }

    /// Parsed station UTC offset
    pub fn station_utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset.parse().map_err(|e| {
            ArchiverError::Config(format!("Invalid UTC offset {:?}: {}", self.utc_offset, e))
        })
    }

    /// Recording device of a station
    pub fn device(&self, station: &str) -> Result<&OldBirdDevice> {
        self.devices.get(station).ok_or_else(|| {
            ArchiverError::Config(format!(
                "No Old Bird recording device configured for station {:?}",
                station
            ))
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Log file. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ==================== Archiver Config ====================

/// Complete archiver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Names of stations whose clips are archived
    pub stations: Vec<String>,

    /// Names of detectors whose clips are archived, at every station
    pub detectors: Vec<String>,

    pub paths: PathsConfig,
    pub timing: TimingConfig,
    pub old_bird: OldBirdConfig,
    pub logging: LoggingConfig,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            stations: Vec::new(),
            detectors: vec!["Dick".to_string(), "Nighthawk".to_string()],
            paths: PathsConfig::default(),
            timing: TimingConfig::default(),
            old_bird: OldBirdConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ArchiverConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ArchiverError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ArchiverError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArchiverError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ArchiverError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ArchiverError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check that the config describes something to archive
    pub fn validate(&self) -> Result<()> {
        if self.stations.is_empty() {
            return Err(ArchiverError::Config("No stations configured".to_string()));
        }
        if self.detectors.is_empty() {
            return Err(ArchiverError::Config("No detectors configured".to_string()));
        }
        if let Some(name) = self
            .stations
            .iter()
            .chain(&self.detectors)
            .find(|n| n.trim().is_empty())
        {
            return Err(ArchiverError::Config(format!(
                "Invalid station or detector name {:?}",
                name
            )));
        }
        if self.timing.poll_interval_secs == 0 {
            return Err(ArchiverError::Config(
                "Poll interval must be at least one second".to_string(),
            ));
        }
        if self.paths.archive_dir.is_none() {
            return Err(ArchiverError::Config(
                "No archive directory configured; remote archives are not supported".to_string(),
            ));
        }
        if self.old_bird.converts_station_clips() {
            self.old_bird.station_utc_offset()?;
            for station in &self.stations {
                self.old_bird.device(station)?;
            }
        }
        Ok(())
    }

    /// Directory of one station's active data
    pub fn station_dir(&self, station: &str) -> PathBuf {
        self.paths.active_data_dir.join(station)
    }

    /// Clip directories of one detector at one station
    pub fn detector_paths(&self, station: &str, detector: &str) -> DetectorPaths {
        let active = self.station_dir(station).join(CLIPS_DIR).join(detector);
        let retired = self
            .paths
            .retired_data_dir
            .join(station)
            .join(CLIPS_DIR)
            .join(detector);

        DetectorPaths {
            incoming: active.join("Incoming"),
            created: active.join("Created"),
            archived: active.join("Archived"),
            retired: retired.join("Archived"),
        }
    }
}

/// Clip directories of one (station, detector) pair
///
/// Clips move `incoming` → `created` (registered with the archive) →
/// `archived` (audio copied to the archive) → `retired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorPaths {
    pub incoming: PathBuf,
    pub created: PathBuf,
    pub archived: PathBuf,
    pub retired: PathBuf,
}
