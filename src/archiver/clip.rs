//! Clips stored as a JSON metadata file plus a WAVE audio file.
//!
//! The metadata file format allows any number of clips per file, but a clip
//! file pair always describes exactly one clip: the first entry of `clips`.
//! The audio file has the metadata file's stem and a `.wav` extension.
//!
//! ```json
//! {
//!     "recordings": { "Alamo 2024-05-01 01:00:00 Z": { "sample_rate": 24000 } },
//!     "clips": [{
//!         "recording": "Alamo 2024-05-01 01:00:00 Z",
//!         "start_time": "2024-05-01 02:03:04.500 Z",
//!         "serial_num": 2,
//!         "length": 30870,
//!         "annotations": { "Classification": "Call.DICK" }
//!     }]
//! }
//! ```
//!
//! Metadata is read on first access and cached.

use crate::error::{ArchiverError, Result, ResultExt};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Audio file extension of a clip
pub const AUDIO_FILE_EXTENSION: &str = "wav";

/// Metadata file extension of a clip
pub const METADATA_FILE_EXTENSION: &str = "json";

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone)]
pub struct Clip {
    metadata_path: PathBuf,
    metadata: OnceLock<Value>,
}

impl Clip {
    pub fn new(metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            metadata_path: metadata_path.into(),
            metadata: OnceLock::new(),
        }
    }

    /// A clip whose metadata is already in memory.
    pub fn with_metadata(metadata_path: impl Into<PathBuf>, metadata: Value) -> Self {
        Self {
            metadata_path: metadata_path.into(),
            metadata: OnceLock::from(metadata),
        }
    }

    // ── Files ──

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn audio_path(&self) -> PathBuf {
        self.metadata_path.with_extension(AUDIO_FILE_EXTENSION)
    }

    /// The full contents of the metadata file.
    pub fn metadata(&self) -> Result<&Value> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let content = std::fs::read_to_string(&self.metadata_path)
            .with_context(|| format!("Failed to read clip metadata file {:?}", self.metadata_path))?;
        let metadata: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse clip metadata file {:?}", self.metadata_path))?;
        Ok(self.metadata.get_or_init(|| metadata))
    }

    /// Write the (possibly updated) metadata as pretty-printed JSON.
    pub fn write_metadata(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self.metadata()?)?;
        std::fs::write(path, content).map_err(|e| ArchiverError::io_at(path, "write", e))
    }

    fn clip_metadata(&self) -> Result<&Value> {
        self.metadata()?
            .get("clips")
            .and_then(|clips| clips.get(0))
            .ok_or_else(|| self.malformed("has no clips"))
    }

    fn field(&self, name: &str) -> Result<&Value> {
        self.clip_metadata()?
            .get(name)
            .ok_or_else(|| self.malformed(&format!("has no clip \"{}\" field", name)))
    }

    fn optional_field(&self, name: &str) -> Result<Option<&Value>> {
        Ok(self.clip_metadata()?.get(name).filter(|v| !v.is_null()))
    }

    fn malformed(&self, message: &str) -> ArchiverError {
        ArchiverError::Item(format!(
            "Clip metadata file {:?} {}",
            self.metadata_path, message
        ))
    }

    // ── Metadata ──

    /// Archive ID, absent until the clip has been registered.
    pub fn id(&self) -> Result<Option<u64>> {
        self.optional_field("id")?
            .map(|v| as_u64(v).ok_or_else(|| self.malformed("has a non-integer clip ID")))
            .transpose()
    }

    /// Record the archive ID in the clip metadata.
    pub fn set_id(&mut self, id: u64) -> Result<()> {
        self.metadata()?;
        let clip = self
            .metadata
            .get_mut()
            .and_then(|m| m.get_mut("clips"))
            .and_then(|clips| clips.get_mut(0))
            .and_then(Value::as_object_mut);
        match clip {
            Some(clip) => {
                clip.insert("id".to_string(), Value::from(id));
                Ok(())
            }
            None => Err(self.malformed("has no clips")),
        }
    }

    /// Station name: the clip's `station` field, else the name of its
    /// recording without the trailing `<date> <time> Z`.
    pub fn station_name(&self) -> Result<String> {
        if let Some(station) = self.optional_field("station")?.and_then(Value::as_str) {
            return Ok(station.to_string());
        }
        let recording = self.recording_name()?;
        let mut fields = recording.rsplitn(4, char::is_whitespace);
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(_), Some(_), Some(_), Some(station)) if !station.trim().is_empty() => {
                Ok(station.trim_end().to_string())
            }
            _ => Err(self.malformed(&format!(
                "has recording name \"{}\" with no station name",
                recording
            ))),
        }
    }

    fn recording_name(&self) -> Result<&str> {
        self.field("recording")?
            .as_str()
            .ok_or_else(|| self.malformed("has a non-string recording name"))
    }

    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        let text = self
            .field("start_time")?
            .as_str()
            .ok_or_else(|| self.malformed("has a non-string start time"))?;
        parse_start_time(text).ok_or_else(|| {
            self.malformed(&format!("has unparseable start time \"{}\"", text))
        })
    }

    pub fn serial_num(&self) -> Result<Option<u32>> {
        self.optional_field("serial_num")?
            .map(|v| {
                as_u64(v)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| self.malformed("has an invalid serial number"))
            })
            .transpose()
    }

    /// Length in sample frames.
    pub fn length(&self) -> Result<u64> {
        as_u64(self.field("length")?).ok_or_else(|| self.malformed("has an invalid length"))
    }

    /// Sample rate of the clip's recording, in hertz.
    pub fn sample_rate(&self) -> Result<f64> {
        let recordings = self
            .metadata()?
            .get("recordings")
            .ok_or_else(|| self.malformed("has no recordings"))?;

        let recording = match recordings {
            Value::Object(map) => map.get(self.recording_name()?),
            Value::Array(list) => match self.optional_field("recording")?.and_then(Value::as_str) {
                Some(name) => list
                    .iter()
                    .find(|r| r.get("name").and_then(Value::as_str) == Some(name)),
                None => list.first(),
            },
            _ => None,
        }
        .ok_or_else(|| self.malformed("has no recording for its clip"))?;

        recording
            .get("sample_rate")
            .and_then(as_f64)
            .ok_or_else(|| self.malformed("has an invalid recording sample rate"))
    }

    /// The `Classification` annotation, if any.
    pub fn classification(&self) -> Result<Option<String>> {
        Ok(self
            .optional_field("annotations")?
            .and_then(|a| a.get("Classification"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Parse `"YYYY-MM-DD HH:MM:SS[.fff] <zone>"`, where the zone is `Z`, `UTC`
/// or a `±HH:MM` offset.
pub fn parse_start_time(text: &str) -> Option<DateTime<Utc>> {
    let mut parts = text.split_whitespace();
    let (date, time, zone) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let local = format!("{} {}", date, time);
    match zone {
        "Z" | "UTC" => NaiveDateTime::parse_from_str(&local, START_TIME_FORMAT)
            .ok()
            .map(|t| t.and_utc()),
        offset => DateTime::parse_from_str(
            &format!("{} {}", local, offset),
            &format!("{} %:z", START_TIME_FORMAT),
        )
        .ok()
        .map(|t| t.with_timezone(&Utc)),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
