//! OldBirdClipConverter: sink turning bare Old Bird clip audio files into
//! clip file pairs.
//!
//! An Old Bird detector writes one WAVE file per clip into its station
//! directory, named for the clip's start time in station local time:
//!
//! ```text
//! Dick_2024-05-01_22.03.04_07.wav
//! ```
//!
//! The converter writes a metadata file for each such clip into the
//! detector's incoming directory and moves the audio file next to it, so the
//! detector clip archiver picks the pair up like any other clip.
//!
//! Old Bird recordings run for eight hours from 21:00 station local time.
//! A clip that starts before noon belongs to the recording that started the
//! previous evening.

use crate::archiver::clip::{AUDIO_FILE_EXTENSION, METADATA_FILE_EXTENSION};
use crate::archiver::item::{ArchiveItem, ListedFile};
use crate::dataflow::{ItemSink, StageResult};
use crate::error::{ArchiverError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Detector name recorded in converted clip metadata
pub const OLD_BIRD_DETECTOR_DESCRIPTION: &str = "Old Bird Dickcissel Detector 1.0";

const RECORDING_START_HOUR: u32 = 21;
const RECORDING_DURATION_SECS: f64 = 8.0 * 3600.0;

/// Where an Old Bird detector's clips were recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OldBirdStation {
    pub name: String,
    pub recorder: String,
    pub mic_output: String,
    /// Offset of station local time from UTC.
    pub utc_offset: FixedOffset,
}

pub struct OldBirdClipConverter {
    station: OldBirdStation,
    incoming_dir: PathBuf,
    classification: Option<String>,
}

impl OldBirdClipConverter {
    pub fn new(station: OldBirdStation, incoming_dir: impl Into<PathBuf>) -> Self {
        Self {
            station,
            incoming_dir: incoming_dir.into(),
            classification: None,
        }
    }

    /// Annotate every converted clip with this classification.
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn incoming_dir(&self) -> &Path {
        &self.incoming_dir
    }

    /// Convert one listed clip audio file. Returns the path of the new
    /// metadata file.
    pub fn convert(&self, file: &ListedFile) -> Result<PathBuf> {
        let offset = self.station.utc_offset;
        let start_time = clip_start_time(file, offset)?;
        let serial_num = capture_field::<u32>(file, "num")?;
        let audio = read_audio_info(&file.path)?;
        let recording_start_time = recording_start_time(start_time, offset)?;

        let metadata = self.metadata(start_time, serial_num, &audio, recording_start_time);
        let stem = format!(
            "{}_{}_{:02}",
            self.station.name,
            start_time.format("%Y-%m-%d_%H.%M.%S.000_Z"),
            serial_num
        );
        let metadata_path = self
            .incoming_dir
            .join(format!("{}.{}", stem, METADATA_FILE_EXTENSION));
        let audio_path = self
            .incoming_dir
            .join(format!("{}.{}", stem, AUDIO_FILE_EXTENSION));

        std::fs::create_dir_all(&self.incoming_dir)
            .map_err(|e| ArchiverError::io_at(&self.incoming_dir, "create", e))?;

        let content = serde_json::to_string_pretty(&metadata)?;
        std::fs::write(&metadata_path, content)
            .map_err(|e| ArchiverError::io_at(&metadata_path, "write", e))?;

        std::fs::rename(&file.path, &audio_path).map_err(|e| {
            ArchiverError::Io(e)
                .with_context(format!("Failed to move {:?} to {:?}", file.path, audio_path))
        })?;

        tracing::info!("Converted Old Bird clip {:?} to {:?}", file.path, metadata_path);
        Ok(metadata_path)
    }

    fn metadata(
        &self,
        start_time: DateTime<Utc>,
        serial_num: u32,
        audio: &AudioInfo,
        recording_start_time: DateTime<Utc>,
    ) -> Value {
        let sample_rate = f64::from(audio.sample_rate);
        let recording_length = (RECORDING_DURATION_SECS * sample_rate).round() as u64;

        let annotations = match &self.classification {
            Some(classification) => json!({ "Classification": classification }),
            None => json!({}),
        };

        json!({
            "recordings": [{
                "station": self.station.name,
                "recorder": self.station.recorder,
                "mic_outputs": [self.station.mic_output],
                "start_time": recording_start_time.format("%Y-%m-%d %H:%M:%S Z").to_string(),
                "length": recording_length,
                "sample_rate": sample_rate,
            }],
            "clips": [{
                "station": self.station.name,
                "mic_output": self.station.mic_output,
                "detector": OLD_BIRD_DETECTOR_DESCRIPTION,
                "start_time": start_time.format("%Y-%m-%d %H:%M:%S%.3f Z").to_string(),
                "serial_num": serial_num,
                "length": audio.length,
                "annotations": annotations,
            }],
        })
    }
}

impl ItemSink for OldBirdClipConverter {
    type Item = ArchiveItem;

    fn consume_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<()> {
        let file = item.into_file()?;
        self.convert(&file)?;
        Ok(())
    }
}

struct AudioInfo {
    /// Length in sample frames.
    length: u32,
    sample_rate: u32,
}

fn read_audio_info(path: &Path) -> Result<AudioInfo> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| ArchiverError::Audio(e).with_context(format!("Failed to read {:?}", path)))?;
    Ok(AudioInfo {
        length: reader.duration(),
        sample_rate: reader.spec().sample_rate,
    })
}

fn capture_field<F: std::str::FromStr>(file: &ListedFile, name: &str) -> Result<F> {
    file.capture(name)
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            ArchiverError::Item(format!(
                "Old Bird clip file name {:?} has no valid \"{}\" field",
                file.path, name
            ))
        })
}

/// Clip start time from the local time fields of the file name.
fn clip_start_time(file: &ListedFile, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(
        capture_field(file, "year")?,
        capture_field(file, "month")?,
        capture_field(file, "day")?,
    );
    let time = date.and_then(|d| {
        d.and_hms_opt(
            capture_field(file, "hour").ok()?,
            capture_field(file, "minute").ok()?,
            capture_field(file, "second").ok()?,
        )
    });
    let local = time.ok_or_else(|| {
        ArchiverError::Item(format!(
            "Old Bird clip file name {:?} has an invalid date or time",
            file.path
        ))
    })?;
    to_utc(local, offset)
}

/// Start of the night's recording that a clip starting at `clip_start`
/// belongs to.
fn recording_start_time(clip_start: DateTime<Utc>, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let local = clip_start.with_timezone(&offset);
    let mut date = local.date_naive();
    if local.hour() < 12 {
        date = date.pred_opt().unwrap_or(date);
    }
    let start = date
        .and_hms_opt(RECORDING_START_HOUR, 0, 0)
        .ok_or_else(|| ArchiverError::Item(format!("No recording start time on {}", date)))?;
    to_utc(start, offset)
}

fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> Result<DateTime<Utc>> {
    local
        .and_local_timezone(offset)
        .single()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| ArchiverError::Item(format!("Invalid local time {}", local)))
}
