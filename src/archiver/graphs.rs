//! Composite archiver graphs.
//!
//! ```text
//! Clip Archiver
//! └── <station>
//!     ├── Old Bird Clip Converter          (optional)
//!     │   ├── File Lister                  (station directory)
//!     │   └── Clip Converter               (→ <Old Bird detector> Incoming)
//!     ├── Old Bird Clip Deleter            (optional, instead of the converter)
//!     │   ├── File Lister
//!     │   └── File Deleter
//!     ├── <detector>                       (one per detector, errors logged)
//!     │   ├── Clip Creator
//!     │   │   ├── Clip Lister              (Incoming)
//!     │   │   └── Archive Clip Creator     (→ Created)
//!     │   └── Clip Audio File Copier
//!     │       ├── Clip Lister              (Created)
//!     │       ├── Clip Audio File Copier   (→ archive)
//!     │       └── Clip Mover               (→ Archived)
//!     └── <detector> Clip Retirer          (one per detector)
//!         ├── Clip Lister                  (Archived)
//!         └── Clip Mover                   (→ Retired)
//! ```
//!
//! All of these graphs are closed: they have no ports and never finish.

use crate::archiver::archive::{ArchiveClient, LocalArchive};
use crate::archiver::clip_audio_file_copier::ClipAudioFileCopier;
use crate::archiver::clip_creator::ArchiveClipCreator;
use crate::archiver::clip_lister::clip_lister;
use crate::archiver::clip_mover::ClipMover;
use crate::archiver::file_deleter::FileDeleter;
use crate::archiver::file_lister::FileLister;
use crate::archiver::item::ArchiveItem;
use crate::archiver::old_bird_clip_converter::{OldBirdClipConverter, OldBirdStation};
use crate::config::{ArchiverConfig, DetectorPaths};
use crate::dataflow::{ErrorPolicy, Graph, Processor, SinkProcessor, SourceProcessor, TransformProcessor};
use crate::error::{ArchiverError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Creates the archive client of each detector clip archiver.
pub type ClientFactory<'a> = dyn FnMut() -> Box<dyn ArchiveClient + Send> + 'a;

type ArchiveGraph = Graph<ArchiveItem>;

/// Full-name pattern of clip audio files written by an Old Bird detector.
pub fn old_bird_clip_file_pattern(detector: &str) -> String {
    format!(
        r"{}_(?P<year>\d{{4}})-(?P<month>\d\d)-(?P<day>\d\d)_(?P<hour>\d\d)\.(?P<minute>\d\d)\.(?P<second>\d\d)_(?P<num>\d\d)\.(?:wav|WAV)",
        regex::escape(detector)
    )
}

/// Lists clips in the incoming directory and registers them with the
/// archive, moving them to the created directory.
pub fn detector_clip_creator(
    paths: &DetectorPaths,
    wait_period: Duration,
    client: Box<dyn ArchiveClient + Send>,
) -> Result<ArchiveGraph> {
    Ok(Graph::builder("Clip Creator")
        .processor(clip_lister("Clip Lister", &paths.incoming, wait_period)?)
        .processor(SinkProcessor::itemwise(
            "Archive Clip Creator",
            ArchiveClipCreator::new(client, &paths.created),
        ))
        .build_linear()?)
}

/// Copies the audio files of created clips into the archive, then moves the
/// clips to the archived directory.
pub fn detector_clip_audio_file_copier(
    paths: &DetectorPaths,
    wait_period: Duration,
    archive_dir: &Path,
) -> Result<ArchiveGraph> {
    Ok(Graph::builder("Clip Audio File Copier")
        .processor(clip_lister("Clip Lister", &paths.created, wait_period)?)
        .processor(TransformProcessor::one_to_one(
            "Clip Audio File Copier",
            ClipAudioFileCopier::new(archive_dir),
        ))
        .processor(SinkProcessor::itemwise("Clip Mover", ClipMover::new(&paths.archived)))
        .build_linear()?)
}

/// Archives one detector's clips at one station. A failure while archiving
/// is logged, and the next pass starts afresh.
pub fn detector_clip_archiver(
    detector: &str,
    paths: &DetectorPaths,
    wait_period: Duration,
    archive_dir: &Path,
    client: Box<dyn ArchiveClient + Send>,
) -> Result<ArchiveGraph> {
    Ok(Graph::builder(detector)
        .processor(detector_clip_creator(paths, wait_period, client)?)
        .processor(detector_clip_audio_file_copier(paths, wait_period, archive_dir)?)
        .error_policy(ErrorPolicy::LogAndContinue)
        .build()?)
}

/// Moves archived clips to the retired directory once they are old enough.
pub fn detector_clip_retirer(
    detector: &str,
    paths: &DetectorPaths,
    retirement_wait_period: Duration,
) -> Result<ArchiveGraph> {
    Ok(Graph::builder(format!("{} Clip Retirer", detector))
        .processor(clip_lister("Clip Lister", &paths.archived, retirement_wait_period)?)
        .processor(SinkProcessor::itemwise("Clip Mover", ClipMover::new(&paths.retired)))
        .build_linear()?)
}

/// Deletes clip files that an Old Bird detector left in a station directory.
pub fn old_bird_clip_deleter(
    station_dir: impl Into<PathBuf>,
    detector: &str,
    wait_period: Duration,
) -> Result<ArchiveGraph> {
    let lister = FileLister::new(station_dir)
        .with_pattern(&old_bird_clip_file_pattern(detector))?
        .with_wait_period(wait_period);

    Ok(Graph::builder("Old Bird Clip Deleter")
        .processor(SourceProcessor::new("File Lister", lister))
        .processor(SinkProcessor::itemwise("File Deleter", FileDeleter))
        .build_linear()?)
}

/// Converts clip files that an Old Bird detector left in a station directory
/// into clips in `incoming_dir`. A file that cannot be converted is logged
/// and stays put for the next pass.
pub fn old_bird_clip_converter(
    station_dir: impl Into<PathBuf>,
    detector: &str,
    wait_period: Duration,
    station: OldBirdStation,
    incoming_dir: impl Into<PathBuf>,
) -> Result<ArchiveGraph> {
    let lister = FileLister::new(station_dir)
        .with_pattern(&old_bird_clip_file_pattern(detector))?
        .with_wait_period(wait_period);

    Ok(Graph::builder("Old Bird Clip Converter")
        .processor(SourceProcessor::new("File Lister", lister))
        .processor(SinkProcessor::itemwise(
            "Clip Converter",
            OldBirdClipConverter::new(station, incoming_dir),
        ))
        .error_policy(ErrorPolicy::LogAndContinue)
        .build_linear()?)
}

/// Archives the clips of every detector at one station.
pub fn station_clip_archiver(
    station: &str,
    config: &ArchiverConfig,
    new_client: &mut ClientFactory<'_>,
) -> Result<ArchiveGraph> {
    let archive = archive_dir(config)?;
    let timing = &config.timing;
    let mut processors: Vec<Box<dyn Processor<ArchiveItem>>> = Vec::new();

    let old_bird = &config.old_bird;
    if old_bird.deletes_station_clips() {
        processors.push(Box::new(old_bird_clip_deleter(
            config.station_dir(station),
            &old_bird.detector_name,
            timing.clip_file_wait_period(),
        )?));
    } else if old_bird.converts_station_clips() {
        let device = old_bird.device(station)?;
        let old_bird_station = OldBirdStation {
            name: station.to_string(),
            recorder: device.recorder.clone(),
            mic_output: device.mic_output.clone(),
            utc_offset: old_bird.station_utc_offset()?,
        };
        let paths = config.detector_paths(station, &old_bird.detector_name);
        processors.push(Box::new(old_bird_clip_converter(
            config.station_dir(station),
            &old_bird.detector_name,
            timing.clip_file_wait_period(),
            old_bird_station,
            paths.incoming,
        )?));
    }

    for detector in &config.detectors {
        let paths = config.detector_paths(station, detector);
        processors.push(Box::new(detector_clip_archiver(
            detector,
            &paths,
            timing.clip_file_wait_period(),
            archive,
            new_client(),
        )?));
    }

    for detector in &config.detectors {
        let paths = config.detector_paths(station, detector);
        processors.push(Box::new(detector_clip_retirer(
            detector,
            &paths,
            timing.clip_file_retirement_wait_period(),
        )?));
    }

    Ok(Graph::builder(station).processors(processors).build()?)
}

/// The root graph: one station clip archiver per configured station.
pub fn clip_archiver(
    name: &str,
    config: &ArchiverConfig,
    new_client: &mut ClientFactory<'_>,
) -> Result<ArchiveGraph> {
    let mut builder = Graph::builder(name);
    for station in &config.stations {
        builder = builder.processor(station_clip_archiver(station, config, new_client)?);
    }
    Ok(builder.build()?)
}

/// The root graph, archiving into the configured local archive directory.
pub fn local_clip_archiver(name: &str, config: &ArchiverConfig) -> Result<ArchiveGraph> {
    let archive = LocalArchive::new(archive_dir(config)?);
    let mut new_client = || -> Box<dyn ArchiveClient + Send> { Box::new(archive.clone()) };
    clip_archiver(name, config, &mut new_client)
}

fn archive_dir(config: &ArchiverConfig) -> Result<&Path> {
    config.paths.archive_dir.as_deref().ok_or_else(|| {
        ArchiverError::Config("No archive directory configured".to_string())
    })
}
