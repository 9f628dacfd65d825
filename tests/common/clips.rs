//! Clip file fixtures for archiver tests

use clipflow::config::ArchiverConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary active/retired/archive directory tree and a config using it.
pub struct ArchiveFixture {
    pub root: TempDir,
    pub config: ArchiverConfig,
}

impl ArchiveFixture {
    pub fn new(stations: &[&str], detectors: &[&str]) -> Self {
        let root = TempDir::new().unwrap();
        let mut config = ArchiverConfig {
            stations: stations.iter().map(|s| s.to_string()).collect(),
            detectors: detectors.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        };
        config.paths.active_data_dir = root.path().join("Active");
        config.paths.retired_data_dir = root.path().join("Retired");
        config.paths.archive_dir = Some(root.path().join("Archive"));
        config.timing.clip_file_wait_period_secs = 0;
        config.timing.clip_file_retirement_wait_period_secs = 0;
        Self { root, config }
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.path().join("Archive")
    }
}

/// Write a clip metadata file and its audio file into `dir`. Returns the
/// metadata file path.
pub fn write_clip(dir: &Path, station: &str, detector: &str, serial_num: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();

    let stem = format!("{}_{}_2024-05-01_02.03.04_{:02}", station, detector, serial_num);
    let metadata_path = dir.join(format!("{}.json", stem));
    let metadata = json!({
        "clips": [{
            "station": station,
            "detector": detector,
            "start_time": "2024-05-01 02:03:04.000 Z",
            "serial_num": serial_num,
            "length": 4000,
            "sample_rate": 22050
        }]
    });
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata).unwrap()).unwrap();
    std::fs::write(dir.join(format!("{}.wav", stem)), b"RIFF\0\0\0\0WAVE").unwrap();

    metadata_path
}

/// Names of the files in `dir`, sorted. Empty if `dir` does not exist.
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
