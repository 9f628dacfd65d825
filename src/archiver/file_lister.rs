//! FileLister: source listing the files of a directory.
//!
//! Every call lists the directory afresh, so a file is emitted on every call
//! until something downstream moves or deletes it. The lister never
//! finishes.

use crate::archiver::item::{ArchiveItem, ListedFile};
use crate::dataflow::{Data, Source, StageResult};
use crate::error::{ArchiverError, Result};
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct FileLister {
    dir: PathBuf,
    /// Matched against the whole file name.
    pattern: Option<Regex>,
    /// Minimum time since a file's last modification.
    wait_period: Option<Duration>,
}

impl FileLister {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pattern: None,
            wait_period: None,
        }
    }

    /// List only files whose whole name matches `pattern`. Named capture
    /// groups are recorded on each listed file.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(&format!("^(?:{})$", pattern))?);
        Ok(self)
    }

    /// List only files last modified at least `wait_period` ago.
    pub fn with_wait_period(mut self, wait_period: Duration) -> Self {
        self.wait_period = Some(wait_period);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List the matching files, sorted by path.
    pub fn list(&self) -> Result<Vec<ListedFile>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Directory {:?} does not exist", self.dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(ArchiverError::io_at(&self.dir, "list", e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArchiverError::io_at(&self.dir, "list", e))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = Vec::new();
        for path in paths {
            let Some(file) = self.match_name(path) else {
                continue;
            };
            if self.old_enough(&file.path)? {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn match_name(&self, path: PathBuf) -> Option<ListedFile> {
        let Some(pattern) = &self.pattern else {
            return Some(ListedFile::new(path));
        };

        let name = path.file_name()?.to_str()?;
        let captures = pattern.captures(name)?;
        let captures = pattern
            .capture_names()
            .flatten()
            .filter_map(|group| {
                captures
                    .name(group)
                    .map(|m| (group.to_string(), m.as_str().to_string()))
            })
            .collect();

        Some(ListedFile { path, captures })
    }

    fn old_enough(&self, path: &Path) -> Result<bool> {
        let wait_period = match self.wait_period {
            Some(wait_period) if !wait_period.is_zero() => wait_period,
            _ => return Ok(true),
        };

        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            // Removed between listing and inspection.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ArchiverError::io_at(path, "inspect", e)),
        };

        // A modification time in the future is not old enough.
        Ok(modified
            .elapsed()
            .map(|age| age >= wait_period)
            .unwrap_or(false))
    }
}

impl Source for FileLister {
    type Item = ArchiveItem;

    fn produce(&mut self) -> StageResult<Data<ArchiveItem>> {
        let files = self.list()?;
        Ok(Data::new(files.into_iter().map(ArchiveItem::File).collect(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    const OLD: Duration = Duration::from_secs(3600);

    #[test]
    fn test_lists_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.wav", OLD);
        touch(dir.path(), "a.wav", OLD);
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let files = FileLister::new(dir.path()).list().unwrap();
        let names: Vec<_> = files.iter().filter_map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["a.wav", "b.wav"]);
    }

    #[test]
    fn test_pattern_must_match_whole_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Dick_2024-05-01_02.03.04_00.wav", OLD);
        touch(dir.path(), "Dick_2024-05-01_02.03.04_00.wav.bak", OLD);
        touch(dir.path(), "notes.txt", OLD);

        let lister = FileLister::new(dir.path())
            .with_pattern(r"Dick_(?P<year>\d{4})-\d\d-\d\d_.*\.wav")
            .unwrap();
        let files = lister.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].capture("year"), Some("2024"));
    }

    #[test]
    fn test_wait_period_skips_recent_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "old.json", OLD);
        touch(dir.path(), "new.json", Duration::ZERO);

        let lister = FileLister::new(dir.path()).with_wait_period(Duration::from_secs(10));
        let files = lister.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), Some("old.json"));
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let lister = FileLister::new(dir.path().join("missing"));
        assert!(lister.list().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FileLister::new("/tmp").with_pattern("(unclosed").err().unwrap();
        assert!(matches!(err, ArchiverError::Pattern(_)));
    }

    #[test]
    fn test_never_finishes() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.wav", OLD);
        let mut lister = FileLister::new(dir.path());

        for _ in 0..2 {
            let data = lister.produce().unwrap();
            assert_eq!(data.len(), 1);
            assert!(!data.finished);
        }
    }
}
