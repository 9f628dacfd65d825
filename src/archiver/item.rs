//! Items flowing through the archiver graphs.

use crate::archiver::clip::Clip;
use crate::error::{ArchiverError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A file found by a [`FileLister`](crate::archiver::FileLister).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub path: PathBuf,
    /// Named capture groups of the file name pattern, if one was used.
    pub captures: BTreeMap<String, String>,
}

impl ListedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            captures: BTreeMap::new(),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }
}

/// Item type of every archiver processor.
#[derive(Debug, Clone)]
pub enum ArchiveItem {
    File(ListedFile),
    Clip(Clip),
}

impl ArchiveItem {
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveItem::File(_) => "file",
            ArchiveItem::Clip(_) => "clip",
        }
    }

    /// Path of the listed file, or of the clip's metadata file.
    pub fn path(&self) -> &Path {
        match self {
            ArchiveItem::File(file) => &file.path,
            ArchiveItem::Clip(clip) => clip.metadata_path(),
        }
    }

    pub fn into_file(self) -> Result<ListedFile> {
        match self {
            ArchiveItem::File(file) => Ok(file),
            other => Err(unexpected("file", &other)),
        }
    }

    pub fn into_clip(self) -> Result<Clip> {
        match self {
            ArchiveItem::Clip(clip) => Ok(clip),
            other => Err(unexpected("clip", &other)),
        }
    }
}

fn unexpected(expected: &str, item: &ArchiveItem) -> ArchiverError {
    ArchiverError::Item(format!(
        "expected a {} but received a {} ({:?})",
        expected,
        item.kind(),
        item.path()
    ))
}

impl From<ListedFile> for ArchiveItem {
    fn from(file: ListedFile) -> Self {
        ArchiveItem::File(file)
    }
}

impl From<Clip> for ArchiveItem {
    fn from(clip: Clip) -> Self {
        ArchiveItem::Clip(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_file_accessors() {
        let mut file = ListedFile::new("/data/Dick_2024-05-01_02.03.04_00.wav");
        file.captures.insert("year".to_string(), "2024".to_string());
        assert_eq!(file.file_name(), Some("Dick_2024-05-01_02.03.04_00.wav"));
        assert_eq!(file.capture("year"), Some("2024"));
        assert_eq!(file.capture("month"), None);
    }

    #[test]
    fn test_wrong_variant_is_an_error() {
        let item = ArchiveItem::from(ListedFile::new("/data/a.json"));
        assert_eq!(item.kind(), "file");
        let err = item.into_clip().unwrap_err();
        assert!(matches!(err, ArchiverError::Item(_)));
        assert!(err.to_string().contains("expected a clip"));

        let item = ArchiveItem::from(Clip::new("/data/a.json"));
        assert!(item.clone().into_clip().is_ok());
        assert!(item.into_file().is_err());
    }
}
