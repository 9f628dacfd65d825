//! Clip archive clients.
//!
//! An archive assigns every registered clip a unique numeric ID. The archive
//! keeps clip audio files under a directory layout derived from that ID:
//!
//! ```text
//! <archive>/Clips/000/028/Clip 000 028 180.wav
//! ```

use crate::error::{ArchiverError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Registers clips with an archive.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveClient {
    /// Register the clip described by `metadata` (a clip metadata file's
    /// contents) and return its archive ID.
    fn create_clip(&mut self, metadata: &Value) -> Result<u64>;
}

/// Path of a clip's audio file within an archive directory.
pub fn clip_audio_file_path(archive_dir: &Path, clip_id: u64) -> PathBuf {
    let id = format!("{:09}", clip_id);
    let (id0, rest) = id.split_at(id.len() - 6);
    let (id1, id2) = rest.split_at(3);
    archive_dir
        .join("Clips")
        .join(id0)
        .join(id1)
        .join(format!("Clip {} {} {}.wav", id0, id1, id2))
}

// ==================== Local Archive ====================

const CLIP_IDS_FILE: &str = "clip_ids.json";
const METADATA_DIR: &str = "Metadata";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClipIds {
    last_id: u64,
}

/// A directory-backed archive.
///
/// Clip IDs are allocated sequentially from 1 and the last allocated ID is
/// persisted in `clip_ids.json`. Registered clip metadata is kept under
/// `Metadata/<id>.json`.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    dir: PathBuf,
}

impl LocalArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self, clip_id: u64) -> PathBuf {
        self.dir.join(METADATA_DIR).join(format!("{}.json", clip_id))
    }

    pub fn clip_audio_file_path(&self, clip_id: u64) -> PathBuf {
        clip_audio_file_path(&self.dir, clip_id)
    }

    /// The most recently allocated clip ID, or 0 if none.
    pub fn last_clip_id(&self) -> Result<u64> {
        let path = self.dir.join(CLIP_IDS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let ids: ClipIds = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse {:?}", path))?;
                Ok(ids.last_id)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(ArchiverError::io_at(&path, "read", e)),
        }
    }

    fn allocate_clip_id(&self) -> Result<u64> {
        let id = self.last_clip_id()? + 1;
        let path = self.dir.join(CLIP_IDS_FILE);
        let content = serde_json::to_string(&ClipIds { last_id: id })?;
        std::fs::write(&path, content).map_err(|e| ArchiverError::io_at(&path, "write", e))?;
        Ok(id)
    }
}

impl ArchiveClient for LocalArchive {
    fn create_clip(&mut self, metadata: &Value) -> Result<u64> {
        if metadata.get("clips").and_then(|c| c.get(0)).is_none() {
            return Err(ArchiverError::Archive(
                "Clip metadata describes no clips".to_string(),
            ));
        }

        let metadata_dir = self.dir.join(METADATA_DIR);
        std::fs::create_dir_all(&metadata_dir)
            .map_err(|e| ArchiverError::io_at(&metadata_dir, "create", e))?;

        let id = self.allocate_clip_id()?;

        let mut metadata = metadata.clone();
        if let Some(clip) = metadata
            .get_mut("clips")
            .and_then(|c| c.get_mut(0))
            .and_then(Value::as_object_mut)
        {
            clip.insert("id".to_string(), Value::from(id));
        }

        let path = self.metadata_path(id);
        std::fs::write(&path, serde_json::to_string_pretty(&metadata)?)
            .map_err(|e| ArchiverError::io_at(&path, "write", e))?;

        tracing::debug!("Archive {:?} registered clip {}", self.dir, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_clip_audio_file_path() {
        assert_eq!(
            clip_audio_file_path(Path::new("/archive"), 28180),
            PathBuf::from("/archive/Clips/000/028/Clip 000 028 180.wav")
        );
        assert_eq!(
            clip_audio_file_path(Path::new("/archive"), 123_456_789),
            PathBuf::from("/archive/Clips/123/456/Clip 123 456 789.wav")
        );
    }

    #[test]
    fn test_ids_are_sequential_and_persisted() {
        let dir = TempDir::new().unwrap();
        let metadata = json!({ "clips": [{ "length": 10 }] });

        let mut archive = LocalArchive::new(dir.path());
        assert_eq!(archive.last_clip_id().unwrap(), 0);
        assert_eq!(archive.create_clip(&metadata).unwrap(), 1);
        assert_eq!(archive.create_clip(&metadata).unwrap(), 2);

        let mut reopened = LocalArchive::new(dir.path());
        assert_eq!(reopened.create_clip(&metadata).unwrap(), 3);

        let stored: Value =
            serde_json::from_str(&std::fs::read_to_string(archive.metadata_path(3)).unwrap())
                .unwrap();
        assert_eq!(stored["clips"][0]["id"], json!(3));
    }

    #[test]
    fn test_rejects_metadata_without_clips() {
        let dir = TempDir::new().unwrap();
        let mut archive = LocalArchive::new(dir.path());
        let err = archive.create_clip(&json!({ "clips": [] })).unwrap_err();
        assert!(matches!(err, ArchiverError::Archive(_)));
        assert_eq!(archive.last_clip_id().unwrap(), 0);
    }
}
