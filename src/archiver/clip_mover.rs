//! ClipMover: sink moving clip file pairs into a directory.

use crate::archiver::item::ArchiveItem;
use crate::dataflow::{ItemSink, StageResult};
use crate::error::{ArchiverError, Result};
use std::path::{Path, PathBuf};

pub struct ClipMover {
    destination: PathBuf,
}

impl ClipMover {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl ItemSink for ClipMover {
    type Item = ArchiveItem;

    fn consume_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<()> {
        let clip = item.into_clip()?;
        move_file(&clip.audio_path(), &self.destination)?;
        move_file(clip.metadata_path(), &self.destination)?;
        Ok(())
    }
}

/// Move `path` into directory `dir`, creating it if needed. Returns the new
/// path.
pub(crate) fn move_file(path: &Path, dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| ArchiverError::Item(format!("{:?} has no file name", path)))?;
    let new_path = dir.join(name);

    std::fs::create_dir_all(dir).map_err(|e| ArchiverError::io_at(dir, "create", e))?;
    std::fs::rename(path, &new_path).map_err(|e| {
        ArchiverError::Io(e).with_context(format!("Failed to move {:?} to {:?}", path, dir))
    })?;

    tracing::info!("Moved {:?} to {:?}", path, dir);
    Ok(new_path)
}
