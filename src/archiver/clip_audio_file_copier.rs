//! ClipAudioFileCopier: copies clip audio files into the archive.

use crate::archiver::archive::clip_audio_file_path;
use crate::archiver::clip::Clip;
use crate::archiver::item::ArchiveItem;
use crate::dataflow::{ItemMap, StageResult};
use crate::error::{ArchiverError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Copies each clip's audio file to its place in the archive's clip layout
/// and passes the clip on unchanged. The clip must have an archive ID.
pub struct ClipAudioFileCopier {
    archive_dir: PathBuf,
}

impl ClipAudioFileCopier {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
        }
    }

    fn copy(&self, clip: &Clip) -> Result<PathBuf> {
        let id = clip.id()?.ok_or_else(|| {
            ArchiverError::Item(format!("Clip {:?} has no archive ID", clip.metadata_path()))
        })?;

        let from = clip.audio_path();
        let to = clip_audio_file_path(&self.archive_dir, id);

        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiverError::io_at(parent, "create", e))?;
        }
        std::fs::copy(&from, &to).map_err(|e| {
            ArchiverError::Io(e).with_context(format!("Failed to copy {:?} to {:?}", from, to))
        })?;
        preserve_modified_time(&from, &to)?;

        tracing::info!("Copied audio file of clip {} to {:?}", id, to);
        Ok(to)
    }
}

fn preserve_modified_time(from: &Path, to: &Path) -> Result<()> {
    let modified = std::fs::metadata(from)
        .and_then(|m| m.modified())
        .map_err(|e| ArchiverError::io_at(from, "inspect", e))?;
    File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| ArchiverError::io_at(to, "set modification time of", e))
}

impl ItemMap for ClipAudioFileCopier {
    type Item = ArchiveItem;

    fn map_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<ArchiveItem> {
        let clip = item.into_clip()?;
        self.copy(&clip)?;
        Ok(ArchiveItem::Clip(clip))
    }
}
