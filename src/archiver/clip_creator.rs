//! ArchiveClipCreator: sink registering incoming clips with the archive.
//!
//! For each clip:
//! 1. register the clip's metadata with the archive, obtaining its ID
//! 2. move the audio file into the "created" directory
//! 3. write the metadata, now including the ID, into the "created" directory
//! 4. delete the original metadata file
//!
//! A clip whose registration fails stays where it is and is retried on the
//! next pass.

use crate::archiver::archive::ArchiveClient;
use crate::archiver::clip::Clip;
use crate::archiver::clip_mover::move_file;
use crate::archiver::item::ArchiveItem;
use crate::dataflow::{ItemSink, StageResult};
use crate::error::{ArchiverError, Result};
use std::path::{Path, PathBuf};

pub struct ArchiveClipCreator {
    client: Box<dyn ArchiveClient + Send>,
    created_dir: PathBuf,
}

impl ArchiveClipCreator {
    pub fn new(client: Box<dyn ArchiveClient + Send>, created_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            created_dir: created_dir.into(),
        }
    }

    pub fn created_dir(&self) -> &Path {
        &self.created_dir
    }

    fn create(&mut self, mut clip: Clip) -> Result<u64> {
        let id = self.client.create_clip(clip.metadata()?)?;
        clip.set_id(id)?;

        move_file(&clip.audio_path(), &self.created_dir)?;

        let old_metadata_path = clip.metadata_path().to_path_buf();
        let name = old_metadata_path.file_name().ok_or_else(|| {
            ArchiverError::Item(format!("{:?} has no file name", old_metadata_path))
        })?;
        clip.write_metadata(&self.created_dir.join(name))?;

        std::fs::remove_file(&old_metadata_path)
            .map_err(|e| ArchiverError::io_at(&old_metadata_path, "delete", e))?;

        tracing::info!(
            "Created clip {} for station \"{}\", start time {}",
            id,
            clip.station_name()?,
            clip.start_time()?
        );
        Ok(id)
    }
}

impl ItemSink for ArchiveClipCreator {
    type Item = ArchiveItem;

    fn consume_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<()> {
        self.create(item.into_clip()?)?;
        Ok(())
    }
}
