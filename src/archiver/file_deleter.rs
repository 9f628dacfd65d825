//! FileDeleter: sink deleting listed files.

use crate::archiver::item::ArchiveItem;
use crate::dataflow::{ItemSink, StageResult};
use crate::error::ArchiverError;

#[derive(Debug, Default)]
pub struct FileDeleter;

impl ItemSink for FileDeleter {
    type Item = ArchiveItem;

    fn consume_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<()> {
        let file = item.into_file()?;
        tracing::info!("Deleting file {:?}...", file.path);
        std::fs::remove_file(&file.path)
            .map_err(|e| ArchiverError::io_at(&file.path, "delete", e))?;
        Ok(())
    }
}
