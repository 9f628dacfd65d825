//! ClipLister: linear graph emitting the clips in a directory.
//!
//! ```text
//! [File Lister] ──► [Clip Object Creator] ──► [Audio File Filter] ──► Output
//! ```
//!
//! A clip is listed once its metadata file is old enough and its audio file
//! exists.

use crate::archiver::clip::Clip;
use crate::archiver::file_lister::FileLister;
use crate::archiver::item::ArchiveItem;
use crate::dataflow::{
    Graph, ItemMap, ItemTransform, PortDescriptor, SourceProcessor, StageResult,
    TransformProcessor, OUTPUT,
};
use crate::error::Result;
use std::path::PathBuf;
use std::time::Duration;

/// File name pattern of clip metadata files
pub const CLIP_METADATA_FILE_PATTERN: &str = r".+\.(?:json|JSON)";

/// Turns listed files into clips.
#[derive(Debug, Default)]
pub struct ClipObjectCreator;

impl ItemMap for ClipObjectCreator {
    type Item = ArchiveItem;

    fn map_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<ArchiveItem> {
        let file = item.into_file()?;
        Ok(ArchiveItem::Clip(Clip::new(file.path)))
    }
}

/// Drops clips whose audio file does not exist (yet).
#[derive(Debug, Default)]
pub struct AudioFileFilter;

impl ItemTransform for AudioFileFilter {
    type Item = ArchiveItem;

    fn transform_item(&mut self, item: ArchiveItem, _: bool) -> StageResult<Option<ArchiveItem>> {
        let clip = item.into_clip()?;
        let audio_path = clip.audio_path();
        if audio_path.is_file() {
            Ok(Some(ArchiveItem::Clip(clip)))
        } else {
            tracing::debug!(
                "Skipping clip {:?}: audio file {:?} not found",
                clip.metadata_path(),
                audio_path
            );
            Ok(None)
        }
    }
}

/// Build a clip lister for `dir`.
pub fn clip_lister(
    name: impl Into<String>,
    dir: impl Into<PathBuf>,
    wait_period: Duration,
) -> Result<Graph<ArchiveItem>> {
    let lister = FileLister::new(dir)
        .with_pattern(CLIP_METADATA_FILE_PATTERN)?
        .with_wait_period(wait_period);

    let graph = Graph::builder(name)
        .output(PortDescriptor::output(OUTPUT))
        .processor(SourceProcessor::new("File Lister", lister))
        .processor(TransformProcessor::one_to_one("Clip Object Creator", ClipObjectCreator))
        .processor(TransformProcessor::itemwise("Audio File Filter", AudioFileFilter))
        .build_linear()?;

    Ok(graph)
}
