//! Detector clip archiver built on the dataflow engine.
//!
//! Clips written by detectors at monitoring stations move through a fixed set
//! of directories as they are archived:
//!
//! ```text
//! Incoming ──► Created ──► Archived ──► Retired
//!     │            │
//!     │            └──► audio copied into the archive
//!     └──► registered with the archive (ID assigned)
//! ```
//!
//! Each step is a small graph of [`crate::dataflow`] processors; see
//! [`graphs`] for how they nest. Items flowing between processors are
//! [`ArchiveItem`]s: plain listed files or clips.

pub mod archive;
pub mod clip;
pub mod clip_audio_file_copier;
pub mod clip_creator;
pub mod clip_lister;
pub mod clip_mover;
pub mod file_deleter;
pub mod file_lister;
pub mod graphs;
pub mod item;
pub mod old_bird_clip_converter;

pub use archive::{clip_audio_file_path, ArchiveClient, LocalArchive};
pub use clip::Clip;
pub use clip_audio_file_copier::ClipAudioFileCopier;
pub use clip_creator::ArchiveClipCreator;
pub use clip_lister::{clip_lister, AudioFileFilter, ClipObjectCreator, CLIP_METADATA_FILE_PATTERN};
pub use clip_mover::ClipMover;
pub use file_deleter::FileDeleter;
pub use file_lister::FileLister;
pub use graphs::{
    clip_archiver, detector_clip_archiver, detector_clip_audio_file_copier, detector_clip_creator,
    detector_clip_retirer, local_clip_archiver, old_bird_clip_converter, old_bird_clip_deleter,
    old_bird_clip_file_pattern, station_clip_archiver, ClientFactory,
};
pub use item::{ArchiveItem, ListedFile};
pub use old_bird_clip_converter::{OldBirdClipConverter, OldBirdStation};
