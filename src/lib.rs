//! # Clipflow: processor graphs and a detector clip archiver
//!
//! A small batch dataflow engine plus the clip archiver that runs on it at
//! bioacoustic monitoring stations.
//!
//! ## Architecture
//!
//! - **Dataflow**: processors with named ports, composed into graphs that are
//!   themselves processors
//! - **Archiver**: file listers, clip creators, copiers and movers wired into
//!   per-station, per-detector graphs
//! - **Config**: TOML archiver configuration
//! - **Logging**: `tracing` subscriber setup, optionally to a file
//!
//! ## Example
//!
//! ```no_run
//! use clipflow::{
//!     archiver::local_clip_archiver,
//!     config::ArchiverConfig,
//!     dataflow::{DataMap, PortSettings, Processor},
//! };
//!
//! fn main() -> clipflow::Result<()> {
//!     let config = ArchiverConfig::load("archiver.toml")?;
//!     config.validate()?;
//!
//!     let mut archiver = local_clip_archiver("Clip Archiver", &config)?;
//!     archiver.connect(PortSettings::new())?;
//!     archiver.start()?;
//!
//!     loop {
//!         archiver.process(DataMap::new())?;
//!         std::thread::sleep(config.timing.poll_interval());
//!     }
//! }
//! ```

pub mod archiver;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use archiver::{local_clip_archiver, ArchiveItem, Clip};
pub use config::ArchiverConfig;
pub use dataflow::{DataflowError, Graph, GraphBuilder, Processor};
pub use error::{ArchiverError, Result};
