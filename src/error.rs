//! Error handling for the clip archiver
//!
//! This module defines the application error type and a Result alias for use
//! by the archiver processors, configuration and binary. Engine errors live
//! in [`crate::dataflow::error`].

use crate::dataflow::DataflowError;
use std::path::Path;
use thiserror::Error;

/// Main error type for archiver operations
#[derive(Error, Debug)]
pub enum ArchiverError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to clip metadata files
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Errors reported by the clip archive
    #[error("Archive error: {0}")]
    Archive(String),

    /// Unexpected item kind or malformed item
    #[error("Item error: {0}")]
    Item(String),

    /// Unreadable WAVE audio files
    #[error("Audio file error: {0}")]
    Audio(#[from] hound::Error),

    /// Invalid file name pattern
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Errors raised by the processor graph
    #[error(transparent)]
    Dataflow(#[from] DataflowError),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ArchiverError>,
    },
}

impl ArchiverError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ArchiverError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// An IO error annotated with the path it concerns
    pub fn io_at(path: &Path, operation: &str, err: std::io::Error) -> Self {
        ArchiverError::Io(err).with_context(format!("Failed to {} {:?}", operation, path))
    }
}

/// Result type alias for archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ArchiverError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
