//! Dataflow-specific error types.

use crate::dataflow::path::ProcessorPath;
use crate::dataflow::processor::{Operation, ProcessorState};
use thiserror::Error;

/// Boxed error raised by a processor's own logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur within the dataflow engine.
#[derive(Error, Debug)]
pub enum DataflowError {
    /// A lifecycle operation was invoked in the wrong state.
    #[error(
        "Attempt to {operation} processor \"{path}\" in \"{state}\" state. \
         Processor must be in \"{required}\" state."
    )]
    State {
        path: ProcessorPath,
        operation: Operation,
        state: ProcessorState,
        required: ProcessorState,
    },

    /// Settings or data supplied to a processor were invalid.
    #[error("Invalid input for processor \"{path}\": {message}")]
    Validation { path: ProcessorPath, message: String },

    /// A graph's processors or connections are malformed.
    #[error("Invalid topology for processor graph \"{graph}\": {message}")]
    Topology { graph: ProcessorPath, message: String },

    /// A processor's own processing logic failed.
    #[error("Processor \"{path}\" failed: {source}")]
    Processing {
        path: ProcessorPath,
        #[source]
        source: BoxError,
    },
}

impl DataflowError {
    pub fn validation(path: &ProcessorPath, message: impl Into<String>) -> Self {
        DataflowError::Validation {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub fn topology(graph: &ProcessorPath, message: impl Into<String>) -> Self {
        DataflowError::Topology {
            graph: graph.clone(),
            message: message.into(),
        }
    }

    pub fn processing(path: &ProcessorPath, source: impl Into<BoxError>) -> Self {
        DataflowError::Processing {
            path: path.clone(),
            source: source.into(),
        }
    }

    /// Whether this is a call-discipline (lifecycle state) error.
    pub fn is_state_error(&self) -> bool {
        matches!(self, DataflowError::State { .. })
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, DataflowError::Validation { .. })
    }

    pub fn is_topology_error(&self) -> bool {
        matches!(self, DataflowError::Topology { .. })
    }
}

pub type DataflowResult<T> = std::result::Result<T, DataflowError>;
