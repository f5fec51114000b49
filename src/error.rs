//! Error types for pipeline construction and execution.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Everything that can stop a pipeline from being built or from running.
///
/// Schema and directive errors surface while the pipeline is assembled,
/// before any row moves. Decode and I/O errors surface while rows flow and
/// are carried downstream in-band until the sink reports them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("column missing from input data: '{0}'")]
    ColumnNotFound(String),

    #[error("duplicate column name: '{0}'")]
    DuplicateColumn(String),

    #[error("unknown operation: {0}")]
    UnknownOperator(String),

    #[error("{operator}: missing argument <{argument}>")]
    MissingArgument {
        operator: String,
        argument: &'static str,
    },

    #[error("{operator}: {message}")]
    InvalidArgument { operator: String, message: String },

    #[error("pipeline line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("no header row in {0}")]
    EmptyInput(String),

    #[error("unable to read data from input file (row {row}): {source}")]
    Decode {
        row: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("worker for stage '{0}' panicked")]
    WorkerPanicked(String),
}

impl PipelineError {
    pub(crate) fn invalid(operator: &str, message: impl Into<String>) -> Self {
        PipelineError::InvalidArgument {
            operator: operator.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        PipelineError::Csv {
            context: context.into(),
            source,
        }
    }
}
