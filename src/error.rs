use std::{io, path::PathBuf};

use thiserror::Error;

/// Everything that can stop a simulation run. None of these are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read parameters from {path:?}: {source}")]
    ConfigUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed parameters: {0}")]
    InvalidConfig(String),

    #[error("cannot write {path:?}: {source}")]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The OS refused to give us a worker thread.
    #[error("failed to start {thread}: {source}")]
    ThreadInit {
        thread: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} panicked")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OutputUnavailable {
            path: path.into(),
            source,
        }
    }
}
