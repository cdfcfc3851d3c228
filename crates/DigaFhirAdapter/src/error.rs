//! Error types of the adapter binary.

use std::path::PathBuf;

use diga_verzeichnis::DigaError;
use thiserror::Error;

/// Exit status for a completed conversion or a displayed help text.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit status for a missing input file or an aborted conversion.
pub const EXIT_FAILURE: u8 = 1;

/// Result type alias for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// One of the four input documents could not be opened.
    #[error("Input file {} could not be opened: {}", path.display(), source)]
    MissingInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input documents could not be merged into a catalog.
    #[error(transparent)]
    Catalog(#[from] DigaError),

    /// The catalog could not be rendered as JSON.
    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The JSON document could not be written.
    #[error("Failed to write {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    /// Process exit status for an error that ends the run.
    pub fn exit_code(&self) -> u8 {
        match self {
            AdapterError::MissingInput { .. } => EXIT_FAILURE,
            AdapterError::Catalog(_) | AdapterError::Serialize(_) => EXIT_FAILURE,
            // Write failures are logged by `run` and never end the run
            AdapterError::Write { .. } => EXIT_SUCCESS,
        }
    }
}
