//! Error types for pkgversion
//!
//! All fallible operations return `Result<T, Error>`.
//! Version normalization is not fallible in this sense: a malformed
//! describe string yields `None`, never an `Error`.

use std::path::PathBuf;

use thiserror::Error;

/// pkgversion error types
#[derive(Debug, Error)]
pub enum Error {
    /// File could not be read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `git` executable could not be spawned
    #[error("failed to run `{command}`: {source}")]
    Git {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process output was not valid UTF-8
    #[error("invalid UTF-8 in command output: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// No repository root could be located from the working directory
    #[error("not inside a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// Describe output did not normalize to a PEP 440 version
    #[error("unparseable version: {0:?}")]
    UnparseableVersion(String),

    /// Malformed line in a requirements file
    #[error("{}:{line}: {message}", path.display())]
    Requirement {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A requirements file includes itself, directly or transitively
    #[error("requirements include cycle at {}", .0.display())]
    IncludeCycle(PathBuf),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pkgversion operations
pub type Result<T> = std::result::Result<T, Error>;
