use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent a traffic configuration file from being read at all.
/// Malformed lines inside a readable file are reported as warnings instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Traffic configuration file does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Traffic configuration file is not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("No valid traffic pattern in {0}")]
    NoPattern(PathBuf),
    #[error("Unable to read traffic configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Conversion failure of a single `key=value` pair
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("'{0}' is not a valid boolean value")]
    Boolean(String),
    #[error("'{0}' is not a valid non-negative integer")]
    Integer(String),
    #[error("'{value}' is out of range (maximum {max})")]
    OutOfRange { value: String, max: u64 },
    #[error("'{0}' is not a valid name")]
    Name(String),
}

/// Errors reported by a [`crate::face::Face`]
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("the face is closed")]
    Closed,
    #[error("cannot register prefix {prefix}: {reason}")]
    Registration { prefix: String, reason: String },
    #[error("cannot sign Data {name}: {reason}")]
    Signing { name: String, reason: String },
}
