//! Error types for filtered-viewer
//!
//! Typed errors for the parts of the flow a caller needs to tell apart.
//! Everything else travels as `anyhow::Error`.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors raised while locating, bootstrapping or reading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the host did not provide a plugin config directory")]
    NoConfigRoot,

    #[error("no plugins/config directory at {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("cannot read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("could not create {}: {source}", path.display())]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse failure inside config text, before a file path is attached
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A resolved section that cannot be executed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("section [{section}] has no Command")]
pub struct SectionMissingCommand {
    pub section: String,
    /// User-facing explanation, including the expected `Command=` line
    pub diagnostic: String,
}

/// Errors raised while running a filter command
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to start filter command `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("filter command `{command}` exited with {status}")]
    ExitedNonZero { command: String, status: ExitStatus },

    #[error("temp file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors from the on-save state machine
#[derive(Debug, Error)]
pub enum OnSaveError {
    #[error("filter-on-save callback was not properly registered")]
    NotRegistered,
}
