// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! Construction-time and explicit start/stop failures are returned to the
//! caller; background tasks (stream readers, exit watchers, the watch loop)
//! surface their failures through logging only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pattern error: {0}")]
    PatternError(String),

    #[error("failed to spawn task '{task}': {source}")]
    SpawnError {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to kill process {pid} of task '{task}': {source}")]
    KillError {
        task: String,
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("file watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProcwatchError>;
