use crate::signal::SigNum;
use nix::errno::Errno;
use std::fmt;
use thiserror::Error;

/// Main error type for sigrelay
#[derive(Debug, Error)]
pub enum SigrelayError {
    // Forwarder usage errors
    #[error("Invalid child process: {0}")]
    InvalidChild(String),

    #[error("Signal forwarding is already active for PID {pid}")]
    AlreadyActive { pid: i32 },

    // Disposition errors
    #[error("Failed to install forwarding handler for {signal}: {source}")]
    Install {
        signal: SigNum,
        #[source]
        source: Errno,
    },

    #[error("Failed to restore {} signal disposition(s): {}", .0.len(), format_failures(.0))]
    Restore(Vec<RestoreFailure>),

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    // Child process errors
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    #[error("Failed to wait for process: {0}")]
    WaitError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A signal whose previous disposition could not be put back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreFailure {
    pub signal: SigNum,
    pub errno: Errno,
}

impl fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.signal, self.errno)
    }
}

fn format_failures(failures: &[RestoreFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for sigrelay operations
pub type Result<T> = std::result::Result<T, SigrelayError>;
