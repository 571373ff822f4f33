//! Startup error type.
//!
//! Only startup is fallible. Once the cycle loop runs, every per-cycle
//! computation degrades to "no data" instead of returning an error.

use andon_common::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Scenario file could not be read or parsed.
    #[error("scenario: {0}")]
    Scenario(String),

    /// Worker thread could not be spawned or panicked.
    #[error("thread {name}: {reason}")]
    Thread { name: &'static str, reason: String },
}
