//! Error types for PTY launch operations

use std::io;
use thiserror::Error;

/// PTY launch error type
///
/// Each variant corresponds to one stage of the attachment sequence. None of
/// them are retried; a failure is terminal for the call, with any already
/// acquired descriptors released best-effort before the error is returned.
#[derive(Error, Debug)]
pub enum Error {
    /// The PTY master/slave pair could not be allocated
    #[error("Failed to allocate PTY pair: {0}")]
    Allocate(#[source] nix::Error),

    /// The window size could not be applied to the master
    #[error("Failed to apply window size: {0}")]
    Resize(#[source] io::Error),

    /// The child process could not be started
    #[error("Failed to launch child process: {0}")]
    Launch(#[source] io::Error),
}

/// Result type for PTY launch operations
pub type Result<T> = std::result::Result<T, Error>;
