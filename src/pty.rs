//! PTY pair allocation
//!
//! Wraps `openpty(3)` to produce an owned master/slave pair. The slave is
//! handed to a child process by the launcher; the master is what the caller
//! reads and writes.

use std::os::unix::io::OwnedFd;

use nix::pty::{openpty, OpenptyResult};

use crate::error::{Error, Result};

/// An allocated PTY pair
///
/// Both descriptors are owned: dropping either side closes it exactly once.
/// Before a child is launched the slave belongs exclusively to this pair;
/// afterwards the child holds its own duplicates and the parent copy is
/// closed by the launcher.
pub struct PtyPair {
    /// Caller-facing end of the pair
    pub master: OwnedFd,
    /// Process-facing end, bound to the child's standard streams
    pub slave: OwnedFd,
}

impl PtyPair {
    /// Allocate a new PTY pair
    pub fn open() -> Result<Self> {
        let OpenptyResult { master, slave } = openpty(None, None).map_err(Error::Allocate)?;
        Ok(PtyPair { master, slave })
    }
}
