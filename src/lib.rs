//! pty-launch - attach child processes to a freshly allocated pseudoterminal.
//!
//! This crate covers the PTY-to-process attachment sequence on Linux:
//! - Allocate a PTY master/slave pair
//! - Optionally apply an initial window size to the master
//! - Bind the slave to whichever standard streams the caller left unset
//! - Configure session and controlling-terminal attributes
//! - Launch the child and close the parent's slave descriptor on every path
//!
//! The entry points are [`start`], [`start_with_size`] and
//! [`start_with_attrs`]; all three return the master-side handle
//! ([`MasterPty`]) together with the running [`std::process::Child`].
//!
//! Reference: https://www.man7.org/linux/man-pages/man7/pty.7.html

mod command;
mod error;
mod launch;
mod master;
mod pty;
mod size;

pub use command::{AttrOverride, SessionAttrs, SpawnCommand};
pub use error::{Error, Result};
pub use launch::{start, start_with_attrs, start_with_size};
pub use master::MasterPty;
pub use pty::PtyPair;
pub use size::WindowSize;
