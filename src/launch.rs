//! PTY launch sequence
//!
//! The core attachment sequence: allocate a pair, optionally size the master,
//! bind the slave to the descriptor's unset streams, apply session
//! attributes, spawn, and close the parent's slave on every exit path.

use std::mem::ManuallyDrop;
use std::os::unix::io::{AsRawFd, IntoRawFd, OwnedFd};
use std::process::Child;

use log::{debug, warn};

use crate::command::{AttrOverride, SpawnCommand};
use crate::error::{Error, Result};
use crate::master::MasterPty;
use crate::pty::PtyPair;
use crate::size::WindowSize;

/// Start a child on a fresh PTY with the descriptor's own attributes
///
/// Equivalent to [`start_with_attrs`] with no size and [`AttrOverride::Keep`].
/// Since a new descriptor defaults to [`crate::SessionAttrs::session_leader`],
/// this gives interactive-terminal semantics out of the box.
pub fn start(cmd: SpawnCommand) -> Result<(MasterPty, Child)> {
    debug!("starting {:?} on a fresh pty", cmd.program());
    start_with_attrs(cmd, None, AttrOverride::Keep)
}

/// Start a child on a fresh PTY with the given initial window size
pub fn start_with_size(cmd: SpawnCommand, size: WindowSize) -> Result<(MasterPty, Child)> {
    start_with_attrs(cmd, Some(size), AttrOverride::Keep)
}

/// Start a child on a fresh PTY with full control over size and attributes
///
/// The sequence is single-shot: any failure is terminal for the call, with
/// the master released best-effort and the error surfaced verbatim. On every
/// path, success included, the parent's slave descriptor is closed before
/// this returns; after a successful launch only the child holds the slave.
pub fn start_with_attrs(
    mut cmd: SpawnCommand,
    size: Option<WindowSize>,
    attrs: AttrOverride,
) -> Result<(MasterPty, Child)> {
    let PtyPair { master, slave } = PtyPair::open()?;
    let slave = SlaveGuard::new(slave);

    if let Some(size) = size {
        if let Err(err) = size.apply_to(master.as_raw_fd()) {
            best_effort_close(master);
            return Err(Error::Resize(err));
        }
    }

    cmd.apply_session_override(attrs);

    let child = match cmd.spawn_on_slave(slave.fd(), &master) {
        Ok(child) => child,
        Err(err) => {
            best_effort_close(master);
            return Err(Error::Launch(err));
        }
    };
    debug!("child {} attached to pty slave", child.id());

    Ok((MasterPty::from_fd(master), child))
}

/// Closes the parent's slave descriptor when dropped, on every exit path
struct SlaveGuard {
    fd: ManuallyDrop<OwnedFd>,
}

impl SlaveGuard {
    fn new(fd: OwnedFd) -> Self {
        SlaveGuard {
            fd: ManuallyDrop::new(fd),
        }
    }

    fn fd(&self) -> &OwnedFd {
        &self.fd
    }
}

impl Drop for SlaveGuard {
    fn drop(&mut self) {
        // SAFETY: the fd is taken exactly once, here.
        let fd = unsafe { ManuallyDrop::take(&mut self.fd) };
        best_effort_close(fd);
    }
}

/// Close a descriptor without letting a close failure mask the primary error
fn best_effort_close(fd: OwnedFd) {
    if let Err(err) = nix::unistd::close(fd.into_raw_fd()) {
        warn!("best-effort close of pty fd failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SessionAttrs;
    use std::fs::File;
    use std::io::Read;

    fn shell(script: &str) -> SpawnCommand {
        SpawnCommand::new("/bin/sh").arg("-c").arg(script)
    }

    /// Read everything the child wrote to the terminal. Terminates because
    /// the parent's slave copy is closed: once the child exits, reads on the
    /// master fail with EIO instead of blocking.
    fn drain(master: &mut MasterPty) -> String {
        let mut out = String::new();
        let mut buf = [0u8; 1024];
        loop {
            match master.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.push_str(&String::from_utf8_lossy(&buf[..n])),
                Err(_) => break,
            }
        }
        out
    }

    #[test]
    fn trivial_command_exits_zero() {
        let (master, mut child) = start_with_size(shell("exit 0"), WindowSize::new(40, 100))
            .expect("launch failed");

        let size = master.window_size().unwrap();
        assert_eq!(size.rows, 40);
        assert_eq!(size.cols, 100);

        let status = child.wait().unwrap();
        assert_eq!(status.code(), Some(0));
    }

    #[test]
    fn child_sees_the_configured_size() {
        let cmd = shell("stty size");
        let (mut master, mut child) =
            start_with_size(cmd, WindowSize::new(40, 100)).expect("launch failed");

        child.wait().unwrap();
        let out = drain(&mut master);
        assert!(out.contains("40 100"), "unexpected stty output: {out:?}");
    }

    #[test]
    fn unset_streams_all_reach_the_master() {
        let cmd = shell("echo via-stdout; echo via-stderr 1>&2");
        let (mut master, mut child) = start(cmd).expect("launch failed");

        child.wait().unwrap();
        let out = drain(&mut master);
        assert!(out.contains("via-stdout"), "stdout not on pty: {out:?}");
        assert!(out.contains("via-stderr"), "stderr not on pty: {out:?}");
    }

    #[test]
    fn caller_streams_are_left_untouched() {
        let (read_end, write_end) =
            nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).unwrap();
        let cmd = shell("echo through-the-pipe").stdout(write_end);
        let (_master, mut child) = start(cmd).expect("launch failed");

        child.wait().unwrap();
        let mut out = String::new();
        File::from(read_end).read_to_string(&mut out).unwrap();
        // No CR: the output bypassed the terminal's output processing.
        assert_eq!(out, "through-the-pipe\n");
    }

    #[test]
    fn child_standard_streams_are_a_terminal() {
        let cmd = shell("test -t 0 && test -t 1 && test -t 2 && echo ALL_TTY");
        let (mut master, mut child) = start(cmd).expect("launch failed");

        child.wait().unwrap();
        let out = drain(&mut master);
        assert!(out.contains("ALL_TTY"), "streams not on a tty: {out:?}");
    }

    #[test]
    fn working_directory_is_honored() {
        let cmd = shell("pwd").current_dir("/tmp");
        let (mut master, mut child) = start(cmd).expect("launch failed");

        child.wait().unwrap();
        assert!(drain(&mut master).contains("/tmp"));
    }

    #[test]
    fn nonexistent_program_is_a_launch_error() {
        let cmd = SpawnCommand::new("/nonexistent/definitely-not-a-program");
        let err = start(cmd).unwrap_err();
        assert!(matches!(err, Error::Launch(_)), "unexpected error: {err}");
    }

    #[test]
    fn merged_attrs_can_drop_the_controlling_terminal() {
        // Without a controlling terminal the child still runs and its
        // streams still reach the master.
        let cmd = shell("echo detached");
        let attrs = AttrOverride::Merge(SessionAttrs {
            controlling_terminal: Some(false),
            ..SessionAttrs::default()
        });
        let (mut master, mut child) =
            start_with_attrs(cmd, None, attrs).expect("launch failed");

        child.wait().unwrap();
        assert!(drain(&mut master).contains("detached"));
    }
}
