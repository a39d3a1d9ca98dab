//! Process descriptor for PTY-attached children
//!
//! [`SpawnCommand`] describes a not-yet-started child: program, arguments,
//! environment, working directory, optional stream overrides, and session
//! attributes. The launcher only touches what the caller left unset - streams
//! it finds empty get the PTY slave, caller-provided streams pass through
//! untouched.

use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Session and controlling-terminal attributes for the child
///
/// Fields are tri-valued so a merge can leave unspecified fields alone:
/// `None` means "no opinion", `Some(v)` forces the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionAttrs {
    /// Run `setsid(2)` in the child, making it a session leader
    pub new_session: Option<bool>,
    /// Make the PTY slave the child's controlling terminal (TIOCSCTTY)
    pub controlling_terminal: Option<bool>,
    /// Move the child into this process group (`setpgid(2)`); ignored when a
    /// new session is requested, since a session leader owns its own group
    pub process_group: Option<i32>,
}

impl SessionAttrs {
    /// New session with the slave as controlling terminal
    ///
    /// This is what interactive terminal use wants and is the default for a
    /// freshly built [`SpawnCommand`].
    pub fn session_leader() -> Self {
        SessionAttrs {
            new_session: Some(true),
            controlling_terminal: Some(true),
            process_group: None,
        }
    }

    fn merge_from(&mut self, other: &SessionAttrs) {
        if other.new_session.is_some() {
            self.new_session = other.new_session;
        }
        if other.controlling_terminal.is_some() {
            self.controlling_terminal = other.controlling_terminal;
        }
        if other.process_group.is_some() {
            self.process_group = other.process_group;
        }
    }
}

/// How launch-time attributes combine with the descriptor's own
///
/// `Keep` leaves the descriptor untouched, `Merge` overrides only the fields
/// the argument specifies, `Replace` swaps the whole attribute set (replacing
/// with [`SessionAttrs::default`] clears everything).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOverride {
    Keep,
    Merge(SessionAttrs),
    Replace(SessionAttrs),
}

/// Descriptor for a child process to be attached to a PTY
pub struct SpawnCommand {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    env_clear: bool,
    cwd: Option<PathBuf>,
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
    stderr: Option<OwnedFd>,
    session: SessionAttrs,
}

impl SpawnCommand {
    /// Create a descriptor for the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        SpawnCommand {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            envs: Vec::new(),
            env_clear: false,
            cwd: None,
            stdin: None,
            stdout: None,
            stderr: None,
            session: SessionAttrs::session_leader(),
        }
    }

    /// Add an argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set an environment variable for the child
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, value: V) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Start the child from an empty environment instead of inheriting
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Set the working directory
    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Connect the child's stdin to this descriptor instead of the PTY slave
    pub fn stdin(mut self, fd: OwnedFd) -> Self {
        self.stdin = Some(fd);
        self
    }

    /// Connect the child's stdout to this descriptor instead of the PTY slave
    pub fn stdout(mut self, fd: OwnedFd) -> Self {
        self.stdout = Some(fd);
        self
    }

    /// Connect the child's stderr to this descriptor instead of the PTY slave
    pub fn stderr(mut self, fd: OwnedFd) -> Self {
        self.stderr = Some(fd);
        self
    }

    /// Set the session attributes carried by this descriptor
    pub fn session(mut self, attrs: SessionAttrs) -> Self {
        self.session = attrs;
        self
    }

    /// The program this descriptor will execute
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// The session attributes currently carried by this descriptor
    pub fn session_attrs(&self) -> SessionAttrs {
        self.session
    }

    pub(crate) fn apply_session_override(&mut self, attrs: AttrOverride) {
        match attrs {
            AttrOverride::Keep => {}
            AttrOverride::Merge(a) => self.session.merge_from(&a),
            AttrOverride::Replace(a) => self.session = a,
        }
    }

    /// Launch the child with unset streams bound to the given PTY slave
    ///
    /// `master` is closed in the child before exec so the child does not keep
    /// the caller-facing end of the pair alive.
    pub(crate) fn spawn_on_slave(self, slave: &OwnedFd, master: &OwnedFd) -> io::Result<Child> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.env_clear {
            command.env_clear();
        }
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        command.stdin(stream_or_slave(self.stdin, slave)?);
        command.stdout(stream_or_slave(self.stdout, slave)?);
        command.stderr(stream_or_slave(self.stderr, slave)?);

        let new_session = self.session.new_session.unwrap_or(false);
        let controlling_terminal = self.session.controlling_terminal.unwrap_or(false);
        let process_group = self.session.process_group;
        let slave_fd = slave.as_raw_fd();
        let master_fd = master.as_raw_fd();

        // Runs in the child after fork, before exec. Only async-signal-safe
        // libc calls are allowed here.
        unsafe {
            command.pre_exec(move || {
                if new_session {
                    if libc::setsid() == -1 {
                        return Err(io::Error::last_os_error());
                    }
                } else if let Some(pgid) = process_group {
                    if libc::setpgid(0, pgid as libc::pid_t) == -1 {
                        return Err(io::Error::last_os_error());
                    }
                }
                if controlling_terminal && libc::ioctl(slave_fd, libc::TIOCSCTTY, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                // The standard streams were already dup'd by the spawn
                // machinery; the inherited originals must not outlive exec.
                if slave_fd > libc::STDERR_FILENO {
                    libc::close(slave_fd);
                }
                libc::close(master_fd);
                Ok(())
            });
        }

        command.spawn()
    }
}

fn stream_or_slave(stream: Option<OwnedFd>, slave: &OwnedFd) -> io::Result<Stdio> {
    match stream {
        Some(fd) => Ok(Stdio::from(fd)),
        None => Ok(Stdio::from(slave.try_clone()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_to_session_leader() {
        let cmd = SpawnCommand::new("/bin/sh");
        assert_eq!(cmd.session_attrs(), SessionAttrs::session_leader());
    }

    #[test]
    fn keep_leaves_attrs_untouched() {
        let mut cmd = SpawnCommand::new("/bin/sh");
        cmd.apply_session_override(AttrOverride::Keep);
        assert_eq!(cmd.session_attrs(), SessionAttrs::session_leader());
    }

    #[test]
    fn merge_overrides_only_specified_fields() {
        let mut cmd = SpawnCommand::new("/bin/sh");
        cmd.apply_session_override(AttrOverride::Merge(SessionAttrs {
            controlling_terminal: Some(false),
            ..SessionAttrs::default()
        }));

        let attrs = cmd.session_attrs();
        assert_eq!(attrs.new_session, Some(true));
        assert_eq!(attrs.controlling_terminal, Some(false));
        assert_eq!(attrs.process_group, None);
    }

    #[test]
    fn replace_with_default_clears_everything() {
        let mut cmd = SpawnCommand::new("/bin/sh");
        cmd.apply_session_override(AttrOverride::Replace(SessionAttrs::default()));
        assert_eq!(cmd.session_attrs(), SessionAttrs::default());
    }
}
