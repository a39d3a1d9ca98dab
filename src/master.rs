//! Caller-side handle for the PTY master

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use crate::error::{Error, Result};
use crate::size::WindowSize;

/// The master side of a launched PTY
///
/// Returned by the launch operations; owns the master descriptor, which is
/// closed on drop. The launcher itself never closes it - the lifetime is
/// entirely the caller's.
///
/// An optional write marker can be set: when present, the marker bytes are
/// written to the device before every payload write. A failed marker write
/// surfaces as the error of the [`Write::write`] call; the reported byte
/// count always covers only the caller's payload.
#[derive(Debug)]
pub struct MasterPty {
    file: File,
    marker: Option<Vec<u8>>,
}

impl MasterPty {
    pub(crate) fn from_fd(fd: OwnedFd) -> Self {
        MasterPty {
            file: File::from(fd),
            marker: None,
        }
    }

    /// Prefix every subsequent write with the given marker bytes
    ///
    /// Off by default. Useful as a diagnostic tap when inspecting the raw
    /// stream reaching the terminal device.
    pub fn set_write_marker<B: Into<Vec<u8>>>(&mut self, marker: B) {
        self.marker = Some(marker.into());
    }

    /// Stop prefixing writes
    pub fn clear_write_marker(&mut self) {
        self.marker = None;
    }

    /// The currently configured write marker, if any
    pub fn write_marker(&self) -> Option<&[u8]> {
        self.marker.as_deref()
    }

    /// Change the terminal size
    pub fn resize(&self, size: WindowSize) -> Result<()> {
        size.apply_to(self.file.as_raw_fd()).map_err(Error::Resize)
    }

    /// Read the current terminal size
    pub fn window_size(&self) -> Result<WindowSize> {
        WindowSize::query(self.file.as_raw_fd()).map_err(Error::Resize)
    }
}

impl Read for MasterPty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for MasterPty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(marker) = &self.marker {
            self.file.write_all(marker)?;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl AsRawFd for MasterPty {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for MasterPty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}
