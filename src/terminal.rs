//! Terminal utilities

use crate::Result;
use log::debug;
use nix::libc;
use nix::sys::termios::{self, SetArg, Termios};
use std::io;
use std::os::fd::AsFd;
use std::os::unix::io::RawFd;

/// Get terminal size (columns, rows) for a file descriptor
pub fn get_terminal_size(fd: RawFd) -> (u16, u16) {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };

    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 {
        (ws.ws_col, ws.ws_row)
    } else {
        // Default size if ioctl fails
        (80, 24)
    }
}

/// Put stdin in raw mode, restoring the original attributes on drop
///
/// Raw mode delivers single keystrokes without echo so playback keys act
/// immediately.
pub struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(stdin.as_fd()).map_err(io::Error::from)?;

        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &raw).map_err(io::Error::from)?;

        debug!("Terminal switched to raw mode");
        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let stdin = io::stdin();
        if let Err(e) = termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &self.original) {
            debug!("Failed to restore terminal attributes: {}", e);
        } else {
            debug!("Terminal attributes restored");
        }
    }
}
