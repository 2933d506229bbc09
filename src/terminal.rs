use anyhow::{Context, Result};
use nix::sys::termios::{self, SetArg, Termios};
use std::{
    fs::{File, OpenOptions},
    io::{self, Read},
    os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd},
};

pub const DEFAULT_COLUMNS: u16 = 80;

/// The controlling terminal, switched to raw mode for as long as this value lives.
pub struct Terminal {
    tty: File,
    init_term_attrs: Option<Termios>,
}

impl Terminal {
    pub fn open() -> Result<Self> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .context("open /dev/tty")?;
        let init_term_attrs = termios::tcgetattr(tty.as_fd()).context("get terminal attributes")?;
        // Raw mode, so that input is read byte by byte, and keys like ^C arrive as input
        // instead of signals.
        let mut raw = init_term_attrs.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(tty.as_fd(), SetArg::TCSADRAIN, &raw).context("set terminal to raw")?;
        Ok(Self {
            tty,
            init_term_attrs: Some(init_term_attrs),
        })
    }

    /// Puts the terminal back the way it was. Only the first call does anything.
    pub fn restore(&mut self) -> Result<()> {
        let Some(attrs) = self.init_term_attrs.take() else {
            return Ok(());
        };
        termios::tcsetattr(self.tty.as_fd(), SetArg::TCSADRAIN, &attrs)
            .context("restore terminal attributes")
    }

    pub fn columns() -> u16 {
        termsize::get().map_or(DEFAULT_COLUMNS, |size| size.cols)
    }
}

impl Read for Terminal {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.tty.read(buf)
    }
}

impl AsFd for Terminal {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.tty.as_fd()
    }
}

impl AsRawFd for Terminal {
    fn as_raw_fd(&self) -> RawFd {
        self.tty.as_raw_fd()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
