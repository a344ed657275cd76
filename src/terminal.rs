//! Terminal mode control
//!
//! [`TerminalModeController`] captures the terminal's attributes once,
//! switches the line discipline into raw mode, and puts the captured
//! attributes back exactly once: either through [`TerminalModeController::restore`]
//! or, on every other exit path, from `Drop`.

use std::fmt;
use std::os::fd::AsFd;

use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{Result, TerminalError};

/// Access to a terminal's line-discipline attributes
pub trait TermDevice {
    /// Read the current attributes
    fn get_attributes(&self) -> nix::Result<Termios>;

    /// Apply attributes, discarding any input queued before the call
    fn set_attributes(&self, attrs: &Termios) -> nix::Result<()>;
}

/// A terminal reached through a file descriptor (stdin, a pty slave, ...)
pub struct Tty<F: AsFd> {
    fd: F,
}

impl<F: AsFd> Tty<F> {
    pub fn new(fd: F) -> Self {
        Self { fd }
    }
}

impl<F: AsFd> TermDevice for Tty<F> {
    fn get_attributes(&self) -> nix::Result<Termios> {
        termios::tcgetattr(self.fd.as_fd())
    }

    fn set_attributes(&self, attrs: &Termios) -> nix::Result<()> {
        termios::tcsetattr(self.fd.as_fd(), SetArg::TCSAFLUSH, attrs)
    }
}

/// VMIN/VTIME pair for raw-mode reads.
///
/// The defaults make a read return as soon as one byte is available, or
/// with nothing after 100 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadTiming {
    /// Bytes required before `read` returns
    pub min_bytes: u8,
    /// Read timeout in tenths of a second
    pub timeout_deciseconds: u8,
}

impl Default for ReadTiming {
    fn default() -> Self {
        Self {
            min_bytes: 0,
            timeout_deciseconds: 1,
        }
    }
}

/// Attributes captured before any modification. Read-only once taken.
#[derive(Clone)]
pub struct TerminalAttributes(Termios);

impl TerminalAttributes {
    pub fn termios(&self) -> &Termios {
        &self.0
    }
}

impl From<Termios> for TerminalAttributes {
    fn from(termios: Termios) -> Self {
        Self(termios)
    }
}

impl PartialEq for TerminalAttributes {
    fn eq(&self, other: &Self) -> bool {
        same_termios(&self.0, &other.0)
    }
}

impl Eq for TerminalAttributes {}

impl fmt::Debug for TerminalAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalAttributes")
            .field("input_flags", &self.0.input_flags)
            .field("output_flags", &self.0.output_flags)
            .field("control_flags", &self.0.control_flags)
            .field("local_flags", &self.0.local_flags)
            .field("control_chars", &self.0.control_chars)
            .finish()
    }
}

/// Compare every field the driver reports
pub fn same_termios(a: &Termios, b: &Termios) -> bool {
    a.input_flags == b.input_flags
        && a.output_flags == b.output_flags
        && a.control_flags == b.control_flags
        && a.local_flags == b.local_flags
        && a.control_chars == b.control_chars
}

/// Raw-mode attributes derived from a captured snapshot
#[derive(Clone)]
pub struct RawModeConfig(Termios);

impl RawModeConfig {
    /// Derive raw-mode attributes from `original`.
    ///
    /// Input: no flow control, no CR/NL translation, no break signal, no
    /// parity check, no 8th-bit strip. Output: no post-processing. Control:
    /// 8-bit characters. Local: no echo, no canonical mode, no extended
    /// input processing, no signal characters.
    pub fn derive(original: &TerminalAttributes, timing: ReadTiming) -> Self {
        let mut raw = original.0.clone();

        raw.input_flags.remove(
            InputFlags::BRKINT
                | InputFlags::ICRNL
                | InputFlags::INPCK
                | InputFlags::ISTRIP
                | InputFlags::IXON,
        );
        raw.output_flags.remove(OutputFlags::OPOST);
        raw.control_flags.insert(ControlFlags::CS8);
        raw.local_flags
            .remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);

        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = timing.min_bytes;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = timing.timeout_deciseconds;

        Self(raw)
    }

    pub fn termios(&self) -> &Termios {
        &self.0
    }
}

/// Owns the original attributes of one terminal and guarantees they are
/// written back exactly once.
pub struct TerminalModeController<D: TermDevice> {
    device: D,
    original: TerminalAttributes,
    restored: bool,
}

impl<D: TermDevice> TerminalModeController<D> {
    /// Snapshot the device's current attributes.
    ///
    /// From here on, dropping the controller restores the snapshot.
    pub fn capture(device: D) -> Result<Self> {
        let original = device.get_attributes().map_err(|e| {
            error!(error = %e, "failed to query terminal attributes");
            TerminalError::Query(e)
        })?;
        info!("captured original terminal attributes");

        Ok(Self {
            device,
            original: TerminalAttributes(original),
            restored: false,
        })
    }

    /// Apply raw mode derived from the captured snapshot
    pub fn enter_raw_mode(&mut self, timing: ReadTiming) -> Result<()> {
        let raw = RawModeConfig::derive(&self.original, timing);
        self.device.set_attributes(raw.termios()).map_err(|e| {
            error!(error = %e, "failed to enter raw mode");
            TerminalError::Config(e)
        })?;
        info!(
            min_bytes = timing.min_bytes,
            timeout_deciseconds = timing.timeout_deciseconds,
            "entered raw mode"
        );
        Ok(())
    }

    /// Write the captured snapshot back. Consumes the controller so this
    /// cannot run twice; a failure is returned and not retried.
    pub fn restore(mut self) -> Result<()> {
        self.restore_once()
    }

    pub fn original(&self) -> &TerminalAttributes {
        &self.original
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn restore_once(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        self.device
            .set_attributes(self.original.termios())
            .map_err(|e| {
                error!(error = %e, "failed to restore terminal attributes");
                TerminalError::Config(e)
            })?;
        info!("restored original terminal attributes");
        Ok(())
    }
}

impl<D: TermDevice> Drop for TerminalModeController<D> {
    fn drop(&mut self) {
        if !self.restored {
            debug!("restoring terminal on drop");
        }
        if let Err(e) = self.restore_once() {
            eprintln!("error: {}", e);
        }
    }
}
