//! Error types for terminal control and the input loop

use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// Fatal failures. Every variant names the failing operation so the
/// message reads like `tcgetattr: ENOTTY: Inappropriate ioctl for device`.
#[derive(Error, Debug)]
pub enum TerminalError {
    /// Current attributes could not be read (usually: stdin is not a tty)
    #[error("tcgetattr: {0}")]
    Query(#[source] Errno),

    /// A raw or restored attribute set could not be applied
    #[error("tcsetattr: {0}")]
    Config(#[source] Errno),

    /// Read failed with an errno that is not timeout-equivalent
    #[error("read: {0}")]
    Read(#[source] Errno),

    #[error("write: {0}")]
    Output(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TerminalError>;
