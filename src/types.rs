//! Core types for the byte loop

use nix::errno::Errno;

/// DEL is the only control code above the C0 range
const DEL: u8 = 0x7f;

/// Outcome of one timed read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// One byte arrived
    Byte(u8),
    /// Nothing arrived within the read timeout
    Timeout,
    /// The read failed with an errno that is not timeout-equivalent
    Error(Errno),
}

/// A byte tagged with its ASCII control classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedByte {
    pub code: u8,
    pub is_control: bool,
}

impl ClassifiedByte {
    /// Classify a byte: control iff it is below 32 or is DEL
    pub fn new(code: u8) -> Self {
        Self {
            code,
            is_control: code < 0x20 || code == DEL,
        }
    }
}

impl From<u8> for ClassifiedByte {
    fn from(code: u8) -> Self {
        Self::new(code)
    }
}
