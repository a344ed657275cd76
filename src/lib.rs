//! Kilo - raw-mode terminal substrate
//!
//! Switches the controlling terminal into raw mode, reports every byte typed
//! until `q`, and always puts the terminal back the way it was.

pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod render;
pub mod terminal;
pub mod types;

pub use error::{Result, TerminalError};
pub use input::{ByteSource, FdByteSource, InputLoop, LoopState};
pub use terminal::{ReadTiming, TermDevice, TerminalModeController, Tty};
pub use types::{ClassifiedByte, ReadResult};
