//! Report formatting for classified bytes
//!
//! Output post-processing is off in raw mode, so every line carries its own
//! `\r\n`.

use std::io::{self, Write};

use crate::types::ClassifiedByte;

/// Render one report line.
///
/// Control bytes print as `"<code>\r\n"`, everything else as
/// `"<code> ('<char>')\r\n"` with the raw byte between the quotes.
pub fn report(byte: ClassifiedByte) -> Vec<u8> {
    let mut line = byte.code.to_string().into_bytes();
    if !byte.is_control {
        line.extend_from_slice(b" ('");
        line.push(byte.code);
        line.extend_from_slice(b"')");
    }
    line.extend_from_slice(b"\r\n");
    line
}

/// Write one report line and flush it
pub fn emit<W: Write>(out: &mut W, byte: ClassifiedByte) -> io::Result<()> {
    out.write_all(&report(byte))?;
    out.flush()
}
