// Blocking read helpers

use std::io::{ErrorKind, Read};

/// Read until `buf` is full or the reader reports end of input.
///
/// Returns the number of bytes placed in `buf`. Unlike `read_exact`, a short
/// count is not an error, so callers can tell "nothing left" from "cut off
/// halfway" and report each differently.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
