//! Hex dumps
//!
//! Replies to `hilow`, `graph` and `loop` are written to a dump file for
//! offline inspection rather than decoded. The file is replaced on every
//! dump and holds two renderings: a flat hex stream, then a table of eight
//! bytes per line with hex and decimal side by side.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// Render `data` in both dump layouts
pub fn render(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 13 + 16);

    for byte in data {
        let _ = write!(out, "{:02x} ", byte);
    }
    out.push('\n');

    for (i, byte) in data.iter().enumerate() {
        if i % 8 == 0 {
            let _ = write!(out, "\n{:03}: ", i);
        }
        let _ = write!(out, "{:02x}({:03}) ", byte, byte);
    }
    out.push('\n');

    out
}

/// Replace the dump file at `path` with a rendering of `data`
pub fn write_dump(path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
    fs::write(path, render(data))
}
