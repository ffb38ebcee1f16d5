//! Helpers shared by the tools for dealing with a finished descriptor area image.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crc::{crc16, Hasher16};

/// CRC16 (X25) over the image, so two builds can be compared at a glance.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut digest = crc16::Digest::new(crc16::X25);
    digest.write(bytes);
    digest.sum16()
}

pub fn read_image<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let mut bytes = vec![];
    let mut f = File::open(path)?;
    f.read_to_end(&mut bytes)?;
    Ok(bytes)
}

pub fn write_image<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.flush()
}

/// Sixteen bytes to a line, each line prefixed with its load address.
pub struct HexDump<'a> {
    pub base: u16,
    pub bytes: &'a [u8],
}

impl<'a> fmt::Display for HexDump<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, chunk) in self.bytes.chunks(16).enumerate() {
            write!(f, "{:04x}:", self.base as usize + line * 16)?;
            for byte in chunk {
                write!(f, " {:02x}", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x25_check_value() {
        // Standard check input for CRC-16/X-25.
        assert_eq!(checksum(b"123456789"), 0x906E);
    }

    #[test]
    fn dump_lines_carry_addresses() {
        let bytes: Vec<u8> = (0..18).collect();
        let dump = HexDump { base: 0x3E00, bytes: &bytes }.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("3e00: 00 01 02"));
        assert_eq!(lines[1], "3e10: 10 11");
    }
}
