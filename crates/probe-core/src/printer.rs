//! Hexadecimal diagnostic output
//!
//! Everything the probe reports goes through [`DiagnosticPrinter`] as plain
//! ASCII: uppercase hex, most significant byte first, no separators. The
//! output is meant for a human reading a serial terminal and is never parsed
//! back.

use embedded_io::Write;

use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Two uppercase hex digits for `value`.
#[inline]
pub const fn hex_byte(value: u8) -> [u8; 2] {
    [
        HEX_DIGITS[(value >> 4) as usize],
        HEX_DIGITS[(value & 0x0F) as usize],
    ]
}

/// Four uppercase hex digits for `value`, high byte first.
pub fn hex_u16(value: u16) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (chunk, byte) in out.chunks_exact_mut(2).zip(value.to_be_bytes()) {
        chunk.copy_from_slice(&hex_byte(byte));
    }
    out
}

/// Eight uppercase hex digits for `value`, high byte first.
pub fn hex_u32(value: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (chunk, byte) in out.chunks_exact_mut(2).zip(value.to_be_bytes()) {
        chunk.copy_from_slice(&hex_byte(byte));
    }
    out
}

/// Blocking formatter over a byte sink.
///
/// Holds no state besides the sink; every call writes straight through.
pub struct DiagnosticPrinter<W> {
    sink: W,
}

impl<W: Write> DiagnosticPrinter<W> {
    /// Wrap a byte sink.
    #[inline]
    pub const fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Borrow the sink.
    #[inline]
    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Borrow the sink mutably.
    #[inline]
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Return the sink.
    #[inline]
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Write one raw byte.
    pub fn put(&mut self, byte: u8) -> Result<()> {
        self.put_bytes(&[byte])
    }

    /// Write raw bytes.
    pub fn put_bytes(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            match self.sink.write(bytes) {
                Ok(0) | Err(_) => return Err(Error::Output),
                Ok(written) => bytes = &bytes[written..],
            }
        }
        Ok(())
    }

    /// Write a string up to its first NUL, if any.
    pub fn put_str(&mut self, text: &str) -> Result<()> {
        let bytes = text.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.put_bytes(&bytes[..end])
    }

    /// Write `value` as two hex digits.
    pub fn put_hex_byte(&mut self, value: u8) -> Result<()> {
        self.put_bytes(&hex_byte(value))
    }

    /// Write `value` as four hex digits.
    pub fn put_hex_16(&mut self, value: u16) -> Result<()> {
        self.put_bytes(&hex_u16(value))
    }

    /// Write `value` as eight hex digits.
    pub fn put_hex_32(&mut self, value: u32) -> Result<()> {
        self.put_bytes(&hex_u32(value))
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(|_| Error::Output)
    }
}

impl<W: Write> core::fmt::Write for DiagnosticPrinter<W> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.put_str(s).map_err(|_| core::fmt::Error)
    }
}
