//! Bitstream reading utilities for compressed audio frames.
//!
//! # Bit Ordering
//!
//! BitReader uses MSB-first (big-endian) bit ordering, which is how both
//! AMR speech frames and AAC raw data blocks lay out their fields.

use crate::error::{Error, Result};

/// Bitstream reader over a byte slice.
///
/// Reads bits in MSB-first order. Maintains an internal position tracking
/// the current bit offset within the data.
pub struct BitReader<'a> {
    /// The underlying byte data
    data: &'a [u8],
    /// Current bit position (0-based from start of data)
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader from a byte slice.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0 }
    }

    /// Read a single bit from the stream.
    ///
    /// Returns `true` for 1, `false` for 0.
    ///
    /// # Errors
    /// Returns `Error::TruncatedFile` if no bits remain.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bit_pos >= self.data.len() * 8 {
            return Err(Error::truncated("bit read past end of frame"));
        }

        let byte_idx = self.bit_pos / 8;
        let bit_idx = 7 - (self.bit_pos % 8); // MSB first
        let bit = (self.data[byte_idx] >> bit_idx) & 1;
        self.bit_pos += 1;
        Ok(bit != 0)
    }

    /// Read multiple bits from the stream (up to 32 bits).
    ///
    /// Bits are returned in MSB-first order packed into a u32.
    ///
    /// # Errors
    /// Returns `Error::TruncatedFile` if insufficient bits remain.
    /// Returns `Error::BadFormat` if n > 32.
    #[inline]
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(Error::bad_format("cannot read more than 32 bits at once"));
        }

        if (n as usize) > self.remaining() {
            return Err(Error::truncated("bit read past end of frame"));
        }

        let mut result: u32 = 0;
        for _ in 0..n {
            result = (result << 1) | (self.read_bit()? as u32);
        }
        Ok(result)
    }

    /// Read a single bit at an absolute position without moving the cursor.
    ///
    /// AMR gain indices live at fixed, scattered bit offsets, so parsers
    /// address them directly instead of scanning.
    #[inline]
    pub fn bit_at(&self, pos: usize) -> Result<u32> {
        if pos >= self.data.len() * 8 {
            return Err(Error::truncated("bit read past end of frame"));
        }
        let byte_idx = pos / 8;
        let bit_idx = 7 - (pos % 8);
        Ok(((self.data[byte_idx] >> bit_idx) & 1) as u32)
    }

    /// Collect bits from the given absolute positions, MSB first.
    #[inline]
    pub fn bits_at(&self, positions: &[usize]) -> Result<u32> {
        let mut result: u32 = 0;
        for &pos in positions {
            result = (result << 1) | self.bit_at(pos)?;
        }
        Ok(result)
    }

    /// Skip n bits without reading them.
    ///
    /// If n exceeds remaining bits, position is set to end of stream.
    #[inline]
    pub fn skip_bits(&mut self, n: u32) {
        let total_bits = self.data.len() * 8;
        self.bit_pos = (self.bit_pos + n as usize).min(total_bits);
    }

    /// Get the current bit position (0-based).
    #[inline]
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Get the number of bits remaining in the stream.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }
}
