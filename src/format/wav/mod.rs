//! WAV audio format support
//!
//! This module indexes 16-bit PCM RIFF/WAV files by splitting the data
//! chunk into artificial 20 ms frames, and builds the canonical 44-byte
//! header for re-emitting frame subsets.

pub mod header;
pub mod parser;

/// WAV format magic numbers
pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";
