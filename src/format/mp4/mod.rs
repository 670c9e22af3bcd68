//! MP4/AAC (M4A) container format support
//!
//! Indexes AAC frames inside MP4 containers via the sample tables, peeks
//! each frame's first raw-data-block element for a gain estimate, and
//! rebuilds complete M4A headers for re-emitting frame subsets.

pub mod atom;
pub mod header;
pub mod parser;

pub use atom::Atom;

/// Atoms whose payload is buffered during the walk.
pub const SAVE_DATA_ATOMS: [&[u8; 4]; 7] = [
    b"dinf", b"hdlr", b"mdhd", b"mvhd", b"smhd", b"tkhd", b"stsd",
];

/// Atoms recursed into as containers.
pub const CONTAINER_ATOMS: [&[u8; 4]; 5] = [b"moov", b"trak", b"mdia", b"minf", b"stbl"];

/// Atoms a playable M4A must carry.
pub const REQUIRED_ATOMS: [&[u8; 4]; 14] = [
    b"dinf", b"hdlr", b"mdhd", b"mdia", b"minf", b"moov", b"mvhd", b"smhd", b"stbl", b"stsd",
    b"stsz", b"stts", b"tkhd", b"trak",
];

/// AAC-LC sampling frequency index table (ISO/IEC 14496-3).
pub const SAMPLING_FREQUENCIES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];
