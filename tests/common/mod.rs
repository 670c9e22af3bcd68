//! Common test utilities for waveclip integration tests
//!
//! Builders for small synthetic audio files in each supported container,
//! written to named temp files so the extension-based dispatcher sees them.

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

/// Write bytes to a temp file whose name carries the given suffix.
pub fn write_temp(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// A minimal 16-bit PCM WAV file: 44-byte header plus the raw data chunk.
pub fn make_wav(sample_rate: u32, channels: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(44 + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2 * channels as u32).to_le_bytes());
    out.extend_from_slice(&(2 * channels).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// One AMR frame: the mode-in-header byte followed by the payload.
pub fn amr_frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push((frame_type << 3) | 0x04);
    frame.extend_from_slice(payload);
    frame
}

/// A raw AMR file: `#!AMR\n` magic plus the given frames.
pub fn make_amr(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"#!AMR\n");
    for frame in frames {
        out.extend_from_slice(frame);
    }
    out
}

/// The same frames wrapped in a 3GPP container: an ftyp box with the
/// 3gp4 brand followed by an mdat box.
pub fn make_3gpp(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&16u32.to_be_bytes());
    out.extend_from_slice(b"ftyp");
    out.extend_from_slice(b"3gp4");
    out.extend_from_slice(&[0; 4]);

    let frame_bytes: usize = frames.iter().map(|f| f.len()).sum();
    out.extend_from_slice(&(8 + frame_bytes as u32).to_be_bytes());
    out.extend_from_slice(b"mdat");
    for frame in frames {
        out.extend_from_slice(frame);
    }
    out
}

/// An M4A file built from the crate's own header builder plus the given
/// AAC frames appended as the mdat payload.
pub fn make_m4a(sample_rate: u32, channels: u16, frames: &[Vec<u8>]) -> Vec<u8> {
    let sizes: Vec<u32> = frames.iter().map(|f| f.len() as u32).collect();
    let mut out = waveclip::format::mp4::header::build_header(sample_rate, channels, &sizes, 64000);
    for frame in frames {
        out.extend_from_slice(frame);
    }
    out
}

/// A single-channel-element AAC frame whose global gain field holds the
/// given value, padded to `len` bytes.
pub fn sce_frame(gain: u8, len: usize) -> Vec<u8> {
    assert!(len >= 4);
    let mut frame = vec![0u8; len];
    frame[0] = (gain >> 7) & 0x01;
    frame[1] = (gain & 0x7f) << 1;
    frame
}
