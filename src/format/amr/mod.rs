//! AMR narrow-band speech format support
//!
//! Indexes raw AMR streams and AMR tracks inside 3GPP containers. Gains
//! come from the fixed-codebook gain quantizer indices in each speech
//! frame, run through the codec's gain predictor; no speech is decoded.

pub mod gains;
pub mod parser;

/// Magic line opening a raw AMR stream
pub const AMR_MAGIC: &[u8; 6] = b"#!AMR\n";

/// AMR always codes 8 kHz mono, 160 samples per 20 ms frame
/// (40 per subframe).
pub const SAMPLE_RATE: u32 = 8000;
pub const SAMPLES_PER_SUBFRAME: u32 = 40;
