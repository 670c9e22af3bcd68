//! Multi-resolution waveform rendering data.
//!
//! Turns a handle's per-frame gain table into normalized display
//! heights at five zoom levels, the way an editor draws a clip
//! overview and lets the user zoom in on a region.

mod pyramid;

pub use pyramid::{WaveformPyramid, NUM_LEVELS};
