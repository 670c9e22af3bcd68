//! waveclip - cheap audio container scanning and clip extraction
//!
//! waveclip indexes the frames of an audio file without decoding any audio,
//! estimates a per-frame loudness gain from the compressed bitstream, builds
//! a multi-resolution waveform for display, and can re-emit any contiguous
//! run of frames as a new playable file of the same format.
//!
//! # Architecture
//!
//! - `format`: container parsing, header building and subset writing
//! - `waveform`: display pyramid built from frame gains
//! - `util`: bit and byte extraction helpers
//!
//! # Example
//!
//! ```no_run
//! use waveclip::{open, WaveformPyramid};
//!
//! let handle = open("voicemail.m4a")?;
//! let pyramid = WaveformPyramid::build(&handle);
//! println!("{} frames, {:.1}s", handle.frame_count(), handle.duration_seconds());
//! # Ok::<(), waveclip::Error>(())
//! ```

pub mod error;
pub mod format;
pub mod util;
pub mod waveform;

pub use error::{Error, Result};
pub use format::handle::{FileType, SoundHandle};
pub use format::writer::write_subset;
pub use format::{open, open_with_progress, supported_extensions};
pub use waveform::WaveformPyramid;

/// waveclip version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Configuration for the waveclip library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the waveclip library with the given configuration
pub fn init(config: Config) -> Result<()> {
    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt().with_env_filter(level).init();
    }

    Ok(())
}
