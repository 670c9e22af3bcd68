//! Container format handling: frame indexing, header building, subset writing.
//!
//! Each supported container gets its own module with a parser that walks
//! the file once, indexing frame byte ranges and estimating per-frame
//! gains without decoding audio.

pub mod amr;
pub mod handle;
pub mod mp4;
pub mod wav;
pub mod writer;

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
pub use handle::{FileType, SoundHandle};

/// Parse-progress callback. Receives a fraction in [0.0, 1.0]; returning
/// `false` stops the parse loop, leaving the handle with the frames
/// indexed so far.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64) -> bool;

/// File extensions the dispatcher recognizes.
///
/// `mp3` is recognized but has no parser and always fails with
/// `UnsupportedFormat`.
pub fn supported_extensions() -> &'static [&'static str] {
    &["wav", "3gpp", "3gp", "amr", "aac", "m4a"]
}

/// Open an audio file and index its frames.
pub fn open<P: AsRef<Path>>(path: P) -> Result<SoundHandle> {
    open_with_progress(path, |_| true)
}

/// Open an audio file, reporting parse progress through `progress`.
pub fn open_with_progress<P, F>(path: P, mut progress: F) -> Result<SoundHandle>
where
    P: AsRef<Path>,
    F: FnMut(f64) -> bool,
{
    let path = path.as_ref();
    let ext = extension_of(path);
    debug!(path = %path.display(), extension = ext.as_deref().unwrap_or(""), "dispatching parser");

    match ext.as_deref() {
        Some("wav") => wav::parser::parse(path, &mut progress),
        Some("3gpp") | Some("3gp") | Some("amr") => amr::parser::parse(path, &mut progress),
        Some("aac") | Some("m4a") => mp4::parser::parse(path, &mut progress),
        Some("mp3") => Err(Error::unsupported("mp3 files cannot be indexed")),
        Some(other) => Err(Error::unsupported(format!(
            "unrecognized file extension: {}",
            other
        ))),
        None => Err(Error::unsupported("file has no extension")),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
