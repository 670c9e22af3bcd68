//! Frame subset writer.
//!
//! Streams a contiguous run of indexed frames into a new playable file
//! of the same format, emitting a freshly built header and copying the
//! exact frame byte ranges from the source. Nothing is held in memory
//! beyond the header and the copy buffer.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::format::amr::AMR_MAGIC;
use crate::format::handle::{FileType, SoundHandle};
use crate::format::{mp4, wav};

/// Write frames `start..end` of `handle` into `dest` as a standalone
/// file. Out-of-range bounds are clamped to the frame table.
pub fn write_subset(
    handle: &SoundHandle,
    start: usize,
    end: usize,
    dest: &Path,
) -> Result<()> {
    let start = start.min(handle.frame_count());
    let end = end.clamp(start, handle.frame_count());

    let offsets = &handle.frame_offsets()[start..end];
    let lens = &handle.frame_lens()[start..end];

    let mut reader = BufReader::new(File::open(handle.source())?);
    let mut writer = BufWriter::new(File::create(dest)?);

    match handle.file_type() {
        FileType::Wav => {
            let audio_len: u64 = lens.iter().map(|&l| l as u64).sum();
            let header = wav::header::build_header(
                handle.sample_rate(),
                handle.channels(),
                audio_len as u32,
            );
            writer.write_all(&header)?;
        }
        FileType::Amr => {
            writer.write_all(AMR_MAGIC)?;
        }
        FileType::Mp4Aac => {
            // Subframe entries never occur for MP4, so the subset's
            // lengths map one to one onto the rebuilt sample tables.
            let header = mp4::header::build_header(
                handle.sample_rate(),
                handle.channels(),
                lens,
                handle.avg_bitrate_kbps() * 1000,
            );
            writer.write_all(&header)?;
        }
    }

    copy_frames(&mut reader, &mut writer, offsets, lens)?;
    writer.flush()?;

    debug!(
        frames = end - start,
        dest = %dest.display(),
        "wrote frame subset"
    );
    Ok(())
}

/// Copy each frame's byte range in order, seeking over gaps between
/// non-contiguous frames. Entries that share an offset with an already
/// written frame (AMR subframes) are skipped.
fn copy_frames<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
    offsets: &[u64],
    lens: &[u32],
) -> Result<()> {
    let mut pos: u64 = 0;
    for (&offset, &len) in offsets.iter().zip(lens) {
        if offset < pos {
            continue;
        }
        if offset > pos {
            reader.seek(SeekFrom::Start(offset))?;
            pos = offset;
        }
        let mut frame = (&mut *reader).take(len as u64);
        io::copy(&mut frame, writer)?;
        pos += len as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_copy_skips_gaps() {
        let source: Vec<u8> = (0u8..32).collect();
        let mut reader = Cursor::new(source);
        let mut out = Vec::new();
        copy_frames(&mut reader, &mut out, &[4, 12], &[2, 3]).unwrap();
        assert_eq!(out, vec![4, 5, 12, 13, 14]);
    }

    #[test]
    fn test_copy_dedups_shared_offsets() {
        let source: Vec<u8> = (0u8..32).collect();
        let mut reader = Cursor::new(source);
        let mut out = Vec::new();
        // Four entries share one physical frame, then the next frame.
        copy_frames(&mut reader, &mut out, &[6, 6, 6, 6, 9], &[3, 3, 3, 3, 2]).unwrap();
        assert_eq!(out, vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_copy_contiguous_needs_no_seek() {
        let source: Vec<u8> = (0u8..8).collect();
        let mut reader = Cursor::new(source);
        let mut out = Vec::new();
        copy_frames(&mut reader, &mut out, &[0, 4], &[4, 4]).unwrap();
        assert_eq!(out, (0u8..8).collect::<Vec<u8>>());
    }
}
