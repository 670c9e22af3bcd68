//! WAV frame indexer.
//!
//! Splits the data chunk into artificial 20 ms frames and takes the peak
//! of a sparse sample of each frame's high bytes as its gain, which is a
//! good enough contour for waveform display without touching most bytes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{DATA_CHUNK, FMT_CHUNK, RIFF_MAGIC, WAVE_MAGIC};
use crate::error::{Error, Result};
use crate::format::handle::{FileType, SoundHandle};
use crate::format::ProgressFn;

/// Files smaller than this cannot hold a preamble, an fmt chunk and any
/// audio worth indexing.
const MIN_FILE_SIZE: u64 = 128;

pub fn parse(path: &Path, progress: ProgressFn) -> Result<SoundHandle> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    if file_size < MIN_FILE_SIZE {
        return Err(Error::bad_format("file too small to parse"));
    }

    let mut reader = BufReader::new(file);

    let mut preamble = [0u8; 12];
    reader.read_exact(&mut preamble)?;
    if &preamble[0..4] != RIFF_MAGIC || &preamble[8..12] != WAVE_MAGIC {
        return Err(Error::unsupported("not a RIFF/WAVE file"));
    }

    let mut offset: u64 = 12;
    let mut channels: u16 = 0;
    let mut sample_rate: u32 = 0;
    let mut frame_offsets: Vec<u64> = Vec::new();
    let mut frame_lens: Vec<u32> = Vec::new();
    let mut frame_gains: Vec<i32> = Vec::new();

    while offset + 8 <= file_size {
        let mut chunk_id = [0u8; 4];
        reader.read_exact(&mut chunk_id)?;
        let chunk_len = reader.read_u32::<LittleEndian>()?;
        offset += 8;

        if &chunk_id == FMT_CHUNK {
            if !(16..=1024).contains(&chunk_len) {
                return Err(Error::bad_format("bad fmt chunk length"));
            }
            if chunk_len as u64 > file_size - offset {
                return Err(Error::truncated(format!(
                    "fmt chunk declares {} bytes, {} remain",
                    chunk_len,
                    file_size - offset
                )));
            }
            let mut fmt = vec![0u8; chunk_len as usize];
            reader.read_exact(&mut fmt)?;
            offset += chunk_len as u64;

            let format = u16::from_le_bytes([fmt[0], fmt[1]]);
            channels = u16::from_le_bytes([fmt[2], fmt[3]]);
            sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
            if format != 1 {
                return Err(Error::bad_format(format!(
                    "unsupported WAV encoding {} (only 16-bit PCM)",
                    format
                )));
            }
            debug!(channels, sample_rate, "parsed fmt chunk");
        } else if &chunk_id == DATA_CHUNK {
            if channels == 0 || sample_rate == 0 {
                return Err(Error::bad_format("data chunk before fmt chunk"));
            }
            if chunk_len as u64 > file_size - offset {
                return Err(Error::truncated(format!(
                    "data chunk declares {} bytes, {} remain",
                    chunk_len,
                    file_size - offset
                )));
            }

            let frame_samples = (sample_rate * channels as u32) / 50;
            let frame_bytes = frame_samples * 2;
            if frame_bytes == 0 {
                return Err(Error::bad_format("sample rate too low to frame"));
            }

            let mut one_frame = vec![0u8; frame_bytes as usize];
            let stride = 4 * channels as usize;
            let mut done: u32 = 0;
            while done < chunk_len {
                let this_frame = frame_bytes.min(chunk_len - done) as usize;
                reader.read_exact(&mut one_frame[..this_frame])?;

                let mut max_gain: i32 = 0;
                let mut j = 1;
                while j < this_frame {
                    let val = (one_frame[j] as i8 as i32).abs();
                    if val > max_gain {
                        max_gain = val;
                    }
                    j += stride;
                }

                frame_offsets.push(offset);
                frame_lens.push(this_frame as u32);
                frame_gains.push(max_gain);

                offset += this_frame as u64;
                done += this_frame as u32;

                if !progress(done as f64 / chunk_len as f64) {
                    break;
                }
            }
            break;
        } else {
            // Unknown chunk, skip its payload
            let skip = (chunk_len as u64).min(file_size - offset);
            std::io::copy(&mut (&mut reader).take(skip), &mut std::io::sink())?;
            offset += skip;
        }
    }

    debug!(frames = frame_offsets.len(), "indexed WAV file");
    Ok(SoundHandle {
        file_type: FileType::Wav,
        source: path.to_path_buf(),
        file_size,
        sample_rate,
        channels,
        samples_per_frame: sample_rate / 50,
        frame_offsets,
        frame_lens,
        frame_gains,
        nominal_bitrate_kbps: None,
    })
}
