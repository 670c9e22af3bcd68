//! MP4/AAC frame indexer.
//!
//! Walks the atom tree for the sample tables, then scans the mdat region
//! peeking the first raw-data-block element of each AAC frame for its
//! global gain. The global gain field is the frame's loudness anchor, so
//! it ranks frames well without any spectral decoding.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use tracing::{debug, warn};

use super::{CONTAINER_ATOMS, REQUIRED_ATOMS, SAVE_DATA_ATOMS};
use crate::error::{Error, Result};
use crate::format::handle::{FileType, SoundHandle};
use crate::format::ProgressFn;
use crate::util::{BitReader, ByteCursor};

const MIN_FILE_SIZE: u64 = 128;

pub fn parse(path: &Path, progress: ProgressFn) -> Result<SoundHandle> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    if file_size < MIN_FILE_SIZE {
        return Err(Error::bad_format("file too small to parse"));
    }

    let mut reader = BufReader::new(file);
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    if header[0] != 0 || &header[4..8] != b"ftyp" {
        return Err(Error::unsupported("no ftyp atom at start of file"));
    }
    reader.seek(SeekFrom::Start(0))?;

    let mut indexer = Mp4Indexer::default();
    indexer.walk(&mut reader, file_size)?;

    let missing: Vec<&str> = REQUIRED_ATOMS
        .iter()
        .filter(|fourcc| !indexer.atoms.contains_key(&***fourcc))
        .map(|fourcc| std::str::from_utf8(&fourcc[..]).unwrap_or("????"))
        .collect();
    if !missing.is_empty() {
        return Err(Error::missing_atom(missing.join(", ")));
    }
    let (mdat_offset, mdat_len) = indexer
        .mdat
        .ok_or_else(|| Error::missing_atom("mdat"))?;

    debug!(
        frames = indexer.frame_lens.len(),
        sample_rate = indexer.sample_rate,
        channels = indexer.channels,
        samples_per_frame = indexer.samples_per_frame,
        "parsed MP4 sample tables"
    );

    let frame_lens = indexer.frame_lens;
    let mut frame_offsets = Vec::with_capacity(frame_lens.len());
    let mut next = mdat_offset;
    for &len in &frame_lens {
        frame_offsets.push(next);
        next += len as u64;
    }

    reader.seek(SeekFrom::Start(mdat_offset))?;
    let frame_gains = scan_mdat(
        &mut reader,
        &frame_lens,
        &frame_offsets,
        mdat_len,
        file_size,
        progress,
    )?;

    Ok(SoundHandle {
        file_type: FileType::Mp4Aac,
        source: path.to_path_buf(),
        file_size,
        sample_rate: indexer.sample_rate,
        channels: indexer.channels,
        samples_per_frame: indexer.samples_per_frame,
        frame_offsets,
        frame_lens,
        frame_gains,
        nominal_bitrate_kbps: None,
    })
}

#[derive(Default)]
struct Mp4Indexer {
    offset: u64,
    atoms: HashMap<[u8; 4], (u64, u64)>,
    frame_lens: Vec<u32>,
    samples_per_frame: u32,
    sample_rate: u32,
    channels: u16,
    mdat: Option<(u64, u64)>,
}

impl Mp4Indexer {
    /// Walk one level of the atom tree. `max_len` includes the enclosing
    /// atom's own header, matching how the recursion is entered.
    fn walk(&mut self, reader: &mut BufReader<File>, mut max_len: u64) -> Result<()> {
        while max_len > 8 {
            let initial_offset = self.offset;

            let declared_len = reader.read_u32::<BigEndian>()? as u64;
            let mut fourcc = [0u8; 4];
            reader.read_exact(&mut fourcc)?;
            self.offset += 8;

            let atom_len = if declared_len > max_len {
                warn!(
                    atom = %String::from_utf8_lossy(&fourcc),
                    declared_len,
                    max_len,
                    "atom length exceeds enclosing region, clamping"
                );
                max_len
            } else {
                declared_len
            };
            self.atoms.insert(fourcc, (initial_offset, atom_len));

            if CONTAINER_ATOMS.iter().any(|c| **c == fourcc) {
                self.walk(reader, atom_len)?;
            } else if &fourcc == b"stsz" {
                self.parse_stsz(reader, atom_len.saturating_sub(8))?;
            } else if &fourcc == b"stts" {
                self.parse_stts(reader, atom_len.saturating_sub(8))?;
            } else if &fourcc == b"mdat" {
                self.mdat = Some((self.offset, atom_len.saturating_sub(8)));
            } else if SAVE_DATA_ATOMS.iter().any(|c| **c == fourcc) {
                let payload = self.read_payload(reader, atom_len.saturating_sub(8))?;
                if &fourcc == b"stsd" {
                    self.parse_stsd(&payload)?;
                }
            }

            max_len -= atom_len;
            let consumed = self.offset - initial_offset;
            if consumed > atom_len {
                return Err(Error::truncated(format!(
                    "atom '{}' overran its declared length by {} bytes",
                    String::from_utf8_lossy(&fourcc),
                    consumed - atom_len
                )));
            }
            let skip = atom_len - consumed;
            reader.seek_relative(skip as i64)?;
            self.offset += skip;
        }
        Ok(())
    }

    fn read_payload(&mut self, reader: &mut BufReader<File>, len: u64) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload)?;
        self.offset += len;
        Ok(payload)
    }

    /// Sample sizes: per-frame byte lengths and the frame count.
    fn parse_stsz(&mut self, reader: &mut BufReader<File>, len: u64) -> Result<()> {
        let payload = self.read_payload(reader, len)?;
        let mut cursor = ByteCursor::new(&payload);
        cursor.skip(4)?; // version + flags
        cursor.skip(4)?; // fixed sample size, zero for audio
        let num_frames = cursor.read_u32_be()? as usize;

        // A hostile count cannot reserve more than the payload can hold;
        // the reads below still fail if the table is short.
        self.frame_lens = Vec::with_capacity(num_frames.min(cursor.remaining() / 4));
        for _ in 0..num_frames {
            self.frame_lens.push(cursor.read_u32_be()?);
        }
        Ok(())
    }

    /// Time-to-sample: the delta of the last entry is the samples per
    /// frame. Single-entry tables and tables led by a zero-length
    /// placeholder frame both resolve to the audio frame length.
    fn parse_stts(&mut self, reader: &mut BufReader<File>, len: u64) -> Result<()> {
        let payload = self.read_payload(reader, len)?;
        let mut cursor = ByteCursor::new(&payload);
        cursor.skip(4)?; // version + flags
        let entry_count = cursor.read_u32_be()?;
        for _ in 0..entry_count {
            cursor.skip(4)?; // sample count
            self.samples_per_frame = cursor.read_u32_be()?;
        }
        Ok(())
    }

    /// The mp4a sample entry inside stsd carries the channel count and
    /// sample rate at fixed payload offsets.
    fn parse_stsd(&mut self, payload: &[u8]) -> Result<()> {
        let mut cursor = ByteCursor::new(payload);
        cursor.seek(32)?;
        self.channels = cursor.read_u16_be()?;
        cursor.seek(40)?;
        self.sample_rate = cursor.read_u16_be()? as u32;
        Ok(())
    }
}

/// Scan the mdat region, estimating one gain per frame.
fn scan_mdat<R: Read + Seek>(
    reader: &mut R,
    frame_lens: &[u32],
    frame_offsets: &[u64],
    mdat_len: u64,
    file_size: u64,
    progress: ProgressFn,
) -> Result<Vec<i32>> {
    let mut gains = vec![0i32; frame_lens.len()];
    let mdat_offset = frame_offsets.first().copied().unwrap_or(0);

    for i in 0..frame_lens.len() {
        let len = frame_lens[i] as u64;
        let in_mdat = frame_offsets[i] - mdat_offset;

        if in_mdat + len > mdat_len {
            // Frame table runs past the mdat payload; leave the gain 0.
        } else {
            gains[i] = frame_gain(reader, frame_lens[i], if i > 0 { gains[i - 1] } else { 0 })?;
        }

        if !progress((frame_offsets[i] + len) as f64 / file_size as f64) {
            break;
        }
    }
    Ok(gains)
}

/// Read the start of one AAC frame and extract the first element's
/// global gain, then skip the rest of the frame.
fn frame_gain<R: Read + Seek>(reader: &mut R, frame_len: u32, prev_gain: i32) -> Result<i32> {
    let frame_len = frame_len as usize;
    if frame_len < 4 {
        reader.seek(SeekFrom::Current(frame_len as i64))?;
        return Ok(0);
    }

    let mut data = vec![0u8; 4];
    reader.read_exact(&mut data)?;
    let mut consumed = 4usize;

    let id_syn_ele = (0xe0 & data[0]) >> 5;
    let gain = match id_syn_ele {
        // ID_SCE: mono. The 8-bit global gain straddles the first two
        // bytes after the 3-bit element id and 4-bit instance tag.
        0 => (((0x01 & data[0] as i32) << 7) | ((0xfe & data[1] as i32) >> 1)),
        // ID_CPE: stereo. Locate the first channel's global gain behind
        // the ics_info and optional ms mask.
        1 => {
            let window_sequence = (0x60 & data[1]) >> 5;

            let (max_sfb, scale_factor_grouping, mask_present, mut start_bit) =
                if window_sequence == 2 {
                    // EIGHT_SHORT_SEQUENCE
                    (
                        (0x0f & data[1]) as u32,
                        ((0xfe & data[2]) >> 1) as u32,
                        ((0x01 & data[2]) << 1) | ((0x80 & data[3]) >> 7),
                        25u32,
                    )
                } else {
                    // Long windows have no grouping field; all-ones keeps
                    // the window group count at one below.
                    (
                        (((0x0f & data[1]) as u32) << 2) | (((0xc0 & data[2]) as u32) >> 6),
                        0x7fu32,
                        (0x18 & data[2]) >> 3,
                        21u32,
                    )
                };

            if mask_present == 1 {
                // One ms_used bit per scale factor band and window group.
                let zero_bits = (0..7)
                    .filter(|b| scale_factor_grouping & (1 << b) == 0)
                    .count() as u32;
                let num_window_groups = 1 + zero_bits;
                start_bit += max_sfb * num_window_groups;
            }

            let bytes_needed = 1 + ((start_bit as usize + 7) / 8);
            if bytes_needed > frame_len {
                prev_gain
            } else {
                data.resize(bytes_needed, 0);
                reader.read_exact(&mut data[4..])?;
                consumed = bytes_needed;

                let mut bits = BitReader::new(&data);
                bits.skip_bits(start_bit);
                bits.read_bits(8)? as i32
            }
        }
        _ => prev_gain,
    };

    reader.seek(SeekFrom::Current((frame_len - consumed) as i64))?;
    Ok(gain)
}
