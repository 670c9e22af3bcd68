//! AMR frame indexer for raw `#!AMR` streams and 3GPP containers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use tracing::{debug, warn};

use super::gains::{nominal_bitrate_kbps, GainPredictor, BLOCK_SIZES};
use super::{AMR_MAGIC, SAMPLES_PER_SUBFRAME, SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::format::handle::{FileType, SoundHandle};
use crate::format::ProgressFn;
use crate::util::BitReader;

const MIN_FILE_SIZE: u64 = 128;
const MDAT_BOX: &[u8; 4] = b"mdat";

/// MR515 joint gain index bit positions per subframe, most significant
/// bit first. The three index MSBs sit in per-subframe clusters after the
/// LSF bits; the low bits interleave across subframes.
fn mr515_gain_positions(subframe: usize) -> [usize; 6] {
    [
        55 + subframe,
        45 + subframe,
        36 + subframe,
        26 + 3 * subframe,
        25 + 3 * subframe,
        24 + 3 * subframe,
    ]
}

/// MR122 per-subframe field offsets in parameter order: 38 LSF bits, then
/// for each subframe the adaptive lag (9 or 6 bits), 4-bit pitch gain,
/// 35 pulse bits and 5-bit code gain.
const MR122_PITCH_GAIN_POS: [u32; 4] = [47, 97, 150, 200];
const MR122_PULSES_POS: [u32; 4] = [51, 101, 154, 204];
const MR122_CODE_GAIN_POS: [u32; 4] = [86, 136, 189, 239];

/// MR475 8-bit joint gain indices, one per subframe pair, after each
/// half-frame's lag and pulse fields.
const MR475_GAIN_POS: [u32; 2] = [53, 87];

pub fn parse(path: &Path, progress: ProgressFn) -> Result<SoundHandle> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    if file_size < MIN_FILE_SIZE {
        return Err(Error::bad_format("file too small to parse"));
    }

    let mut reader = BufReader::new(file);
    let mut indexer = AmrIndexer::default();

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    indexer.offset = 6;

    if &magic == AMR_MAGIC {
        indexer.parse_frames(&mut reader, file_size - 6, progress)?;
    } else {
        let mut rest = [0u8; 6];
        reader.read_exact(&mut rest)?;
        let mut header = [0u8; 12];
        header[..6].copy_from_slice(&magic);
        header[6..].copy_from_slice(&rest);
        indexer.offset = 12;

        if &header[4..8] != b"ftyp" || &header[8..12] != b"3gp4" {
            return Err(Error::unsupported("not an AMR or 3GPP file"));
        }

        let box_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        if box_len >= 12 && box_len <= file_size - 8 {
            indexer.skip(&mut reader, box_len - 12)?;
        }
        indexer.walk_3gpp(&mut reader, file_size.saturating_sub(box_len), progress)?;
    }

    debug!(
        frames = indexer.offsets.len(),
        "indexed AMR file"
    );
    Ok(indexer.into_handle(path, file_size))
}

#[derive(Default)]
struct AmrIndexer {
    offsets: Vec<u64>,
    lens: Vec<u32>,
    gains: Vec<i32>,
    predictor: GainPredictor,
    type_counts: [u32; 16],
    offset: u64,
}

impl AmrIndexer {
    fn skip<R: Read>(&mut self, reader: &mut R, n: u64) -> Result<()> {
        std::io::copy(&mut reader.take(n), &mut std::io::sink())?;
        self.offset += n;
        Ok(())
    }

    /// Descend through 3GPP boxes until the mdat payload is reached.
    fn walk_3gpp<R: Read>(
        &mut self,
        reader: &mut R,
        max_len: u64,
        progress: ProgressFn,
    ) -> Result<()> {
        if max_len < 8 {
            return Ok(());
        }

        let box_len = reader.read_u32::<BigEndian>()? as u64;
        let mut fourcc = [0u8; 4];
        reader.read_exact(&mut fourcc)?;
        self.offset += 8;

        if box_len > max_len {
            return Err(Error::bad_format(format!(
                "3GPP box '{}' declares {} bytes, {} remain",
                String::from_utf8_lossy(&fourcc),
                box_len,
                max_len
            )));
        }

        if &fourcc == MDAT_BOX {
            return self.parse_frames(reader, box_len.saturating_sub(8), progress);
        }

        self.walk_3gpp(reader, box_len, progress)
    }

    fn parse_frames<R: Read>(
        &mut self,
        reader: &mut R,
        max_len: u64,
        progress: ProgressFn,
    ) -> Result<()> {
        let total = max_len;
        let mut remaining = max_len;
        while remaining > 0 {
            let consumed = self.parse_frame(reader, remaining)?;
            remaining -= consumed;

            if !progress((total - remaining) as f64 / total as f64) {
                break;
            }
        }
        Ok(())
    }

    /// Parse one frame, returning the bytes consumed from the stream.
    fn parse_frame<R: Read>(&mut self, reader: &mut R, remaining: u64) -> Result<u64> {
        let frame_offset = self.offset;
        let header = reader.read_u8()?;
        self.offset += 1;

        let frame_type = ((header >> 3) & 0x0f) as usize;
        let block_size = BLOCK_SIZES[frame_type];

        if (block_size + 1) as u64 > remaining {
            // A trimmed tail; report the rest consumed to end the loop.
            return Ok(remaining);
        }
        if block_size == 0 {
            return Ok(1);
        }

        let mut payload = vec![0u8; block_size];
        reader.read_exact(&mut payload)?;
        self.offset += block_size as u64;

        let frame_len = (block_size + 1) as u32;

        match frame_type {
            0 => {
                for &pos in &MR475_GAIN_POS {
                    let joint = field(&payload, pos, 8)?;
                    for gain in self.predictor.estimate_mr475(joint) {
                        self.add_frame(frame_offset, frame_len, gain);
                    }
                }
            }
            1 => {
                let bits = BitReader::new(&payload);
                for subframe in 0..4 {
                    let index = bits.bits_at(&mr515_gain_positions(subframe))?;
                    let gain = self.predictor.estimate_mr515(index);
                    self.add_frame(frame_offset, frame_len, gain);
                }
            }
            7 => {
                for subframe in 0..4 {
                    let pitch_index = field(&payload, MR122_PITCH_GAIN_POS[subframe], 4)?;
                    let code_index = field(&payload, MR122_CODE_GAIN_POS[subframe], 5)?;
                    let energy = pulse_energy(&payload, MR122_PULSES_POS[subframe])?;
                    let gain = self
                        .predictor
                        .estimate_mr122(pitch_index, code_index, energy);
                    self.add_frame(frame_offset, frame_len, gain);
                }
            }
            other => {
                warn!(frame_type = other, "unsupported AMR frame type, copying previous gain");
                let gain = self.gains.last().copied().unwrap_or(0);
                self.add_frame(frame_offset, frame_len, gain);
            }
        }
        self.type_counts[frame_type] += 1;

        Ok((block_size + 1) as u64)
    }

    fn add_frame(&mut self, offset: u64, len: u32, gain: i32) {
        self.offsets.push(offset);
        self.lens.push(len);
        self.gains.push(gain);
    }

    fn into_handle(self, path: &Path, file_size: u64) -> SoundHandle {
        let dominant = self
            .type_counts
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .filter(|(_, &count)| count > 0)
            .map(|(frame_type, _)| frame_type);
        let kbps = dominant.and_then(nominal_bitrate_kbps).unwrap_or(10);

        SoundHandle {
            file_type: FileType::Amr,
            source: path.to_path_buf(),
            file_size,
            sample_rate: SAMPLE_RATE,
            channels: 1,
            samples_per_frame: SAMPLES_PER_SUBFRAME,
            frame_offsets: self.offsets,
            frame_lens: self.lens,
            frame_gains: self.gains,
            nominal_bitrate_kbps: Some(kbps),
        }
    }
}

/// Read `len` consecutive bits starting at absolute bit `start`.
fn field(payload: &[u8], start: u32, len: u8) -> Result<u32> {
    let mut reader = BitReader::new(payload);
    reader.skip_bits(start);
    reader.read_bits(len)
}

/// Reconstruct the innovation energy of an MR122 pulse field: five
/// tracks of two pulses each, 3-bit positions and a shared sign bit per
/// track. Two pulses on the same position add coherently.
fn pulse_energy(payload: &[u8], pulses_start: u32) -> Result<i32> {
    let mut energy = 0;
    for track in 0..5 {
        let mut reader = BitReader::new(payload);
        reader.skip_bits(pulses_start + track * 7);
        let pos1 = reader.read_bits(3)?;
        let pos2 = reader.read_bits(3)?;
        energy += if pos1 == pos2 { 4 } else { 2 };
    }
    Ok(energy)
}
