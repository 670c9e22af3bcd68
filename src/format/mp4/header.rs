//! M4A header builder.
//!
//! Rebuilds the complete atom tree for an AAC-LC stream from scratch, so
//! a frame subset can be written out as a standalone playable file. The
//! stream convention is that the first frame is a two-byte placeholder
//! carrying no audio; every later frame covers 1024 samples.

use std::time::{SystemTime, UNIX_EPOCH};

use super::{Atom, SAMPLING_FREQUENCIES};

/// Seconds between the 1904 atom epoch and the Unix epoch.
const EPOCH_OFFSET_SECS: u64 = (66 * 365 + 16) * 24 * 60 * 60;

/// Samples per AAC frame per channel.
const SAMPLES_PER_FRAME: u32 = 1024;

/// Build the complete M4A header (ftyp + moov + mdat header) for a
/// stream with the given per-frame byte sizes. The AAC frame data must
/// follow the returned bytes immediately; the stco chunk offset already
/// points there.
pub fn build_header(
    sample_rate: u32,
    channels: u16,
    frame_sizes: &[u32],
    bitrate_bps: u32,
) -> Vec<u8> {
    let builder = HeaderBuilder::new(sample_rate, channels, frame_sizes, bitrate_bps);
    builder.build()
}

struct HeaderBuilder<'a> {
    sample_rate: u32,
    channels: u16,
    frame_sizes: &'a [u32],
    bitrate_bps: u32,
    max_frame_size: u32,
    total_size: u64,
    time: u32,
    duration_ms: u32,
    num_samples: u32,
}

impl<'a> HeaderBuilder<'a> {
    fn new(sample_rate: u32, channels: u16, frame_sizes: &'a [u32], bitrate_bps: u32) -> Self {
        let max_frame_size = frame_sizes.iter().copied().max().unwrap_or(0);
        let total_size = frame_sizes.iter().map(|&s| s as u64).sum();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let time = (now + EPOCH_OFFSET_SECS) as u32;

        // The first frame carries no audio.
        let audio_frames = frame_sizes.len().saturating_sub(1) as u32;
        let num_samples = SAMPLES_PER_FRAME * audio_frames;
        let rate = sample_rate.max(1) as u64;
        let duration_ms = ((num_samples as u64 * 1000).div_ceil(rate)) as u32;

        HeaderBuilder {
            sample_rate,
            channels,
            frame_sizes,
            bitrate_bps,
            max_frame_size,
            total_size,
            time,
            duration_ms,
            num_samples,
        }
    }

    fn build(&self) -> Vec<u8> {
        let ftyp = self.ftyp();
        let mut moov = self.moov();
        let mdat_header = 8u32;

        // The header is exactly the stream's chunk offset: the AAC frames
        // start right after the empty mdat header.
        let chunk_offset = ftyp.size() + moov.size() + mdat_header;
        if let Some(stco) = moov.child_mut("trak.mdia.minf.stbl.stco") {
            let data = stco.data_mut();
            let patch = data.len() - 4;
            data[patch..].copy_from_slice(&chunk_offset.to_be_bytes());
        }

        let mut header = Vec::with_capacity(chunk_offset as usize);
        header.extend_from_slice(&ftyp.to_bytes());
        header.extend_from_slice(&moov.to_bytes());
        let mdat_size = (8 + self.total_size) as u32;
        header.extend_from_slice(&mdat_size.to_be_bytes());
        header.extend_from_slice(b"mdat");
        header
    }

    fn ftyp(&self) -> Atom {
        Atom::new(b"ftyp").with_data(
            [
                *b"M4A ",             // major brand
                [0, 0, 0, 0],         // minor version
                *b"M4A ",             // compatible brands
                *b"mp42",
                *b"isom",
            ]
            .concat(),
        )
    }

    fn moov(&self) -> Atom {
        Atom::new(b"moov")
            .with_child(self.mvhd())
            .with_child(self.trak())
    }

    fn mvhd(&self) -> Atom {
        let mut data = Vec::with_capacity(96);
        data.extend_from_slice(&self.time.to_be_bytes()); // creation time
        data.extend_from_slice(&self.time.to_be_bytes()); // modification time
        data.extend_from_slice(&1000u32.to_be_bytes()); // timescale: duration in ms
        data.extend_from_slice(&self.duration_ms.to_be_bytes());
        data.extend_from_slice(&[0, 1, 0, 0]); // rate = 1.0
        data.extend_from_slice(&[1, 0]); // volume = 1.0
        data.extend_from_slice(&[0; 10]); // reserved
        data.extend_from_slice(&UNITY_MATRIX);
        data.extend_from_slice(&[0; 24]); // pre-defined
        data.extend_from_slice(&2u32.to_be_bytes()); // next track ID
        Atom::full(b"mvhd", 0, 0).with_data(data)
    }

    fn trak(&self) -> Atom {
        Atom::new(b"trak")
            .with_child(self.tkhd())
            .with_child(self.mdia())
    }

    fn tkhd(&self) -> Atom {
        let mut data = Vec::with_capacity(80);
        data.extend_from_slice(&self.time.to_be_bytes()); // creation time
        data.extend_from_slice(&self.time.to_be_bytes()); // modification time
        data.extend_from_slice(&1u32.to_be_bytes()); // track ID
        data.extend_from_slice(&[0; 4]); // reserved
        data.extend_from_slice(&self.duration_ms.to_be_bytes());
        data.extend_from_slice(&[0; 8]); // reserved
        data.extend_from_slice(&[0, 0]); // layer
        data.extend_from_slice(&[0, 0]); // alternate group
        data.extend_from_slice(&[1, 0]); // volume = 1.0
        data.extend_from_slice(&[0, 0]); // reserved
        data.extend_from_slice(&UNITY_MATRIX);
        data.extend_from_slice(&[0; 8]); // width, height
        // flags: track enabled, in movie, and in preview.
        Atom::full(b"tkhd", 0, 0x07).with_data(data)
    }

    fn mdia(&self) -> Atom {
        Atom::new(b"mdia")
            .with_child(self.mdhd())
            .with_child(self.hdlr())
            .with_child(self.minf())
    }

    fn mdhd(&self) -> Atom {
        let mut data = Vec::with_capacity(20);
        data.extend_from_slice(&self.time.to_be_bytes()); // creation time
        data.extend_from_slice(&self.time.to_be_bytes()); // modification time
        // timescale is the sample rate, so the duration is in samples.
        data.extend_from_slice(&self.sample_rate.to_be_bytes());
        data.extend_from_slice(&self.num_samples.to_be_bytes());
        data.extend_from_slice(&[0, 0]); // language
        data.extend_from_slice(&[0, 0]); // pre-defined
        Atom::full(b"mdhd", 0, 0).with_data(data)
    }

    fn hdlr(&self) -> Atom {
        let mut data = Vec::with_capacity(32);
        data.extend_from_slice(&[0; 4]); // pre-defined
        data.extend_from_slice(b"soun"); // handler type
        data.extend_from_slice(&[0; 12]); // reserved
        data.extend_from_slice(b"SoundHandle\0"); // name, for inspection only
        Atom::full(b"hdlr", 0, 0).with_data(data)
    }

    fn minf(&self) -> Atom {
        Atom::new(b"minf")
            .with_child(self.smhd())
            .with_child(self.dinf())
            .with_child(self.stbl())
    }

    fn smhd(&self) -> Atom {
        // balance (center) + reserved
        Atom::full(b"smhd", 0, 0).with_data(vec![0, 0, 0, 0])
    }

    fn dinf(&self) -> Atom {
        // flags 0x01: data is self contained.
        let url = Atom::full(b"url ", 0, 0x01);
        let mut data = vec![0, 0, 0, 1]; // entry count
        data.extend_from_slice(&url.to_bytes());
        let dref = Atom::full(b"dref", 0, 0).with_data(data);
        Atom::new(b"dinf").with_child(dref)
    }

    fn stbl(&self) -> Atom {
        Atom::new(b"stbl")
            .with_child(self.stsd())
            .with_child(self.stts())
            .with_child(self.stsc())
            .with_child(self.stsz())
            .with_child(self.stco())
    }

    fn stsd(&self) -> Atom {
        let mut data = vec![0, 0, 0, 1]; // entry count
        data.extend_from_slice(&self.mp4a().to_bytes());
        Atom::full(b"stsd", 0, 0).with_data(data)
    }

    // See Part 14 section 5.6.1 of ISO/IEC 14496 for this atom.
    fn mp4a(&self) -> Atom {
        let mut data = Vec::with_capacity(28);
        data.extend_from_slice(&[0; 6]); // reserved
        data.extend_from_slice(&[0, 1]); // data reference index
        data.extend_from_slice(&[0; 8]); // reserved
        data.extend_from_slice(&self.channels.to_be_bytes());
        data.extend_from_slice(&[0, 0x10]); // sample size
        data.extend_from_slice(&[0; 4]); // pre-defined, reserved
        data.extend_from_slice(&(self.sample_rate as u16).to_be_bytes());
        data.extend_from_slice(&[0, 0]); // sample rate fraction
        data.extend_from_slice(&self.esds().to_bytes());
        Atom::new(b"mp4a").with_data(data)
    }

    fn esds(&self) -> Atom {
        Atom::full(b"esds", 0, 0).with_data(self.es_descriptor())
    }

    /// ES Descriptor for an ISO/IEC 14496-3 AAC-LC stream. The decoder
    /// buffer size is grown until it can hold at least two frames
    /// (section 7.2.6.5 of ISO/IEC 14496-1).
    fn es_descriptor(&self) -> Vec<u8> {
        let mut buffer_size: u32 = 0x300;
        while buffer_size < 2 * self.max_frame_size {
            buffer_size += 0x100;
        }

        let index = SAMPLING_FREQUENCIES
            .iter()
            .position(|&f| f == self.sample_rate)
            .unwrap_or(4) as u32; // default to 44100Hz

        // Audio Specific Configuration: AAC LC, 1024 samples per frame.
        let mut asc: [u8; 4] = [0x05, 0x02, 0x10, 0x00];
        asc[2] |= ((index >> 1) & 0x07) as u8;
        asc[3] |= (((index & 1) << 7) as u8) | (((self.channels & 0x0f) << 3) as u8);

        // Decoder Configuration Descriptor: Audio ISO/IEC 14496-3,
        // AudioStream.
        let mut dec_config = Vec::with_capacity(19);
        dec_config.extend_from_slice(&[0x04, 0x11, 0x40, 0x15]);
        dec_config.extend_from_slice(&buffer_size.to_be_bytes()[1..4]);
        dec_config.extend_from_slice(&self.bitrate_bps.to_be_bytes()); // max bitrate
        dec_config.extend_from_slice(&self.bitrate_bps.to_be_bytes()); // average bitrate
        dec_config.extend_from_slice(&asc);

        let mut descriptor = Vec::with_capacity(27);
        descriptor.extend_from_slice(&[0x03, 0x19, 0x00, 0x00, 0x00]);
        descriptor.extend_from_slice(&dec_config);
        descriptor.extend_from_slice(&[0x06, 0x01, 0x02]); // SL config, MP4 files
        descriptor
    }

    fn stts(&self) -> Atom {
        let audio_frames = self.frame_sizes.len().saturating_sub(1) as u32;
        let mut data = Vec::with_capacity(20);
        data.extend_from_slice(&2u32.to_be_bytes()); // entry count
        data.extend_from_slice(&1u32.to_be_bytes()); // first frame:
        data.extend_from_slice(&0u32.to_be_bytes()); //   no audio
        data.extend_from_slice(&audio_frames.to_be_bytes());
        data.extend_from_slice(&SAMPLES_PER_FRAME.to_be_bytes());
        Atom::full(b"stts", 0, 0).with_data(data)
    }

    fn stsc(&self) -> Atom {
        let num_frames = self.frame_sizes.len() as u32;
        let mut data = Vec::with_capacity(20);
        data.extend_from_slice(&1u32.to_be_bytes()); // entry count
        data.extend_from_slice(&1u32.to_be_bytes()); // first chunk
        data.extend_from_slice(&num_frames.to_be_bytes()); // samples per chunk
        data.extend_from_slice(&1u32.to_be_bytes()); // sample description index
        Atom::full(b"stsc", 0, 0).with_data(data)
    }

    fn stsz(&self) -> Atom {
        let mut data = Vec::with_capacity(8 + 4 * self.frame_sizes.len());
        data.extend_from_slice(&0u32.to_be_bytes()); // 0: frames differ in size
        data.extend_from_slice(&(self.frame_sizes.len() as u32).to_be_bytes());
        for &size in self.frame_sizes {
            data.extend_from_slice(&size.to_be_bytes());
        }
        Atom::full(b"stsz", 0, 0).with_data(data)
    }

    fn stco(&self) -> Atom {
        // Single chunk; the offset is patched once the tree is sized.
        let mut data = Vec::with_capacity(8);
        data.extend_from_slice(&1u32.to_be_bytes()); // entry count
        data.extend_from_slice(&0u32.to_be_bytes());
        Atom::full(b"stco", 0, 0).with_data(data)
    }
}

const UNITY_MATRIX: [u8; 36] = [
    0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0, 0, 0,
];
