//! The parsed view of an audio file: frame index, gains and stream parameters.

use std::path::PathBuf;

/// Container formats the frame indexers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// 16-bit PCM RIFF/WAVE
    Wav,
    /// AMR narrow-band speech, raw or in a 3GPP box
    Amr,
    /// AAC audio in an MP4 (M4A) container
    Mp4Aac,
}

impl FileType {
    pub fn name(&self) -> &'static str {
        match self {
            FileType::Wav => "WAV",
            FileType::Amr => "AMR",
            FileType::Mp4Aac => "MP4/AAC",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame index of one audio file.
///
/// A handle holds no audio data. Each frame is described by its byte range
/// in the source file and a gain value estimated from the compressed
/// bitstream; gains are comparable within one file but carry no unit.
///
/// The three frame arrays always have equal length. AMR emits one entry
/// per 40-sample subframe, so four consecutive entries may share one
/// physical frame's offset and length.
#[derive(Debug, Clone)]
pub struct SoundHandle {
    pub(crate) file_type: FileType,
    pub(crate) source: PathBuf,
    pub(crate) file_size: u64,
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
    pub(crate) samples_per_frame: u32,
    pub(crate) frame_offsets: Vec<u64>,
    pub(crate) frame_lens: Vec<u32>,
    pub(crate) frame_gains: Vec<i32>,
    /// Nominal bitrate for formats where it is not derivable (AMR modes).
    pub(crate) nominal_bitrate_kbps: Option<u32>,
}

impl SoundHandle {
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Path the handle was parsed from.
    pub fn source(&self) -> &std::path::Path {
        &self.source
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.file_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples covered by one frame table entry.
    pub fn samples_per_frame(&self) -> u32 {
        self.samples_per_frame
    }

    pub fn frame_count(&self) -> usize {
        self.frame_offsets.len()
    }

    /// Byte offset of each frame in the source file.
    pub fn frame_offsets(&self) -> &[u64] {
        &self.frame_offsets
    }

    /// Byte length of each frame.
    pub fn frame_lens(&self) -> &[u32] {
        &self.frame_lens
    }

    /// Estimated gain of each frame.
    pub fn frame_gains(&self) -> &[i32] {
        &self.frame_gains
    }

    /// Total duration implied by the frame table.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 * self.samples_per_frame as f64 / self.sample_rate as f64
    }

    /// Approximate average bitrate in kbps.
    pub fn avg_bitrate_kbps(&self) -> u32 {
        if let Some(kbps) = self.nominal_bitrate_kbps {
            return kbps;
        }
        match self.file_type {
            FileType::Wav => self.sample_rate * self.channels as u32 * 2 / 1024,
            FileType::Mp4Aac => {
                let samples = self.frame_count() as u64 * self.samples_per_frame as u64;
                if samples == 0 {
                    0
                } else {
                    (self.file_size / samples) as u32
                }
            }
            FileType::Amr => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(file_type: FileType, sample_rate: u32, channels: u16) -> SoundHandle {
        SoundHandle {
            file_type,
            source: PathBuf::from("test"),
            file_size: 0,
            sample_rate,
            channels,
            samples_per_frame: sample_rate / 50,
            frame_offsets: vec![],
            frame_lens: vec![],
            frame_gains: vec![],
            nominal_bitrate_kbps: None,
        }
    }

    #[test]
    fn test_wav_bitrate() {
        // 44.1kHz stereo 16-bit PCM works out to 172 kbps
        let h = handle(FileType::Wav, 44100, 2);
        assert_eq!(h.avg_bitrate_kbps(), 172);
    }

    #[test]
    fn test_empty_handle_is_harmless() {
        let h = handle(FileType::Mp4Aac, 44100, 2);
        assert_eq!(h.avg_bitrate_kbps(), 0);
        assert_eq!(h.duration_seconds(), 0.0);
        assert_eq!(h.frame_count(), 0);
    }

    #[test]
    fn test_duration_from_frame_table() {
        let mut h = handle(FileType::Wav, 8000, 1);
        h.frame_offsets = vec![44; 50];
        h.frame_lens = vec![320; 50];
        h.frame_gains = vec![0; 50];
        assert!((h.duration_seconds() - 1.0).abs() < 1e-9);
    }
}
