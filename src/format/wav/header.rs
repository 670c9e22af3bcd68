//! Canonical 44-byte WAV header for 16-bit PCM.

/// Build the header for a 16-bit PCM WAV file with `audio_len` bytes of
/// sample data following it.
pub fn build_header(sample_rate: u32, channels: u16, audio_len: u32) -> [u8; 44] {
    let riff_len = audio_len + 36;
    let byte_rate = sample_rate * 2 * channels as u32;
    let block_align = 2 * channels;

    let mut header = [0u8; 44];
    header[0..4].copy_from_slice(super::RIFF_MAGIC);
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    header[8..12].copy_from_slice(super::WAVE_MAGIC);
    header[12..16].copy_from_slice(super::FMT_CHUNK);
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&16u16.to_le_bytes()); // bits per sample
    header[36..40].copy_from_slice(super::DATA_CHUNK);
    header[40..44].copy_from_slice(&audio_len.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let h = build_header(44100, 2, 1000);
        assert_eq!(&h[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([h[4], h[5], h[6], h[7]]), 1036);
        assert_eq!(&h[8..12], b"WAVE");
        assert_eq!(&h[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes([h[16], h[17], h[18], h[19]]), 16);
        assert_eq!(u16::from_le_bytes([h[20], h[21]]), 1);
        assert_eq!(u16::from_le_bytes([h[22], h[23]]), 2);
        assert_eq!(u32::from_le_bytes([h[24], h[25], h[26], h[27]]), 44100);
        assert_eq!(u32::from_le_bytes([h[28], h[29], h[30], h[31]]), 176400);
        assert_eq!(u16::from_le_bytes([h[32], h[33]]), 4);
        assert_eq!(u16::from_le_bytes([h[34], h[35]]), 16);
        assert_eq!(&h[36..40], b"data");
        assert_eq!(u32::from_le_bytes([h[40], h[41], h[42], h[43]]), 1000);
    }

    #[test]
    fn test_mono_8khz() {
        let h = build_header(8000, 1, 16000);
        assert_eq!(u32::from_le_bytes([h[28], h[29], h[30], h[31]]), 16000);
        assert_eq!(u16::from_le_bytes([h[32], h[33]]), 2);
    }
}
