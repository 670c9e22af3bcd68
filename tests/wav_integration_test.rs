//! WAV indexing and subset extraction end to end.

mod common;

use common::{make_wav, write_temp};
use std::fs;
use waveclip::{open, open_with_progress, write_subset, Error, FileType, WaveformPyramid};

#[test]
fn test_one_second_of_silence() {
    // 8kHz mono: 20ms frames are 320 bytes, so one second is 50 frames.
    let wav = make_wav(8000, 1, &vec![0u8; 16000]);
    let file = write_temp(&wav, ".wav");

    let handle = open(file.path()).unwrap();
    assert_eq!(handle.file_type(), FileType::Wav);
    assert_eq!(handle.sample_rate(), 8000);
    assert_eq!(handle.channels(), 1);
    assert_eq!(handle.samples_per_frame(), 160);
    assert_eq!(handle.frame_count(), 50);
    assert!(handle.frame_lens().iter().all(|&l| l == 320));
    assert!(handle.frame_gains().iter().all(|&g| g == 0));
    assert!((handle.duration_seconds() - 1.0).abs() < 1e-9);
}

#[test]
fn test_gain_tracks_loud_frames() {
    let mut data = vec![0u8; 16000];
    // High byte of the first sample of the second frame.
    data[320 + 1] = 0x70;
    let wav = make_wav(8000, 1, &data);
    let file = write_temp(&wav, ".wav");

    let handle = open(file.path()).unwrap();
    assert_eq!(handle.frame_gains()[0], 0);
    assert_eq!(handle.frame_gains()[1], 0x70);
    assert_eq!(handle.frame_gains()[2], 0);
}

#[test]
fn test_final_partial_frame() {
    // 500 data bytes split into one full 320-byte frame and a 180-byte tail.
    let wav = make_wav(8000, 1, &vec![0u8; 500]);
    let file = write_temp(&wav, ".wav");

    let handle = open(file.path()).unwrap();
    assert_eq!(handle.frame_lens(), &[320, 180]);
}

#[test]
fn test_full_subset_roundtrip() {
    let data: Vec<u8> = (0..16000u32).map(|i| (i % 251) as u8).collect();
    let wav = make_wav(8000, 1, &data);
    let file = write_temp(&wav, ".wav");
    let out = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();

    let handle = open(file.path()).unwrap();
    write_subset(&handle, 0, handle.frame_count(), out.path()).unwrap();

    let written = fs::read(out.path()).unwrap();
    assert_eq!(written.len(), 44 + data.len());
    assert_eq!(&written[0..4], b"RIFF");
    assert_eq!(&written[44..], &data[..]);
}

#[test]
fn test_partial_subset_payload() {
    let data: Vec<u8> = (0..16000u32).map(|i| (i % 7) as u8).collect();
    let wav = make_wav(8000, 1, &data);
    let file = write_temp(&wav, ".wav");
    let out = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();

    let handle = open(file.path()).unwrap();
    write_subset(&handle, 10, 20, out.path()).unwrap();

    // Ten 320-byte frames starting at frame 10.
    let written = fs::read(out.path()).unwrap();
    assert_eq!(written.len(), 44 + 3200);
    let riff_len = u32::from_le_bytes([written[4], written[5], written[6], written[7]]);
    assert_eq!(riff_len, 36 + 3200);
    assert_eq!(&written[44..], &data[3200..6400]);
}

#[test]
fn test_out_of_range_bounds_are_clamped() {
    let wav = make_wav(8000, 1, &vec![0u8; 1600]);
    let file = write_temp(&wav, ".wav");
    let out = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();

    let handle = open(file.path()).unwrap();
    write_subset(&handle, 0, 10_000, out.path()).unwrap();
    let written = fs::read(out.path()).unwrap();
    assert_eq!(written.len(), 44 + 1600);
}

#[test]
fn test_truncated_data_chunk() {
    let mut wav = make_wav(8000, 1, &vec![0u8; 1000]);
    // Declare far more data than the file holds.
    let data_len_pos = wav.len() - 1000 - 4;
    wav[data_len_pos..data_len_pos + 4].copy_from_slice(&100_000u32.to_le_bytes());
    let file = write_temp(&wav, ".wav");

    let err = open(file.path()).unwrap_err();
    assert!(matches!(err, Error::TruncatedFile(_)), "got {err:?}");
}

#[test]
fn test_truncated_fmt_chunk() {
    let mut wav = make_wav(8000, 1, &vec![0u8; 126]);
    // Declare a plausible fmt length that runs past end of file.
    wav[16..20].copy_from_slice(&1024u32.to_le_bytes());
    let file = write_temp(&wav, ".wav");

    let err = open(file.path()).unwrap_err();
    assert!(matches!(err, Error::TruncatedFile(_)), "got {err:?}");
}

#[test]
fn test_data_before_fmt() {
    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&1000u32.to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&200u32.to_le_bytes());
    wav.extend_from_slice(&vec![0u8; 200]);
    let file = write_temp(&wav, ".wav");

    let err = open(file.path()).unwrap_err();
    assert!(matches!(err, Error::BadFormat(_)), "got {err:?}");
}

#[test]
fn test_non_pcm_encoding_rejected() {
    let mut wav = make_wav(8000, 1, &vec![0u8; 1000]);
    // Patch the fmt encoding to IEEE float.
    wav[20..22].copy_from_slice(&3u16.to_le_bytes());
    let file = write_temp(&wav, ".wav");

    let err = open(file.path()).unwrap_err();
    assert!(matches!(err, Error::BadFormat(_)), "got {err:?}");
}

#[test]
fn test_bad_magic() {
    let mut wav = make_wav(8000, 1, &vec![0u8; 1000]);
    wav[0..4].copy_from_slice(b"RIFX");
    let file = write_temp(&wav, ".wav");

    let err = open(file.path()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)), "got {err:?}");
}

#[test]
fn test_tiny_file() {
    let file = write_temp(b"RIFF tiny", ".wav");
    let err = open(file.path()).unwrap_err();
    assert!(matches!(err, Error::BadFormat(_)), "got {err:?}");
}

#[test]
fn test_cancellation_keeps_partial_index() {
    let wav = make_wav(8000, 1, &vec![0u8; 16000]);
    let file = write_temp(&wav, ".wav");

    let mut calls = 0;
    let handle = open_with_progress(file.path(), |_| {
        calls += 1;
        calls < 3
    })
    .unwrap();
    assert_eq!(handle.frame_count(), 3);
}

#[test]
fn test_pyramid_over_wav_handle() {
    let mut data = vec![0u8; 16000];
    for frame in 0..50 {
        data[frame * 320 + 1] = (frame * 2) as u8;
    }
    let wav = make_wav(8000, 1, &data);
    let file = write_temp(&wav, ".wav");

    let handle = open(file.path()).unwrap();
    let pyramid = WaveformPyramid::build(&handle);
    assert_eq!(pyramid.level(1).len(), handle.frame_count());
    assert_eq!(pyramid.level(0).len(), handle.frame_count() * 2);
    assert_eq!(pyramid.initial_level(), 0);
}
