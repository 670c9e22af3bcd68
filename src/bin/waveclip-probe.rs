//! waveclip-probe - inspect an audio file's frame index
//!
//! # Usage
//!
//! ```bash
//! # Show human-readable output
//! waveclip-probe recording.m4a
//!
//! # Show JSON output
//! waveclip-probe --format json recording.m4a
//!
//! # Include the waveform pyramid summary
//! waveclip-probe --pyramid recording.wav
//! ```

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use waveclip::{open, WaveformPyramid};

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output (default)
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "waveclip-probe")]
#[command(about = "Probe audio files and print their frame index", long_about = None)]
struct Args {
    /// Audio file to probe
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Include a waveform pyramid summary
    #[arg(short, long)]
    pyramid: bool,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    file: String,
    file_type: String,
    file_size_bytes: u64,
    sample_rate: u32,
    channels: u16,
    frame_count: usize,
    samples_per_frame: u32,
    duration_seconds: f64,
    avg_bitrate_kbps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pyramid: Option<PyramidReport>,
}

#[derive(Debug, Serialize)]
struct PyramidReport {
    initial_level: usize,
    level_lengths: Vec<usize>,
    peak_height: f64,
}

fn main() {
    let args = Args::parse();

    let handle = match open(&args.file) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: Failed to probe '{}': {}", args.file.display(), e);
            process::exit(1);
        }
    };

    let pyramid = args.pyramid.then(|| {
        let pyramid = WaveformPyramid::build(&handle);
        PyramidReport {
            initial_level: pyramid.initial_level(),
            level_lengths: (0..5).map(|l| pyramid.level(l).len()).collect(),
            peak_height: pyramid
                .level(1)
                .iter()
                .fold(0.0f64, |acc, &h| acc.max(h)),
        }
    });

    let report = ProbeReport {
        file: args.file.display().to_string(),
        file_type: handle.file_type().name().to_string(),
        file_size_bytes: handle.file_size_bytes(),
        sample_rate: handle.sample_rate(),
        channels: handle.channels(),
        frame_count: handle.frame_count(),
        samples_per_frame: handle.samples_per_frame(),
        duration_seconds: handle.duration_seconds(),
        avg_bitrate_kbps: handle.avg_bitrate_kbps(),
        pyramid,
    };

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(j) => println!("{}", j),
            Err(e) => {
                eprintln!("Error: Failed to serialize JSON: {}", e);
                process::exit(1);
            }
        },
    }
}

fn print_text(report: &ProbeReport) {
    println!("File: {}", report.file);
    println!("  Type:              {}", report.file_type);
    println!("  Size:              {} bytes", report.file_size_bytes);
    println!("  Sample rate:       {} Hz", report.sample_rate);
    println!("  Channels:          {}", report.channels);
    println!("  Frames:            {}", report.frame_count);
    println!("  Samples per frame: {}", report.samples_per_frame);
    println!("  Duration:          {:.3} s", report.duration_seconds);
    println!("  Avg bitrate:       {} kbps", report.avg_bitrate_kbps);
    if let Some(ref pyramid) = report.pyramid {
        println!("  Pyramid:");
        println!("    Initial level:   {}", pyramid.initial_level);
        println!("    Level lengths:   {:?}", pyramid.level_lengths);
        println!("    Peak height:     {:.3}", pyramid.peak_height);
    }
}
