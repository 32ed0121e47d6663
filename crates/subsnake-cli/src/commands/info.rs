//! Display WAV file metadata and levels, e.g. for checking a render.

use clap::Args;
use std::path::PathBuf;
use subsnake_io::{WavFormat, read_wav_frames, read_wav_info};

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: PathBuf,
}

/// Peak and RMS of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub peak: f32,
    pub rms: f32,
}

/// Per-channel levels of stereo frames.
pub fn channel_levels(frames: &[[f32; 2]]) -> [Levels; 2] {
    let mut peak = [0.0f32; 2];
    let mut sum_sq = [0.0f64; 2];
    for frame in frames {
        for ch in 0..2 {
            peak[ch] = peak[ch].max(frame[ch].abs());
            sum_sq[ch] += f64::from(frame[ch]) * f64::from(frame[ch]);
        }
    }
    let len = frames.len().max(1) as f64;
    [0, 1].map(|ch| Levels {
        peak: peak[ch],
        rms: (sum_sq[ch] / len).sqrt() as f32,
    })
}

fn to_db(level: f32) -> f32 {
    if level > 0.0 {
        20.0 * level.log10()
    } else {
        f32::NEG_INFINITY
    }
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.file)?;

    let format_str = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", format_str, info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    let (frames, _) = read_wav_frames(&args.file)?;
    for (name, levels) in ["Left", "Right"].iter().zip(channel_levels(&frames)) {
        println!(
            "{:<12} peak {:.1} dBFS, rms {:.1} dBFS",
            format!("{name}:"),
            to_db(levels.peak),
            to_db(levels.rms)
        );
    }
    Ok(())
}
