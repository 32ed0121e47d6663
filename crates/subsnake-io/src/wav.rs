//! WAV file reading and writing for stereo frame buffers.

use crate::Result;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames.
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Stereo WAV output settings.
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// 16 or 24 for PCM, 32 for float.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bits_per_sample: 32,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: 2,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Write stereo frames to a WAV file.
///
/// # Example
/// ```ignore
/// let frames = vec![[0.0f32; 2]; 44100]; // 1 second of silence
/// write_wav_frames("render.wav", &frames, WavSpec::default())?;
/// ```
pub fn write_wav_frames<P: AsRef<Path>>(path: P, frames: &[[f32; 2]], spec: WavSpec) -> Result<()> {
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for frame in frames {
            writer.write_sample(frame[0])?;
            writer.write_sample(frame[1])?;
        }
    } else {
        let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
        for frame in frames {
            for &sample in frame {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Read a WAV file as stereo frames.
///
/// Mono files are duplicated to both channels; channels past the second
/// are ignored.
pub fn read_wav_frames<P: AsRef<Path>>(path: P) -> Result<(Vec<[f32; 2]>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let hspec = reader.spec();
    let channels = usize::from(hspec.channels.max(1));

    let samples: Vec<f32> = match hspec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i32 << (hspec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let frames = samples
        .chunks_exact(channels)
        .map(|chunk| [chunk[0], chunk.get(1).copied().unwrap_or(chunk[0])])
        .collect();
    let spec = WavSpec {
        sample_rate: hspec.sample_rate,
        bits_per_sample: hspec.bits_per_sample,
    };
    Ok((frames, spec))
}
