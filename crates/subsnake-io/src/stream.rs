//! Real-time audio output via cpal.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream};
use subsnake_synth::SynthProcessor;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio output device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Position in the host's output device list.
    pub index: usize,
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub channels: u16,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

/// Output stream configuration.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Device name, partial name or index (uses default if `None`).
    pub device: Option<String>,
    /// Fixed buffer size in frames (device default if `None`).
    pub buffer_size: Option<u32>,
}

/// List all audio output devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| device_name(&d).ok());
    let outputs = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    let devices = outputs
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device_name(&device).ok()?;
            let config = device.default_output_config().ok();
            Some(AudioDevice {
                index,
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                default_sample_rate: config.as_ref().map_or(48000, |c| c.sample_rate()),
                channels: config.as_ref().map_or(2, |c| c.channels()),
            })
        })
        .collect();
    Ok(devices)
}

/// The default output device, if the host has one.
pub fn default_output_device() -> Option<AudioDevice> {
    let device = cpal::default_host().default_output_device()?;
    let name = device_name(&device).ok()?;
    let config = device.default_output_config().ok();
    Some(AudioDevice {
        index: 0,
        name,
        default_sample_rate: config.as_ref().map_or(48000, |c| c.sample_rate()),
        channels: config.as_ref().map_or(2, |c| c.channels()),
        is_default: true,
    })
}

/// Pick an entry by index, exact name, or case-insensitive partial name.
pub(crate) fn find_by_name(names: &[String], name_or_index: &str, kind: &str) -> Option<usize> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        return (index < names.len()).then_some(index);
    }
    if let Some(index) = names.iter().position(|n| n == name_or_index) {
        return Some(index);
    }
    let search = name_or_index.to_lowercase();
    let matches: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.to_lowercase().contains(&search))
        .map(|(i, _)| i)
        .collect();
    if matches.len() > 1 {
        let candidates: Vec<&str> = matches.iter().map(|&i| names[i].as_str()).collect();
        tracing::warn!(
            query = name_or_index,
            kind,
            ?candidates,
            "multiple matches, using the first"
        );
    }
    matches.first().copied()
}

/// A device chosen for output, not yet running.
pub struct OutputTarget {
    device: Device,
    config: cpal::StreamConfig,
    name: String,
}

impl std::fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTarget")
            .field("name", &self.name)
            .field("channels", &self.config.channels)
            .finish_non_exhaustive()
    }
}

/// Choose the output device and configuration described by `config`.
pub fn resolve_output(config: &StreamConfig) -> Result<OutputTarget> {
    let host = cpal::default_host();
    let device = match &config.device {
        Some(query) => {
            let devices: Vec<Device> = host
                .output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?
                .collect();
            let names: Vec<String> = devices
                .iter()
                .map(|d| device_name(d).unwrap_or_default())
                .collect();
            let index = find_by_name(&names, query, "output").ok_or_else(|| {
                Error::DeviceNotFound(format!(
                    "no output device matching '{query}' ({} available)",
                    names.len()
                ))
            })?;
            devices.into_iter().nth(index).ok_or(Error::NoDevice)?
        }
        None => host.default_output_device().ok_or(Error::NoDevice)?,
    };

    let supported = device
        .default_output_config()
        .map_err(|e| Error::Stream(e.to_string()))?;
    let mut stream_config: cpal::StreamConfig = supported.into();
    if let Some(frames) = config.buffer_size {
        stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
    }
    let name = device_name(&device).unwrap_or_else(|_| "unknown".into());
    Ok(OutputTarget {
        device,
        config: stream_config,
        name,
    })
}

impl OutputTarget {
    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample rate the stream will run at.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Build and start the stream, moving `processor` into the callback.
    pub fn start(self, mut processor: SynthProcessor) -> Result<SynthOutput> {
        let channels = usize::from(self.config.channels);
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                    let ts = info.timestamp();
                    let latency = ts
                        .playback
                        .duration_since(&ts.callback)
                        .map_or(0.0, |d| d.as_secs_f64());
                    processor.process_interleaved(data, channels, latency);
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;
        stream.play().map_err(|e| Error::Stream(e.to_string()))?;

        tracing::info!(
            device = %self.name,
            sample_rate = self.config.sample_rate,
            channels,
            "audio output started"
        );
        Ok(SynthOutput {
            stream,
            name: self.name,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        })
    }
}

/// A running output stream. Dropping it stops the audio.
pub struct SynthOutput {
    stream: Stream,
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl std::fmt::Debug for SynthOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthOutput")
            .field("name", &self.name)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl SynthOutput {
    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Stop the stream.
    pub fn stop(self) {
        if let Err(err) = self.stream.pause() {
            tracing::debug!(%err, "pause before drop failed");
        }
        tracing::info!(device = %self.name, "audio output stopped");
    }
}
