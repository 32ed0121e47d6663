//! Live playback from a MIDI input.

use super::common::{load_settings, parse_key_val, starting_patch};
use anyhow::Context;
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use subsnake_io::{Session, SessionConfig, StreamConfig};
use subsnake_synth::{ChannelFilter, DEFAULT_PERIOD, MIN_PERIOD, RecorderEvent};

#[derive(Args)]
pub struct PlayArgs {
    /// Patch name or path
    #[arg(short, long)]
    patch: Option<String>,

    /// Parameter overrides (e.g., "filt_freq=880")
    #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
    param: Vec<(String, String)>,

    /// Output device (index, exact name, or partial name)
    #[arg(short, long)]
    output: Option<String>,

    /// Fixed buffer size in frames
    #[arg(long)]
    buffer_size: Option<u32>,

    /// MIDI input port (index, exact name, or partial name)
    #[arg(short, long)]
    midi: Option<String>,

    /// MIDI channel 1-16 (omni when unset)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    channel: Option<u8>,

    /// Voice pool size
    #[arg(long)]
    voices: Option<usize>,

    /// Scheduler wake period in microseconds
    #[arg(long, default_value_t = DEFAULT_PERIOD.as_micros() as u64)]
    period_us: u64,

    /// Arm the looper and record from the start
    #[arg(long)]
    record: bool,
}

pub fn run(args: PlayArgs, config: &Path) -> anyhow::Result<()> {
    let mut settings = load_settings(config)?;
    if args.output.is_some() {
        settings.audio.device = args.output.clone();
    }
    if args.buffer_size.is_some() {
        settings.audio.buffer_size = args.buffer_size;
    }
    if args.midi.is_some() {
        settings.midi.port = args.midi.clone();
    }
    if args.channel.is_some() {
        settings.midi.channel = args.channel;
    }
    if let Some(voices) = args.voices {
        settings.engine.voices = voices;
    }
    settings.validate()?;

    let period = Duration::from_micros(args.period_us).clamp(MIN_PERIOD, DEFAULT_PERIOD);
    let mut session = Session::new(SessionConfig {
        stream: StreamConfig {
            device: settings.audio.device.clone(),
            buffer_size: settings.audio.buffer_size,
        },
        voices: settings.engine.voices,
        recorder_seconds: settings.engine.recorder_seconds,
        seed: settings.engine.seed,
        channel: settings.channel_filter(),
        scheduler_period: period,
    })?;

    for layer in starting_patch(args.patch.as_deref(), &args.param)? {
        session.apply_patch(&layer);
    }
    session.set_cc_map(settings.cc_map()?);

    session.start_audio().context("starting audio output")?;
    if let Some(output) = session.output() {
        println!("Output: {}", output.name());
        println!("  Sample rate: {} Hz", output.sample_rate());
        println!("  Channels: {}", output.channels());
    }

    match settings.midi.port.as_deref() {
        Some(port) => {
            session
                .set_midi_input(port)
                .with_context(|| format!("opening MIDI input '{port}'"))?;
            if let Some(midi) = session.midi() {
                let channel = match settings.channel_filter() {
                    ChannelFilter::Omni => "omni".to_string(),
                    ChannelFilter::Channel(ch) => format!("channel {}", ch + 1),
                };
                println!("MIDI: {} ({channel})", midi.port().name);
            }
        }
        None => println!("MIDI: none (use --midi to pick an input)"),
    }

    let sample_rate = session.output().map_or(0.0, |o| o.sample_rate() as f32);
    if args.record
        && let Some(recorder) = session.recorder()
    {
        recorder.set_record(true);
        recorder.play();
        println!("Looper: recording");
    }

    println!("\nPress Ctrl+C to stop...\n");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut last_readout = Instant::now();
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
        let Some(recorder) = session.recorder() else {
            continue;
        };
        while let Some(event) = recorder.poll_event() {
            match event {
                RecorderEvent::Stopped => tracing::info!("looper reached its end and stopped"),
            }
        }
        if args.record && last_readout.elapsed() >= Duration::from_secs(1) {
            tracing::info!(position = %recorder.readout(sample_rate), "looper");
            last_readout = Instant::now();
        }
    }

    println!("\nStopping...");
    session.shutdown();
    println!("Done!");
    Ok(())
}
