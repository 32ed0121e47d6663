//! Offline render of a note list to WAV.

use super::common::{load_settings, parse_key_val, starting_patch};
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use subsnake_io::{WavSpec, write_wav_frames};
use subsnake_synth::{Engine, EngineConfig};

/// Frames rendered between note dispatches.
const BLOCK: usize = 512;

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    #[arg(value_name = "FILE")]
    output: PathBuf,

    /// Notes as NOTE[:START[:LENGTH[:VELOCITY]]], comma separated.
    /// NOTE is a MIDI number or a name like C4, F#3, Bb2; times in seconds.
    #[arg(short, long, default_value = "C4:0:1")]
    notes: String,

    /// Patch name or path
    #[arg(short, long)]
    patch: Option<String>,

    /// Parameter overrides (e.g., "filt_freq=880")
    #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
    param: Vec<(String, String)>,

    /// Seconds rendered after the last note ends
    #[arg(long, default_value = "2.0")]
    tail: f32,

    /// Sample rate (defaults to the settings file)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Bits per sample: 16, 24 or 32 (float)
    #[arg(long, default_value = "32", value_parser = parse_bits)]
    bits: u16,
}

fn parse_bits(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(bits @ (16 | 24 | 32)) => Ok(bits),
        _ => Err(format!("unsupported bit depth '{s}' (16, 24 or 32)")),
    }
}

/// One note of the list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpec {
    /// MIDI note number.
    pub note: u8,
    /// Start time in seconds.
    pub start: f32,
    /// Held time in seconds.
    pub length: f32,
    /// MIDI velocity.
    pub velocity: u8,
}

/// Parse a note name such as `C4`, `F#3` or `Bb-1`. C4 is 60.
pub fn parse_note_name(s: &str) -> Option<u8> {
    let mut chars = s.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (accidental, octave) = if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        (-1, r)
    } else {
        (0, rest)
    };
    let octave: i32 = octave.parse().ok()?;
    let note = (octave + 1) * 12 + base + accidental;
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

fn parse_note(s: &str) -> Option<u8> {
    match s.parse::<u8>() {
        Ok(n) if n <= 127 => Some(n),
        Ok(_) => None,
        Err(_) => parse_note_name(s),
    }
}

/// Parse the `--notes` list.
pub fn parse_notes(s: &str) -> Result<Vec<NoteSpec>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let fields: Vec<&str> = item.split(':').collect();
            if fields.len() > 4 {
                return Err(format!("too many fields in '{item}'"));
            }
            let note = parse_note(fields[0]).ok_or_else(|| format!("bad note '{}'", fields[0]))?;
            let number = |i: usize, default: f32| -> Result<f32, String> {
                fields.get(i).map_or(Ok(default), |f| {
                    f.parse::<f32>()
                        .ok()
                        .filter(|v| v.is_finite() && *v >= 0.0)
                        .ok_or_else(|| format!("bad number '{f}' in '{item}'"))
                })
            };
            let start = number(1, 0.0)?;
            let length = number(2, 1.0)?;
            let velocity = match fields.get(3) {
                Some(v) => v
                    .parse::<u8>()
                    .ok()
                    .filter(|v| (1..=127).contains(v))
                    .ok_or_else(|| format!("bad velocity '{v}' in '{item}'"))?,
                None => 100,
            };
            Ok(NoteSpec {
                note,
                start,
                length,
                velocity,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NoteEvent {
    // Offs sort before ons at the same frame so repeated notes retrigger.
    Off(u8),
    On(u8, u8),
}

fn schedule(notes: &[NoteSpec], sample_rate: f32) -> Vec<(usize, NoteEvent)> {
    let frame = |t: f32| (t * sample_rate).round() as usize;
    let mut events: Vec<(usize, NoteEvent)> = notes
        .iter()
        .flat_map(|n| {
            let on = frame(n.start);
            let off = frame(n.start + n.length).max(on + 1);
            [
                (on, NoteEvent::On(n.note, n.velocity)),
                (off, NoteEvent::Off(n.note)),
            ]
        })
        .collect();
    events.sort();
    events
}

/// Frames needed for `notes` plus `tail` seconds.
pub fn total_frames(notes: &[NoteSpec], sample_rate: f32, tail: f32) -> usize {
    let end = notes
        .iter()
        .map(|n| n.start + n.length)
        .fold(0.0f32, f32::max);
    ((end + tail.max(0.0)) * sample_rate).ceil() as usize
}

/// Play `notes` through `engine`, calling `progress` with the frames done
/// after each block.
pub fn render_notes(
    engine: &mut Engine,
    notes: &[NoteSpec],
    frames: usize,
    mut progress: impl FnMut(usize),
) -> Vec<[f32; 2]> {
    let events = schedule(notes, engine.sample_rate());
    let mut out = vec![[0.0f32; 2]; frames];
    let mut next = 0;

    let mut start = 0;
    while start < frames {
        let end = (start + BLOCK).min(frames);
        while let Some(&(frame, event)) = events.get(next) {
            if frame >= end {
                break;
            }
            let offset = frame.saturating_sub(start);
            match event {
                NoteEvent::On(note, velocity) => engine.note_on(note, velocity, offset),
                NoteEvent::Off(note) => engine.note_off(note, offset),
            }
            next += 1;
        }
        engine.render(&mut out[start..end]);
        start = end;
        progress(end);
    }
    out
}

pub fn run(args: RenderArgs, config: &Path) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    let notes = parse_notes(&args.notes).map_err(anyhow::Error::msg)?;
    if notes.is_empty() {
        anyhow::bail!("No notes to render");
    }

    let sample_rate = args.sample_rate.unwrap_or(settings.engine.sample_rate);
    if sample_rate == 0 {
        anyhow::bail!("Sample rate must be positive");
    }
    // The looper is never used offline.
    let mut engine = Engine::new(EngineConfig {
        recorder_seconds: 1.0,
        ..settings.engine_config(sample_rate as f32)
    });
    for layer in starting_patch(args.patch.as_deref(), &args.param)? {
        engine.apply(&layer);
    }

    let frames = total_frames(&notes, sample_rate as f32, args.tail);
    println!(
        "Rendering {} note(s), {:.2}s at {} Hz...",
        notes.len(),
        frames as f32 / sample_rate as f32,
        sample_rate
    );

    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    let output = render_notes(&mut engine, &notes, frames, |done| {
        pb.set_position(done as u64);
    });
    pb.finish_with_message("done");

    write_wav_frames(
        &args.output,
        &output,
        WavSpec {
            sample_rate,
            bits_per_sample: args.bits,
        },
    )
    .with_context(|| format!("writing {}", args.output.display()))?;

    let peak = output
        .iter()
        .flat_map(|f| f.iter())
        .fold(0.0f32, |m, s| m.max(s.abs()));
    let peak_db = if peak > 0.0 { 20.0 * peak.log10() } else { f32::NEG_INFINITY };
    println!("Peak {:.1} dBFS", peak_db);
    println!("Saved to {}", args.output.display());
    Ok(())
}
