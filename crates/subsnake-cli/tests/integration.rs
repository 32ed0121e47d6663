//! Integration tests for subsnake-cli.
//!
//! These run the built binary against temporary settings files, so nothing
//! touches the user's real configuration or needs an audio device.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `subsnake` binary built by cargo.
fn subsnake_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_subsnake"))
}

fn run(config: &Path, args: &[&str]) -> Output {
    subsnake_bin()
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run subsnake")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// 1. Patches
// ---------------------------------------------------------------------------

#[test]
fn cli_lists_factory_patches() {
    let output = subsnake_bin()
        .args(["patches", "list", "--factory"])
        .output()
        .expect("failed to run subsnake patches");
    assert!(output.status.success());

    let text = stdout(&output);
    for name in ["init", "bass", "pad", "pluck", "lead"] {
        assert!(text.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_shows_factory_patch() {
    let output = subsnake_bin()
        .args(["patches", "show", "bass"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Patch: Bass"));
    assert!(text.contains("osc_wave"));
}

#[test]
fn cli_unknown_patch_fails() {
    let output = subsnake_bin()
        .args(["patches", "show", "no_such_patch_12345"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// 2. CC assignments persist in the settings file
// ---------------------------------------------------------------------------

#[test]
fn cli_cc_assign_writes_settings() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");

    let first = run(&config, &["cc", "assign", "filter", "cutoff", "--cc", "74"]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    let second = run(&config, &["cc", "assign", "delay", "mix", "--cc", "74"]);
    assert!(stdout(&second).contains("CC 75"));

    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(saved.contains("[[cc]]"));
    assert!(saved.contains("cutoff"));

    let listing = stdout(&run(&config, &["cc", "list"]));
    assert!(listing.contains("CC  74 -> filter cutoff"));
    assert!(listing.contains("CC  75 -> delay mix"));

    assert!(run(&config, &["cc", "remove", "74"]).status.success());
    assert!(!run(&config, &["cc", "remove", "74"]).status.success());
}

#[test]
fn cli_cc_rejects_unknown_target() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");
    let output = run(&config, &["cc", "assign", "filter", "wobble"]);
    assert!(!output.status.success());
    assert!(!config.exists());
}

#[test]
fn cli_rejects_invalid_settings() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");
    std::fs::write(&config, "[midi]\nchannel = 40\n").unwrap();
    let output = run(&config, &["cc", "list"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("midi.channel"));
}

// ---------------------------------------------------------------------------
// 3. Offline render
// ---------------------------------------------------------------------------

#[test]
fn cli_renders_notes_to_wav() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");
    let wav = dir.path().join("out.wav");

    let output = run(
        &config,
        &[
            "render",
            wav.to_str().unwrap(),
            "--notes",
            "C4:0:0.25,E4:0.1:0.25,G4:0.2:0.25:80",
            "--patch",
            "pluck",
            "--param",
            "del_mix=0",
            "--tail",
            "0.5",
            "--sample-rate",
            "22050",
            "--bits",
            "16",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let info = subsnake_io::read_wav_info(&wav).unwrap();
    assert_eq!(info.sample_rate, 22050);
    assert_eq!(info.channels, 2);
    assert_eq!(info.bits_per_sample, 16);
    // 0.45 s of notes plus 0.5 s of tail.
    let expected = (0.95 * 22050.0) as u64;
    assert!(info.num_frames.abs_diff(expected) <= 1, "{} frames", info.num_frames);

    let (frames, _) = subsnake_io::read_wav_frames(&wav).unwrap();
    assert!(frames.iter().any(|f| f[0].abs() > 1e-3));
}

#[test]
fn cli_info_reports_rendered_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");
    let wav = dir.path().join("info.wav");
    let output = run(
        &config,
        &["render", wav.to_str().unwrap(), "--notes", "A3:0:0.1", "--tail", "0.1", "--bits", "24"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run(&config, &["info", wav.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("PCM 24-bit"), "{text}");
    assert!(text.contains("Channels:    2"), "{text}");
    assert!(text.contains("Left:"), "{text}");
    assert!(text.contains("dBFS"), "{text}");
}

#[test]
fn cli_info_fails_on_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");
    let missing = dir.path().join("missing.wav");
    let output = run(&config, &["info", missing.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn cli_render_rejects_bad_notes() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings.toml");
    let wav = dir.path().join("bad.wav");
    let output = run(&config, &["render", wav.to_str().unwrap(), "--notes", "X9"]);
    assert!(!output.status.success());
    assert!(!wav.exists());
}
