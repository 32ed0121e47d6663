//! Subsnake CLI - play, render and configure the subsnake synthesizer.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "subsnake")]
#[command(author, version, about = "Subsnake polyphonic synthesizer", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play live from a MIDI input
    Play(commands::play::PlayArgs),

    /// Render a note list to a WAV file
    Render(commands::render::RenderArgs),

    /// List audio outputs and MIDI inputs
    Devices(commands::devices::DevicesArgs),

    /// Show WAV file format and levels
    Info(commands::info::InfoArgs),

    /// List, show and save patches
    Patches(commands::patches::PatchesArgs),

    /// Show and edit MIDI CC assignments
    Cc(commands::cc::CcArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();
    let config = cli.config.unwrap_or_else(subsnake_config::settings_path);

    match cli.command {
        Commands::Play(args) => commands::play::run(args, &config),
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Patches(args) => commands::patches::run(args),
        Commands::Cc(args) => commands::cc::run(args, &config),
    }
}
