//! Audio output and MIDI input listing.

use clap::{Args, Subcommand};
use subsnake_io::{default_output_device, list_devices, list_ports};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List audio outputs and MIDI inputs
    List,

    /// Show the default output device
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = list_devices()?;

            println!("Audio Outputs");
            println!("=============\n");
            if devices.is_empty() {
                println!("  (none)");
            }
            for device in &devices {
                let default = if device.is_default { " (default)" } else { "" };
                println!(
                    "  [{}] {} ({} Hz, {} ch){}",
                    device.index,
                    device.name,
                    device.default_sample_rate,
                    device.channels,
                    default
                );
            }
            println!();

            println!("MIDI Inputs");
            println!("===========\n");
            match list_ports() {
                Ok(ports) if ports.is_empty() => println!("  (none)"),
                Ok(ports) => {
                    for port in ports {
                        println!("  [{}] {}", port.index, port.name);
                    }
                }
                Err(e) => println!("  unavailable: {e}"),
            }
            println!();
            println!("Tip: Use an index or partial name with --output/--midi:");
            println!("  subsnake play --output 0 --midi \"Keystation\"");
        }

        DevicesCommand::Info => match default_output_device() {
            Some(device) => {
                println!("Default Output:");
                println!("  Name: {}", device.name);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
                println!("  Channels: {}", device.channels);
            }
            None => println!("Default Output: None"),
        },
    }

    Ok(())
}
