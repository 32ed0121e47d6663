//! MIDI CC assignment commands. Changes are written to the settings file.

use super::common::load_settings;
use clap::{Args, Subcommand};
use std::path::Path;
use subsnake_config::{DEFAULT_CC, Settings};
use subsnake_synth::{CC_TABLE, CcTarget};

#[derive(Args)]
pub struct CcArgs {
    #[command(subcommand)]
    command: Option<CcCommand>,
}

#[derive(Subcommand)]
enum CcCommand {
    /// Show current assignments
    List,

    /// Show every assignable module and parameter
    Targets,

    /// Assign a CC number to a parameter
    Assign {
        /// Module label, e.g. "filter"
        module: String,

        /// Parameter label, e.g. "cutoff"
        parameter: String,

        /// CC number; taken numbers move to the next free one
        #[arg(long, default_value_t = DEFAULT_CC, value_parser = clap::value_parser!(u8).range(0..=127))]
        cc: u8,
    },

    /// Remove the assignment of a CC number
    Remove {
        /// CC number
        cc: u8,
    },

    /// Remove every assignment
    Clear,
}

pub fn run(args: CcArgs, config: &Path) -> anyhow::Result<()> {
    let mut settings = load_settings(config)?;
    match args.command.unwrap_or(CcCommand::List) {
        CcCommand::List => print_assignments(&settings)?,
        CcCommand::Targets => {
            println!("Assignable Parameters");
            println!("=====================\n");
            for entry in &CC_TABLE {
                println!("  {:12} {:10} -> {}", entry.module, entry.parameter, entry.param.key());
            }
        }
        CcCommand::Assign {
            module,
            parameter,
            cc,
        } => {
            let assigned = assign(&mut settings, &module, &parameter, cc)?;
            settings.save(config)?;
            if assigned != cc {
                println!("CC {cc} is taken, using {assigned}");
            }
            println!("CC {assigned} -> {module} {parameter}");
        }
        CcCommand::Remove { cc } => {
            if !remove(&mut settings, cc)? {
                anyhow::bail!("CC {cc} is not assigned");
            }
            settings.save(config)?;
            println!("Removed CC {cc}");
        }
        CcCommand::Clear => {
            settings.cc.clear();
            settings.save(config)?;
            println!("Cleared all CC assignments");
        }
    }
    Ok(())
}

fn print_assignments(settings: &Settings) -> anyhow::Result<()> {
    let map = settings.cc_map()?;
    println!("CC Assignments");
    println!("==============\n");
    if map.is_empty() {
        println!("  (none)");
        println!();
        println!("  Assign one with: subsnake cc assign filter cutoff --cc 74");
    }
    for (cc, target) in map.iter() {
        let entry = target.entry();
        println!("  CC {:3} -> {} {}", cc, entry.module, entry.parameter);
    }
    Ok(())
}

/// Assign through the map so collisions resolve the same way at load time.
/// Returns the CC number used.
fn assign(settings: &mut Settings, module: &str, parameter: &str, cc: u8) -> anyhow::Result<u8> {
    let Some(target) = CcTarget::from_labels(module, parameter) else {
        anyhow::bail!(
            "Unknown target '{module} {parameter}'. Use 'subsnake cc targets' to list them."
        );
    };
    let mut map = settings.cc_map()?;
    let Some(assigned) = map.assign(cc, target) else {
        anyhow::bail!("No free CC number left");
    };
    settings.set_cc_map(&map);
    Ok(assigned)
}

fn remove(settings: &mut Settings, cc: u8) -> anyhow::Result<bool> {
    let mut map = settings.cc_map()?;
    let removed = map.remove(cc).is_some();
    settings.set_cc_map(&map);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_collide() {
        let mut settings = Settings::default();
        assert_eq!(assign(&mut settings, "filter", "cutoff", 74).unwrap(), 74);
        assert_eq!(assign(&mut settings, "Filter", "Feedback", 74).unwrap(), 75);
        let map = settings.cc_map().unwrap();
        assert_eq!(map.target(75), Some(CcTarget::FilterFeedback));
    }

    #[test]
    fn test_reserved_cc_skipped() {
        let mut settings = Settings::default();
        assert_eq!(assign(&mut settings, "delay", "mix", 123).unwrap(), 124);
    }

    #[test]
    fn test_unknown_target() {
        let mut settings = Settings::default();
        assert!(assign(&mut settings, "filter", "wobble", 1).is_err());
        assert!(settings.cc.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut settings = Settings::default();
        assign(&mut settings, "envelope", "attack", 10).unwrap();
        assert!(remove(&mut settings, 10).unwrap());
        assert!(!remove(&mut settings, 10).unwrap());
        assert!(settings.cc.is_empty());
    }
}
