//! Patch management commands.
//!
//! Lists, shows and saves patches. Saved patches are full snapshots, so a
//! saved file reproduces the sound regardless of what was loaded before.

use super::common::{load_patch, overrides_patch, parse_key_val};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use subsnake_config::{
    PatchFile, ensure_user_patches_dir, factory_patches, list_user_patches, patch_name_from_path,
    paths::find_patch_in, settings_path, user_config_dir, user_patches_dir,
};
use subsnake_synth::{ParamStore, Patch, PatchValue};

#[derive(Args)]
pub struct PatchesArgs {
    #[command(subcommand)]
    command: PatchesCommand,
}

#[derive(Subcommand)]
enum PatchesCommand {
    /// List available patches (factory and user)
    List {
        /// Show only factory patches
        #[arg(long)]
        factory: bool,

        /// Show only user patches
        #[arg(long)]
        user: bool,
    },

    /// Show the values of a patch
    Show {
        /// Patch name or path
        name: String,
    },

    /// Save a patch to the user patches directory
    Save {
        /// Name for the new patch
        name: String,

        /// Start from this patch (defaults to init)
        #[arg(short, long)]
        from: Option<String>,

        /// Parameter values (e.g., "filt_freq=880")
        #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
        param: Vec<(String, String)>,

        /// Description of the patch
        #[arg(short, long)]
        description: Option<String>,

        /// Save as JSON instead of TOML
        #[arg(long)]
        json: bool,

        /// Overwrite if the patch already exists
        #[arg(long)]
        force: bool,
    },

    /// Delete a user patch
    Delete {
        /// Patch name to delete
        name: String,
    },

    /// Show patch and settings directories
    Paths,
}

pub fn run(args: PatchesArgs) -> anyhow::Result<()> {
    match args.command {
        PatchesCommand::List { factory, user } => list_patches(factory, user),
        PatchesCommand::Show { name } => show_patch(&name),
        PatchesCommand::Save {
            name,
            from,
            param,
            description,
            json,
            force,
        } => {
            let dir = ensure_user_patches_dir()?;
            let path = save_patch(
                &dir,
                &name,
                from.as_deref(),
                &param,
                description.as_deref(),
                json,
                force,
            )?;
            println!("Saved patch '{}' to {}", name, path.display());
            Ok(())
        }
        PatchesCommand::Delete { name } => delete_patch(&user_patches_dir(), &name),
        PatchesCommand::Paths => {
            println!("Config directory:  {}", user_config_dir().display());
            println!("Settings file:     {}", settings_path().display());
            println!("User patches:      {}", user_patches_dir().display());
            Ok(())
        }
    }
}

fn list_patches(factory_only: bool, user_only: bool) -> anyhow::Result<()> {
    if !user_only {
        println!("Factory Patches:");
        println!("================");
        for patch in factory_patches() {
            let desc = patch.description.as_deref().unwrap_or("");
            println!("  {:12} - {}", patch.name.to_lowercase(), desc);
        }
        println!();
    }

    if !factory_only {
        println!("User Patches:");
        println!("=============");
        let user = list_user_patches();
        if user.is_empty() {
            println!("  (none)");
            println!();
            println!("  Create one with: subsnake patches save <name> --from pad --param del_mix=0.5");
        }
        for path in user {
            let name = patch_name_from_path(&path).unwrap_or_else(|| "unknown".into());
            match PatchFile::load(&path) {
                Ok(patch) => println!(
                    "  {:12} - {}",
                    name,
                    patch.description.as_deref().unwrap_or("")
                ),
                Err(e) => println!("  {:12} - (unreadable: {})", name, e),
            }
        }
    }
    Ok(())
}

fn format_value(value: &PatchValue) -> String {
    match value {
        PatchValue::Number(n) => format!("{n}"),
        PatchValue::Text(s) => format!("\"{s}\""),
    }
}

fn show_patch(name: &str) -> anyhow::Result<()> {
    let patch = load_patch(name)?;
    println!("Patch: {}", patch.name);
    if let Some(desc) = &patch.description {
        println!("Description: {}", desc);
    }
    println!();
    if patch.params.is_empty() {
        println!("  (all defaults)");
    }
    for (key, value) in patch.params.iter() {
        println!("  {:16} = {}", key, format_value(value));
    }
    Ok(())
}

/// Build and write a full snapshot into `dir`. Returns the written path.
fn save_patch(
    dir: &Path,
    name: &str,
    from: Option<&str>,
    params: &[(String, String)],
    description: Option<&str>,
    json: bool,
    force: bool,
) -> anyhow::Result<PathBuf> {
    let ext = if json { "json" } else { "toml" };
    let path = dir.join(format!("{name}.{ext}"));
    if path.exists() && !force {
        anyhow::bail!(
            "Patch '{}' already exists at {}. Use --force to overwrite.",
            name,
            path.display()
        );
    }

    let store = ParamStore::new();
    if let Some(from) = from {
        load_patch(from)?.apply_to(&store);
    }
    let overrides = overrides_patch(params);
    let unknown: Vec<&str> = overrides
        .iter()
        .filter(|(key, value)| {
            let mut single = Patch::new();
            single.set(*key, (*value).clone());
            single.apply_to(&ParamStore::new()) == 0
        })
        .map(|(key, _)| key)
        .collect();
    if !unknown.is_empty() {
        anyhow::bail!("Unknown parameter or value: {}", unknown.join(", "));
    }
    overrides.apply_to(&store);

    let mut patch = PatchFile::from_store(name, &store);
    if let Some(description) = description {
        patch = patch.with_description(description);
    }
    patch.save(&path)?;
    Ok(path)
}

fn delete_patch(dir: &Path, name: &str) -> anyhow::Result<()> {
    let Some(path) = find_patch_in(dir, name).filter(|p| p.starts_with(dir)) else {
        anyhow::bail!("User patch '{}' not found in {}", name, dir.display());
    };
    std::fs::remove_file(&path)?;
    println!("Deleted {}", path.display());
    Ok(())
}
