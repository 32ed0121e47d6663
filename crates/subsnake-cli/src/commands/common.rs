//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use anyhow::Context;
use subsnake_config::{PatchFile, Settings, load_patch as config_load_patch};
use subsnake_synth::{Patch, PatchValue};

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!(
            "Invalid parameter format: '{}' (expected key=value)",
            s
        ));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Turn `--param` overrides into a partial patch. Values that parse as
/// numbers are numbers; anything else is a choice label.
pub fn overrides_patch(params: &[(String, String)]) -> Patch {
    let mut patch = Patch::new();
    for (key, value) in params {
        let value = match value.trim().parse::<f64>() {
            Ok(n) => PatchValue::Number(n),
            Err(_) => PatchValue::Text(value.trim().to_string()),
        };
        patch.set(key.as_str(), value);
    }
    patch
}

/// Load the settings file, falling back to defaults when it doesn't exist.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    Settings::load_or_default(path)
        .with_context(|| format!("loading settings from {}", path.display()))
}

/// Load a patch by path, user patch name or factory name.
pub fn load_patch(name: &str) -> anyhow::Result<PatchFile> {
    config_load_patch(name).with_context(|| {
        format!("Patch '{name}' not found. Use 'subsnake patches list' to see available patches.")
    })
}

/// The patch to start from: `--patch` if given, then `--param` overrides
/// layered on top.
pub fn starting_patch(
    name: Option<&str>,
    params: &[(String, String)],
) -> anyhow::Result<Vec<Patch>> {
    let mut layers = Vec::new();
    if let Some(name) = name {
        let file = load_patch(name)?;
        println!("Patch: {}", file.name);
        layers.push(file.params);
    }
    if !params.is_empty() {
        layers.push(overrides_patch(params));
    }
    Ok(layers)
}
