//! Platform-specific paths for patches and settings.
//!
//! # Directory Structure
//!
//! - **User patches**: `~/.config/subsnake/patches/` (Linux), `~/Library/Application Support/subsnake/patches/` (macOS), `%APPDATA%\subsnake\patches\` (Windows)
//! - **User config**: `~/.config/subsnake/` (Linux), `~/Library/Application Support/subsnake/` (macOS), `%APPDATA%\subsnake\` (Windows)
//!
//! Patch files are `.toml` or `.json`.
//!
//! # Example
//!
//! ```rust,no_run
//! use subsnake_config::paths;
//!
//! if let Some(path) = paths::find_patch("warm_pad") {
//!     println!("Found patch at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "subsnake";

/// Subdirectory name for patches.
const PATCHES_SUBDIR: &str = "patches";

/// File name of the settings document.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Extensions recognised as patch files, in lookup order.
pub const PATCH_EXTENSIONS: &[&str] = &["toml", "json"];

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific patches directory.
pub fn user_patches_dir() -> PathBuf {
    user_config_dir().join(PATCHES_SUBDIR)
}

/// Default location of the settings file.
pub fn settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}

/// Whether `path` carries a patch file extension.
pub fn is_patch_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PATCH_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Find a patch file by path or name.
///
/// An existing file path is returned as is. Otherwise `name` is looked up
/// in `dir`, first verbatim, then with each of [`PATCH_EXTENSIONS`] appended.
pub fn find_patch_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let direct = dir.join(name);
    if direct.is_file() && is_patch_file(&direct) {
        return Some(direct);
    }

    PATCH_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Find a patch file by path or by name in the user patches directory.
pub fn find_patch(name: &str) -> Option<PathBuf> {
    find_patch_in(&user_patches_dir(), name)
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Ensure the user patches directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_patches_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_patches_dir())
}

/// Ensure the user config directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_config_dir())
}

/// Patch files in `dir`, sorted by path.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_patches_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut patches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_patch_file(path))
        .collect();
    patches.sort();
    patches
}

/// Patch files in the user patches directory.
pub fn list_user_patches() -> Vec<PathBuf> {
    list_patches_in(&user_patches_dir())
}

/// Patch name from a file path (the file stem).
///
/// ```rust
/// use subsnake_config::paths::patch_name_from_path;
/// use std::path::Path;
///
/// let name = patch_name_from_path(Path::new("/path/to/warm_pad.json"));
/// assert_eq!(name, Some("warm_pad".to_string()));
/// ```
pub fn patch_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}
