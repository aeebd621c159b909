//! Layered configuration: global file, then project-local file.

use std::path::{Path, PathBuf};

use convert_core::options::ConversionOptions;

const APP_NAME: &str = "pdf2docx";

/// Project-local config file, looked up in the working directory.
pub const LOCAL_CONFIG: &str = ".pdf2docx.toml";

/// Config files in the order they are applied.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    // ~/.config/pdf2docx/config.toml
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_NAME).join("config.toml"));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

/// Load options from the standard config locations.
pub fn load_config() -> ConversionOptions {
    load_config_from(&config_paths())
}

/// Merge the given TOML files key by key; later files override earlier
/// ones. Missing files are ignored, invalid ones are skipped with a warning.
pub fn load_config_from(paths: &[PathBuf]) -> ConversionOptions {
    let mut merged = toml::Table::new();
    for path in paths {
        if let Some(table) = read_table(path) {
            merged.extend(table);
        }
    }

    match toml::Value::Table(merged).try_into::<ConversionOptions>() {
        Ok(opts) => opts,
        Err(e) => {
            log::warn!("Ignoring configuration: {}", e);
            ConversionOptions::default()
        }
    }
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let contents = std::fs::read_to_string(path).ok()?;
    let table = match contents.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            return None;
        }
    };
    // Reject files whose values don't fit the options, so one bad file
    // doesn't discard the others.
    if let Err(e) = toml::Value::Table(table.clone()).try_into::<ConversionOptions>() {
        log::warn!("Invalid settings in {}: {}", path.display(), e);
        return None;
    }
    log::debug!("Loaded config from {}", path.display());
    Some(table)
}
