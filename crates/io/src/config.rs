// Spreadsheet configuration file
// Loaded from ~/.config/gridcalc/config.toml
//
//   version = "default"
//   name_case = "upper"    # preserve | upper | lower

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gridcalc_engine::SheetConfig;

use crate::error::{PersistError, Result};

/// `<config dir>/gridcalc/config.toml`, or `./gridcalc/config.toml` when the
/// platform has no config directory.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gridcalc")
        .join("config.toml")
}

pub fn load(path: &Path) -> Result<SheetConfig> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Load from the default location, falling back to defaults if there is no file.
pub fn load_or_default() -> Result<SheetConfig> {
    load_or_default_from(&default_path())
}

pub fn load_or_default_from(path: &Path) -> Result<SheetConfig> {
    match load(path) {
        Err(PersistError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(SheetConfig::default())
        }
        other => other,
    }
}
