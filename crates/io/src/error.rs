//! Errors from reading or writing spreadsheet and configuration files.

use gridcalc_engine::SpreadsheetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed spreadsheet file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Version mismatch: expected {expected:?}, found {found:?}")]
    VersionMismatch { expected: String, found: String },

    /// A saved cell was rejected when replayed into the spreadsheet.
    #[error("Cell {name}: {source}")]
    Cell {
        name: String,
        source: SpreadsheetError,
    },
}

pub type Result<T> = std::result::Result<T, PersistError>;
