//! Error types for the spreadsheet engine.

use thiserror::Error;

use crate::recalc::CycleReport;

/// A formula string that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid formula: {reason}")]
pub struct FormulaFormatError {
    pub reason: String,
}

impl FormulaFormatError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that abort a spreadsheet operation. A failed call leaves the
/// spreadsheet exactly as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpreadsheetError {
    #[error("Invalid cell name: {name:?}")]
    InvalidName { name: String },

    #[error(transparent)]
    InvalidFormula(#[from] FormulaFormatError),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(#[from] CycleReport),
}

pub type Result<T> = std::result::Result<T, SpreadsheetError>;
