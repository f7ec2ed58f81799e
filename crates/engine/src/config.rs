// Spreadsheet settings
// Deserialized by gridcalc-io from config.toml; every field has a default.

use serde::{Deserialize, Serialize};

use crate::cell_name;

/// Case folding applied to cell names and formula variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCase {
    /// Names are used exactly as typed (default)
    #[default]
    Preserve,
    /// `a1` and `A1` both become `A1`
    Upper,
    /// `a1` and `A1` both become `a1`
    Lower,
}

impl NameCase {
    pub fn normalizer(self) -> fn(&str) -> String {
        match self {
            NameCase::Preserve => cell_name::identity,
            NameCase::Upper => cell_name::to_upper,
            NameCase::Lower => cell_name::to_lower,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Version tag written to and checked against saved files
    pub version: String,

    pub name_case: NameCase,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            name_case: NameCase::Preserve,
        }
    }
}

pub const DEFAULT_VERSION: &str = "default";
