pub mod cell;
pub mod cell_name;
pub mod config;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod recalc;
pub mod spreadsheet;

pub use cell::{CellContent, CellValue};
pub use config::{NameCase, SheetConfig};
pub use error::{FormulaFormatError, Result, SpreadsheetError};
pub use formula::{Formula, FormulaError, Lookup};
pub use recalc::{CycleReport, RecalcReport};
pub use spreadsheet::Spreadsheet;
