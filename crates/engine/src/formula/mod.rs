// Formula parsing and evaluation

pub mod parser;
pub mod eval;

pub use eval::{FormulaError, Lookup};
pub use parser::{Formula, Op, Token};
