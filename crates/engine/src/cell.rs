use std::fmt;

use crate::error::FormulaFormatError;
use crate::formula::parser::parse_number_literal;
use crate::formula::{Formula, FormulaError};

/// What the user put in a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Number(f64),
    Text(String),
    Formula(Formula),
}

impl Default for CellContent {
    fn default() -> Self {
        CellContent::Text(String::new())
    }
}

impl CellContent {
    /// Classify raw cell input.
    ///
    /// - `""` is empty text
    /// - a non-negative numeric literal (surrounding whitespace ignored) is a number
    /// - `=expr` parses `expr` as a formula
    /// - anything else is kept verbatim as text
    pub fn parse<N, V>(raw: &str, normalize: N, is_valid: V) -> Result<Self, FormulaFormatError>
    where
        N: Fn(&str) -> String,
        V: Fn(&str) -> bool,
    {
        if raw.is_empty() {
            return Ok(CellContent::default());
        }
        if let Some(expr) = raw.strip_prefix('=') {
            return Formula::parse_with(expr, normalize, is_valid).map(CellContent::Formula);
        }
        if let Some(n) = parse_number_literal(raw) {
            return Ok(CellContent::Number(n));
        }
        Ok(CellContent::Text(raw.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Text(s) if s.is_empty())
    }

    pub fn formula(&self) -> Option<&Formula> {
        match self {
            CellContent::Formula(f) => Some(f),
            _ => None,
        }
    }

    /// Cells this content reads. Empty unless it is a formula.
    pub fn variables(&self) -> &[String] {
        match self {
            CellContent::Formula(f) => f.variables(),
            _ => &[],
        }
    }
}

/// Raw textual form; feeding it back through [`CellContent::parse`] with the
/// same normalizer gives equal content.
impl fmt::Display for CellContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellContent::Number(n) => write!(f, "{}", n),
            CellContent::Text(s) => f.write_str(s),
            CellContent::Formula(formula) => write!(f, "={}", formula),
        }
    }
}

/// The value a cell shows.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Text(String::new())
    }
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

impl From<Result<f64, FormulaError>> for CellValue {
    fn from(result: Result<f64, FormulaError>) -> Self {
        match result {
            Ok(n) => CellValue::Number(n),
            Err(e) => CellValue::Error(e),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "#ERR: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub content: CellContent,
    pub value: CellValue,
}

impl Cell {
    /// Literal content has its value immediately; a formula starts with an
    /// empty value until the store evaluates it.
    pub fn new(content: CellContent) -> Self {
        let value = match &content {
            CellContent::Number(n) => CellValue::Number(*n),
            CellContent::Text(s) => CellValue::Text(s.clone()),
            CellContent::Formula(_) => CellValue::default(),
        };
        Self { content, value }
    }
}
