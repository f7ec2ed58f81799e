//! Recalculation types and reporting.
//!
//! This module defines the types used for ordered formula recomputation
//! and cycle detection.

/// Report from recomputing the cells affected by one content change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcReport {
    /// Every affected name in evaluation order: the edited cell first, then
    /// each transitive dependent.
    pub order: Vec<String>,

    /// Number of formula cells that were re-evaluated.
    pub cells_recomputed: usize,

    /// Number of re-evaluated formulas whose value is now an error.
    pub errors: usize,
}

impl RecalcReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Format as a concise one-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} affected, {} recomputed, errors={}",
            self.order.len(),
            self.cells_recomputed,
            self.errors
        )
    }
}

/// Report when cycle detection finds a circular reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cells along the cycle, starting and ending at the same cell for
    /// multi-cell cycles. May be a subset for large cycles.
    pub cells: Vec<String>,

    /// Human-readable description of the cycle.
    pub message: String,
}

impl CycleReport {
    /// Create a new cycle report.
    pub fn new(cells: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            cells,
            message: message.into(),
        }
    }

    /// Create a cycle report for a self-referencing cell.
    pub fn self_reference(cell: &str) -> Self {
        Self {
            cells: vec![cell.to_string()],
            message: format!("Cell {} references itself", cell),
        }
    }

    /// Create a cycle report for a multi-cell cycle.
    pub fn cycle(cells: Vec<String>) -> Self {
        let message = match (cells.first(), cells.last()) {
            (Some(first), Some(last)) if cells.len() > 5 => format!(
                "Circular reference involving {} cells: {} → ... → {}",
                cells.len(),
                first,
                last
            ),
            _ => format!("Circular reference: {}", cells.join(" → ")),
        };
        Self { cells, message }
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CycleReport {}
