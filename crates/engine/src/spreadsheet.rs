//! The spreadsheet store.
//!
//! Owns every nonempty cell and one [`DepGraph`] keyed by cell name. Each
//! content change updates the graph, computes a recalculation order (rejecting
//! the change if it closes a cycle), then re-evaluates the affected formulas
//! in that order.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::cell::{Cell, CellContent, CellValue};
use crate::cell_name::{self, is_valid_name};
use crate::config::{SheetConfig, DEFAULT_VERSION};
use crate::dep_graph::DepGraph;
use crate::error::{Result, SpreadsheetError};
use crate::formula::{FormulaError, Lookup};
use crate::recalc::RecalcReport;

type Validator = Box<dyn Fn(&str) -> bool + Send + Sync>;
type Normalizer = Box<dyn Fn(&str) -> String + Send + Sync>;

pub struct Spreadsheet {
    cells: FxHashMap<String, Cell>,
    dep_graph: DepGraph,
    is_valid: Validator,
    normalize: Normalizer,
    version: String,
    changed: bool,
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Spreadsheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spreadsheet")
            .field("cells", &self.cells.len())
            .field("edges", &self.dep_graph.len())
            .field("version", &self.version)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

impl Spreadsheet {
    /// Empty sheet: names used as typed, every name accepted, version `"default"`.
    pub fn new() -> Self {
        Self::with_rules(|_| true, cell_name::identity, DEFAULT_VERSION)
    }

    /// Empty sheet with a caller-supplied name validator and normalizer.
    ///
    /// Every name (cell argument or formula variable) is first normalized; it
    /// is legal iff the normalized form matches the identifier grammar and
    /// `is_valid` accepts it.
    pub fn with_rules<V, N>(is_valid: V, normalize: N, version: impl Into<String>) -> Self
    where
        V: Fn(&str) -> bool + Send + Sync + 'static,
        N: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            cells: FxHashMap::default(),
            dep_graph: DepGraph::new(),
            is_valid: Box::new(is_valid),
            normalize: Box::new(normalize),
            version: version.into(),
            changed: false,
        }
    }

    pub fn from_config(config: &SheetConfig) -> Self {
        Self::with_rules(|_| true, config.name_case.normalizer(), config.version.clone())
    }

    /// Version tag used when saving and checked when loading.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// True if content was changed since creation or the last [`mark_saved`].
    ///
    /// [`mark_saved`]: Spreadsheet::mark_saved
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Content of `name`; empty text for cells never set.
    pub fn get_content(&self, name: &str) -> Result<CellContent> {
        let name = self.normalize_name(name)?;
        Ok(self
            .cells
            .get(&name)
            .map(|cell| cell.content.clone())
            .unwrap_or_default())
    }

    /// Value of `name`; for formula cells, the last computed value.
    pub fn get_value(&self, name: &str) -> Result<CellValue> {
        let name = self.normalize_name(name)?;
        Ok(self
            .cells
            .get(&name)
            .map(|cell| cell.value.clone())
            .unwrap_or_default())
    }

    /// Names of all cells with nonempty content, sorted.
    pub fn all_nonempty_cell_names(&self) -> BTreeSet<String> {
        self.cells.keys().cloned().collect()
    }

    /// Names whose formulas reference `name` directly, sorted.
    pub fn direct_dependents(&self, name: &str) -> Result<Vec<String>> {
        let name = self.normalize_name(name)?;
        let mut dependents: Vec<String> =
            self.dep_graph.dependents(&name).map(str::to_string).collect();
        dependents.sort_unstable();
        Ok(dependents)
    }

    /// `name` followed by everything that must be re-evaluated when it changes.
    pub fn cells_to_recalculate(&self, name: &str) -> Result<Vec<String>> {
        let name = self.normalize_name(name)?;
        Ok(self.dep_graph.recalc_order(&name)?)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Set the content of `name` from raw user input and recompute.
    ///
    /// Returns `name` followed by every transitive dependent, in the order they
    /// were re-evaluated. On any error the sheet is unchanged.
    pub fn set_content(&mut self, name: &str, raw: &str) -> Result<Vec<String>> {
        self.set_content_with_report(name, raw).map(|report| report.order)
    }

    /// Like [`set_content`](Spreadsheet::set_content), also counting the
    /// formulas re-evaluated and the errors they produced.
    pub fn set_content_with_report(&mut self, name: &str, raw: &str) -> Result<RecalcReport> {
        let name = self.normalize_name(name)?;
        let content = CellContent::parse(raw, &*self.normalize, &*self.is_valid)?;

        let old_dependees: Vec<String> =
            self.dep_graph.dependees(&name).map(str::to_string).collect();
        self.dep_graph.replace_dependees(&name, content.variables());

        let order = match self.dep_graph.recalc_order(&name) {
            Ok(order) => order,
            Err(cycle) => {
                self.dep_graph.replace_dependees(&name, &old_dependees);
                log::warn!("Rejected content for {}: {}", name, cycle);
                return Err(SpreadsheetError::CircularDependency(cycle));
            }
        };

        if content.is_empty() {
            self.cells.remove(&name);
        } else {
            self.cells.insert(name.clone(), Cell::new(content));
        }

        let mut report = RecalcReport::new();
        for cell_name in &order {
            let result = match self.cells.get(cell_name).and_then(|c| c.content.formula()) {
                Some(formula) => formula.evaluate(&SheetLookup { cells: &self.cells }),
                None => continue,
            };
            let value = CellValue::from(result);
            report.cells_recomputed += 1;
            if value.is_error() {
                report.errors += 1;
            }
            if let Some(cell) = self.cells.get_mut(cell_name) {
                cell.value = value;
            }
        }
        report.order = order;

        self.changed = true;
        log::debug!("Set {}: {}", name, report.summary());
        Ok(report)
    }

    fn normalize_name(&self, name: &str) -> Result<String> {
        let normalized = (self.normalize)(name);
        if is_valid_name(&normalized) && (self.is_valid)(&normalized) {
            Ok(normalized)
        } else {
            Err(SpreadsheetError::InvalidName {
                name: name.to_string(),
            })
        }
    }
}

/// Reads the current numeric value of referenced cells.
struct SheetLookup<'a> {
    cells: &'a FxHashMap<String, Cell>,
}

impl Lookup for SheetLookup<'_> {
    fn lookup(&self, name: &str) -> std::result::Result<f64, FormulaError> {
        match self.cells.get(name).map(|cell| &cell.value) {
            Some(CellValue::Number(n)) => Ok(*n),
            Some(CellValue::Text(_)) => Err(FormulaError::NonNumeric(name.to_string())),
            Some(CellValue::Error(_)) => Err(FormulaError::Upstream(name.to_string())),
            None => Err(FormulaError::UndefinedVariable(name.to_string())),
        }
    }
}
