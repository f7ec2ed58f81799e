// Property-based tests for formulas and the spreadsheet store.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use gridcalc_engine::{CellContent, Formula, Spreadsheet, SpreadsheetError};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn hash_of(f: &Formula) -> u64 {
    let mut hasher = DefaultHasher::new();
    f.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const CELLS: [&str; 5] = ["A1", "A2", "B1", "B2", "C1"];

fn arb_cell() -> impl Strategy<Value = String> {
    proptest::sample::select(CELLS.to_vec()).prop_map(str::to_string)
}

fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        r"[0-9]{1,4}",
        r"[0-9]{1,3}\.[0-9]{1,3}",
        r"[0-9]e[0-9]",
    ]
}

fn arb_atom() -> impl Strategy<Value = String> {
    prop_oneof![2 => arb_literal(), 3 => arb_cell()]
}

/// Well-formed infix expressions over the cell pool.
fn arb_expr() -> impl Strategy<Value = String> {
    arb_atom().prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), proptest::sample::select(vec!["+", "-", "*", "/"]), inner.clone())
                .prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            inner.prop_map(|e| format!("({})", e)),
        ]
    })
}

/// Raw cell input: mostly formulas, some numbers, text and blanks.
fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_expr().prop_map(|e| format!("={}", e)),
        2 => arb_literal(),
        1 => r"[a-z]{1,6}",
        1 => Just(String::new()),
    ]
}

/// Insert random whitespace between characters that are not part of a word.
fn respace(expr: &str, gaps: &[bool]) -> String {
    let mut out = String::new();
    for (i, c) in expr.chars().enumerate() {
        if matches!(c, '+' | '-' | '*' | '/' | '(' | ')') && gaps.get(i).copied().unwrap_or(false) {
            out.push(' ');
            out.push(c);
            out.push(' ');
        } else if c != ' ' {
            out.push(c);
        } else {
            out.push(' ');
        }
    }
    out
}

/// Value of a cell computed from scratch, independent of the store's order.
fn expected_value(sheet: &Spreadsheet, name: &str, depth: usize) -> Option<f64> {
    if depth > CELLS.len() {
        return None;
    }
    match sheet.get_content(name).ok()? {
        CellContent::Number(n) => Some(n),
        CellContent::Text(_) => None,
        CellContent::Formula(f) => f
            .evaluate(&|v: &str| expected_value(sheet, v, depth + 1))
            .ok(),
    }
}

// ---------------------------------------------------------------------------
// Formula properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn whitespace_does_not_change_formula(
        expr in arb_expr(),
        gaps in proptest::collection::vec(any::<bool>(), 64),
    ) {
        let a = Formula::parse(&expr).unwrap();
        let b = Formula::parse(&respace(&expr, &gaps)).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn canonical_text_reparses_equal(expr in arb_expr()) {
        let f = Formula::parse_with(&expr, |v| v.to_lowercase(), |_| true).unwrap();
        let again = Formula::parse_with(&f.to_string(), |v| v.to_lowercase(), |_| true).unwrap();
        prop_assert_eq!(hash_of(&f), hash_of(&again));
        prop_assert_eq!(f, again);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn evaluation_never_panics(expr in arb_expr(), seed in 0.0..100.0f64) {
        let f = Formula::parse(&expr).unwrap();
        let lookup = |v: &str| if v.starts_with('A') { Some(seed) } else { None };
        let _ = f.evaluate(&lookup);
    }
}

// ---------------------------------------------------------------------------
// Store properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn store_matches_fresh_evaluation(
        edits in proptest::collection::vec((arb_cell(), arb_input()), 1..25),
    ) {
        let mut sheet = Spreadsheet::new();
        for (name, raw) in &edits {
            let before = sheet.get_content(name).unwrap();
            let names_before = sheet.all_nonempty_cell_names();
            match sheet.set_content(name, raw) {
                Ok(order) => {
                    prop_assert_eq!(order.first(), Some(name));
                }
                Err(SpreadsheetError::CircularDependency(_)) => {
                    prop_assert_eq!(sheet.get_content(name).unwrap(), before);
                    prop_assert_eq!(sheet.all_nonempty_cell_names(), names_before);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        for name in CELLS {
            let value = sheet.get_value(name).unwrap();
            match expected_value(&sheet, name, 0) {
                // Compare bits so overflow to NaN still matches.
                Some(n) => prop_assert_eq!(value.as_number().map(f64::to_bits), Some(n.to_bits())),
                None => prop_assert!(value.as_number().is_none()),
            }
        }
    }
}
