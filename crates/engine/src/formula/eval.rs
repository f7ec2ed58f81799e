// Formula evaluator - evaluates a parsed formula against a variable lookup
// Uses the two-stack (operands, operators) method; never panics.

use thiserror::Error;

use super::parser::{Formula, Op, Token};

/// Why a formula has no numeric value.
///
/// This is a cell *value*, not a failure of any operation. It propagates
/// through dependent formulas as [`FormulaError::Upstream`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Cell {0} does not hold a number")]
    NonNumeric(String),

    #[error("Cell {0} has an error")]
    Upstream(String),

    /// Only reachable from an internally inconsistent token stream.
    #[error("Malformed formula")]
    Malformed,
}

impl FormulaError {
    /// Human-readable reason, as shown for the cell.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Variable resolution for [`Formula::evaluate`].
pub trait Lookup {
    /// Numeric value of `name`, or the reason there is none.
    fn lookup(&self, name: &str) -> Result<f64, FormulaError>;
}

/// Plain closures: `None` means the variable is unknown.
impl<F> Lookup for F
where
    F: Fn(&str) -> Option<f64>,
{
    fn lookup(&self, name: &str) -> Result<f64, FormulaError> {
        self(name).ok_or_else(|| FormulaError::UndefinedVariable(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Op(Op),
    LParen,
}

impl Formula {
    /// Evaluate with conventional precedence (`*` `/` over `+` `-`,
    /// left-to-right within a level, parentheses override).
    ///
    /// The first lookup failure or division by zero becomes the result.
    pub fn evaluate<L: Lookup + ?Sized>(&self, lookup: &L) -> Result<f64, FormulaError> {
        let mut values: Vec<f64> = Vec::new();
        let mut ops: Vec<Pending> = Vec::new();

        for token in self.tokens() {
            match token {
                Token::Number(n) => push_value(&mut values, &mut ops, n.0)?,
                Token::Variable(name) => {
                    let n = lookup.lookup(name)?;
                    push_value(&mut values, &mut ops, n)?;
                }
                Token::Op(op) if op.is_multiplicative() => ops.push(Pending::Op(*op)),
                Token::Op(op) => {
                    reduce_additive(&mut values, &mut ops)?;
                    ops.push(Pending::Op(*op));
                }
                Token::LParen => ops.push(Pending::LParen),
                Token::RParen => {
                    reduce_additive(&mut values, &mut ops)?;
                    let Some(Pending::LParen) = ops.pop() else {
                        return Err(FormulaError::Malformed);
                    };
                    // The parenthesized group is now a single operand.
                    reduce_multiplicative(&mut values, &mut ops)?;
                }
            }
        }

        reduce_additive(&mut values, &mut ops)?;
        match (values.pop(), values.is_empty(), ops.is_empty()) {
            (Some(result), true, true) => Ok(result),
            _ => Err(FormulaError::Malformed),
        }
    }
}

fn push_value(values: &mut Vec<f64>, ops: &mut Vec<Pending>, n: f64) -> Result<(), FormulaError> {
    values.push(n);
    reduce_multiplicative(values, ops)
}

/// If a `*` or `/` is waiting, apply it to the top two operands.
fn reduce_multiplicative(values: &mut Vec<f64>, ops: &mut Vec<Pending>) -> Result<(), FormulaError> {
    if let Some(Pending::Op(op)) = ops.last().copied() {
        if op.is_multiplicative() {
            ops.pop();
            apply_top(values, op)?;
        }
    }
    Ok(())
}

/// If a `+` or `-` is waiting, apply it to the top two operands.
fn reduce_additive(values: &mut Vec<f64>, ops: &mut Vec<Pending>) -> Result<(), FormulaError> {
    if let Some(Pending::Op(op)) = ops.last().copied() {
        if !op.is_multiplicative() {
            ops.pop();
            apply_top(values, op)?;
        }
    }
    Ok(())
}

fn apply_top(values: &mut Vec<f64>, op: Op) -> Result<(), FormulaError> {
    let (Some(right), Some(left)) = (values.pop(), values.pop()) else {
        return Err(FormulaError::Malformed);
    };
    values.push(apply(op, left, right)?);
    Ok(())
}

fn apply(op: Op, left: f64, right: f64) -> Result<f64, FormulaError> {
    match op {
        Op::Add => Ok(left + right),
        Op::Sub => Ok(left - right),
        Op::Mul => Ok(left * right),
        Op::Div if right == 0.0 => Err(FormulaError::DivisionByZero),
        Op::Div => Ok(left / right),
    }
}
