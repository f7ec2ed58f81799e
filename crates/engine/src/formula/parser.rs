// Formula parser - converts infix formula text into a validated token sequence
// Supports: non-negative numbers (optional exponent), variables (A1, _x), parentheses,
// and the four operators +, -, *, /. Whitespace only separates tokens.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashSet;

use crate::cell_name::{is_name_continue, is_name_start, is_valid_name};
use crate::error::FormulaFormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    /// `*` and `/` bind tighter than `+` and `-`.
    pub fn is_multiplicative(self) -> bool {
        matches!(self, Op::Mul | Op::Div)
    }
}

/// One token of a canonical formula.
///
/// Numbers hold their parsed value, so `2.0` and `2.00` are the same token.
/// Variables hold their normalized spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Number(OrderedFloat<f64>),
    Variable(String),
    Op(Op),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n.0),
            Token::Variable(name) => f.write_str(name),
            Token::Op(op) => write!(f, "{}", op.symbol()),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

/// A syntactically valid formula in canonical form.
///
/// Two formulas are equal iff their canonical token sequences are equal; the
/// hash is computed from the same sequence. There is no algebraic
/// normalization: `x+y` and `y+x` are different formulas.
#[derive(Debug, Clone)]
pub struct Formula {
    tokens: Vec<Token>,
    /// Normalized variables, deduplicated, in order of first appearance.
    variables: Vec<String>,
}

impl Formula {
    /// Parse with the identity normalizer and a validator that accepts every
    /// variable.
    pub fn parse(text: &str) -> Result<Self, FormulaFormatError> {
        Self::parse_with(text, |v| v.to_string(), |_| true)
    }

    /// Parse `text` as an infix expression.
    ///
    /// Every variable `v` is replaced by `normalize(v)`. Parsing fails if the
    /// normalized spelling is not a legal variable, or if `is_valid` rejects it.
    ///
    /// With an upper-casing normalizer and a validator accepting only one
    /// letter followed by one digit, `x2+y3` succeeds, `x+y3` fails on the
    /// validator, and `2x+y3` fails on syntax.
    pub fn parse_with<N, V>(text: &str, normalize: N, is_valid: V) -> Result<Self, FormulaFormatError>
    where
        N: Fn(&str) -> String,
        V: Fn(&str) -> bool,
    {
        let mut tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(FormulaFormatError::new(
                "The formula is empty; enter a number, variable, or '('",
            ));
        }
        check_grammar(&tokens)?;

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut variables = Vec::new();
        for token in &mut tokens {
            let Token::Variable(raw) = token else {
                continue;
            };
            let normalized = normalize(raw.as_str());
            if !is_valid_name(&normalized) {
                return Err(FormulaFormatError::new(format!(
                    "Variable '{}' normalizes to '{}', which is not a legal variable",
                    raw, normalized
                )));
            }
            if !is_valid(&normalized) {
                return Err(FormulaFormatError::new(format!(
                    "Variable '{}' is not allowed",
                    normalized
                )));
            }
            if seen.insert(normalized.clone()) {
                variables.push(normalized.clone());
            }
            *raw = normalized;
        }

        Ok(Self { tokens, variables })
    }

    /// The canonical token sequence.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Normalized variables, each listed once.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for Formula {}

impl Hash for Formula {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

/// Renders the canonical form without spaces, e.g. `X+Y*2`. Parsing the
/// rendered text with the same normalizer yields an equal formula.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl FromStr for Formula {
    type Err = FormulaFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaFormatError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => { i += 1; }
            '+' => { tokens.push(Token::Op(Op::Add)); i += 1; }
            '-' => { tokens.push(Token::Op(Op::Sub)); i += 1; }
            '*' => { tokens.push(Token::Op(Op::Mul)); i += 1; }
            '/' => { tokens.push(Token::Op(Op::Div)); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_continue(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Variable(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan_number(&chars, i);
                if end == i {
                    return Err(FormulaFormatError::new(format!("Invalid token '{}'", c)));
                }
                let literal: String = chars[i..end].iter().collect();
                let value: f64 = literal.parse().map_err(|_| {
                    FormulaFormatError::new(format!("Invalid number '{}'", literal))
                })?;
                if !value.is_finite() {
                    return Err(FormulaFormatError::new(format!(
                        "Number '{}' is out of range",
                        literal
                    )));
                }
                tokens.push(Token::Number(OrderedFloat(value)));
                i = end;
            }
            _ => {
                // Report the whole run of unrecognized characters.
                let start = i;
                while i < chars.len() && !is_token_boundary(chars[i]) {
                    i += 1;
                }
                let bad: String = chars[start..i].iter().collect();
                return Err(FormulaFormatError::new(format!("Invalid token '{}'", bad)));
            }
        }
    }

    Ok(tokens)
}

/// Parses `text` as a complete non-negative numeric literal, using the same
/// grammar as formula numbers. Leading and trailing whitespace is ignored.
pub fn parse_number_literal(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() || scan_number(&chars, 0) != chars.len() {
        return None;
    }
    let literal: String = chars.into_iter().collect();
    literal.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_token_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')')
}

/// Scan a floating-point literal starting at `start`.
///
/// Grammar: `(\d+\.\d* | \.\d+ | \d+) ([eE][+-]?\d+)?`. Returns the end index,
/// or `start` if no literal begins there. The exponent is only consumed when
/// at least one digit follows it.
fn scan_number(chars: &[char], start: usize) -> usize {
    let digits_from = |mut i: usize| {
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let int_end = digits_from(start);
    let mut end = int_end;
    if end < chars.len() && chars[end] == '.' {
        let frac_end = digits_from(end + 1);
        if int_end == start && frac_end == end + 1 {
            // A lone '.'
            return start;
        }
        end = frac_end;
    }
    if end == start {
        return start;
    }

    if end < chars.len() && matches!(chars[end], 'e' | 'E') {
        let mut exp = end + 1;
        if exp < chars.len() && matches!(chars[exp], '+' | '-') {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    end
}

/// Single left-to-right scan over the token stream.
///
/// Tokens that open a sub-expression (start of formula, `(`, operator) must be
/// followed by a value (`(`, number, variable). Tokens that close a value
/// (`)`, number, variable) must be followed by an operator, `)`, or the end.
/// The running count of `)` may never exceed the count of `(`.
fn check_grammar(tokens: &[Token]) -> Result<(), FormulaFormatError> {
    let mut expect_value = true;
    let mut open = 0usize;
    let mut close = 0usize;

    for token in tokens {
        match token {
            Token::LParen => {
                if !expect_value {
                    return Err(FormulaFormatError::new(
                        "'(' must follow an operator or another '('",
                    ));
                }
                open += 1;
            }
            Token::Number(_) | Token::Variable(_) => {
                if !expect_value {
                    return Err(FormulaFormatError::new(format!(
                        "'{}' must be preceded by an operator or '('",
                        token
                    )));
                }
                expect_value = false;
            }
            Token::Op(op) => {
                if expect_value {
                    return Err(FormulaFormatError::new(format!(
                        "Operator '{}' must follow a number, variable, or ')'",
                        op.symbol()
                    )));
                }
                expect_value = true;
            }
            Token::RParen => {
                if expect_value {
                    return Err(FormulaFormatError::new(
                        "')' must follow a number, variable, or another ')'",
                    ));
                }
                close += 1;
                if close > open {
                    return Err(FormulaFormatError::new(
                        "There are more closing parentheses than opening ones",
                    ));
                }
            }
        }
    }

    if expect_value {
        return Err(FormulaFormatError::new(
            "The formula must end with a number, variable, or ')'",
        ));
    }
    if open != close {
        return Err(FormulaFormatError::new(format!(
            "Unbalanced parentheses: {} '(' but {} ')'",
            open, close
        )));
    }
    Ok(())
}
