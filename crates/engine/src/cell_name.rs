//! Cell name grammar.
//!
//! A cell name (and every formula variable) is a letter or underscore followed
//! by any mix of letters, underscores and digits. Names are plain `String`s
//! throughout the engine; this module only owns the syntactic check and the
//! built-in normalizers.

/// Returns true if `name` matches the identifier grammar.
///
/// Only ASCII letters are accepted: `A1`, `_tmp`, `x_2y` are valid,
/// `1A`, `A-1` and the empty string are not.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start(c) => chars.all(is_name_continue),
        _ => false,
    }
}

#[inline]
pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub(crate) fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Identity normalizer.
pub fn identity(name: &str) -> String {
    name.to_string()
}

/// Upper-case normalizer (`a1` -> `A1`).
pub fn to_upper(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Lower-case normalizer (`A1` -> `a1`).
pub fn to_lower(name: &str) -> String {
    name.to_ascii_lowercase()
}
