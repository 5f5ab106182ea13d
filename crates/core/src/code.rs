// Code shape validation per hierarchy level

use crate::error::{CnaeError, CnaeResult};
use crate::types::Level;

/// Number of digits expected for a numeric level (sections are letters)
fn digit_count(level: Level) -> Option<usize> {
    match level {
        Level::Section => None,
        Level::Division => Some(2),
        Level::Group => Some(3),
        Level::Class => Some(5),
        Level::Subclass => Some(7),
    }
}

/// Human-readable description of the expected code shape
pub fn expected_shape(level: Level) -> &'static str {
    match level {
        Level::Section => "uma letra maiúscula (A-Z)",
        Level::Division => "2 dígitos",
        Level::Group => "3 dígitos",
        Level::Class => "5 dígitos",
        Level::Subclass => "7 dígitos",
    }
}

/// Check that `code` has the exact shape required by `level`.
///
/// No coercion happens here: `"a"` is not a section code and `"0111-3"` is
/// not a class code. Input cleanup belongs to the caller-facing layer.
pub fn validate(level: Level, code: &str) -> CnaeResult<()> {
    let valid = match digit_count(level) {
        None => code.len() == 1 && code.bytes().all(|b| b.is_ascii_uppercase()),
        Some(n) => code.len() == n && code.bytes().all(|b| b.is_ascii_digit()),
    };

    if valid {
        Ok(())
    } else {
        Err(CnaeError::invalid_code(level, code))
    }
}

/// Clean up a user-typed code: trim, drop formatting separators and
/// uppercase letters (`"0111-3/01"` becomes `"0111301"`, `" a "` becomes `"A"`).
pub fn coerce(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '/') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}
