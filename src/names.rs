//! XML name validation and utilities
//!
//! Declaration names (`name` attributes) must be NCNames; the same checks back
//! the `Name`, `NCName`, `NMTOKEN` and `QName` built-in datatypes.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// Simplified to the BMP ranges that occur in practice
const START_CHARS: &str = r"A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}";
const EXTRA_CHARS: &str = r"\-\.0-9\u{B7}\u{300}-\u{36F}\u{203F}-\u{2040}";

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[{s}][{s}{e}]*$", s = START_CHARS, e = EXTRA_CHARS))
        .expect("NCName pattern is valid")
});

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[:{s}][:{s}{e}]*$", s = START_CHARS, e = EXTRA_CHARS))
        .expect("Name pattern is valid")
});

static NMTOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[:{s}{e}]+$", s = START_CHARS, e = EXTRA_CHARS))
        .expect("NMTOKEN pattern is valid")
});

/// Check if a string is a valid XML Name
pub fn is_valid_name(name: &str) -> bool {
    NAME.is_match(name)
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid NMTOKEN
pub fn is_valid_nmtoken(name: &str) -> bool {
    NMTOKEN.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match split_qname(name) {
        (Some(prefix), local) => is_valid_ncname(prefix) && is_valid_ncname(local),
        (None, local) => is_valid_ncname(local),
    }
}

/// Validate a declaration name and return an error if it is not an NCName
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Error::malformed(format!("'{}' is not a valid NCName", name)))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}
