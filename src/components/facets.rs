//! XSD constraining facets
//!
//! A restriction step carries an ordered list of facets. Enumeration is
//! exclusive: a restriction that enumerates its values cannot also carry any
//! other facet kind.

use crate::error::{Error, Result, ValidationError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::malformed(format!(
                "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                s
            ))),
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Kind of a constraining facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// Allowed value (one facet per value)
    Enumeration,
    /// Regular expression the literal must match
    Pattern,
    /// Inclusive lower bound
    MinInclusive,
    /// Inclusive upper bound
    MaxInclusive,
    /// Exclusive lower bound
    MinExclusive,
    /// Exclusive upper bound
    MaxExclusive,
    /// Exact length
    Length,
    /// Minimum length
    MinLength,
    /// Maximum length
    MaxLength,
    /// Maximum number of significant digits
    TotalDigits,
    /// Maximum number of fractional digits
    FractionDigits,
    /// White space normalization
    WhiteSpace,
}

impl FacetKind {
    /// Parse from element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "enumeration" => Some(Self::Enumeration),
            "pattern" => Some(Self::Pattern),
            "minInclusive" => Some(Self::MinInclusive),
            "maxInclusive" => Some(Self::MaxInclusive),
            "minExclusive" => Some(Self::MinExclusive),
            "maxExclusive" => Some(Self::MaxExclusive),
            "length" => Some(Self::Length),
            "minLength" => Some(Self::MinLength),
            "maxLength" => Some(Self::MaxLength),
            "totalDigits" => Some(Self::TotalDigits),
            "fractionDigits" => Some(Self::FractionDigits),
            "whiteSpace" => Some(Self::WhiteSpace),
            _ => None,
        }
    }

    /// Get the element local name of this facet
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enumeration => "enumeration",
            Self::Pattern => "pattern",
            Self::MinInclusive => "minInclusive",
            Self::MaxInclusive => "maxInclusive",
            Self::MinExclusive => "minExclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
            Self::WhiteSpace => "whiteSpace",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Constraint {
    /// Compared against the literal value (enumeration and bounds)
    Literal,
    Pattern(Regex),
    Count(usize),
    Digits(u32),
    WhiteSpace(WhiteSpace),
}

/// A single compiled facet
#[derive(Debug, Clone)]
pub struct Facet {
    kind: FacetKind,
    value: String,
    constraint: Constraint,
}

impl Facet {
    /// Compile a facet from its kind and `value` attribute
    pub fn new(kind: FacetKind, value: &str) -> Result<Self> {
        let constraint = match kind {
            FacetKind::Enumeration
            | FacetKind::MinInclusive
            | FacetKind::MaxInclusive
            | FacetKind::MinExclusive
            | FacetKind::MaxExclusive => Constraint::Literal,
            FacetKind::Pattern => Constraint::Pattern(compile_pattern(value)?),
            FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                Constraint::Count(value.trim().parse().map_err(|_| {
                    Error::malformed(format!(
                        "{} value '{}' is not a non-negative integer",
                        kind, value
                    ))
                })?)
            }
            FacetKind::TotalDigits | FacetKind::FractionDigits => {
                let digits: u32 = value.trim().parse().map_err(|_| {
                    Error::malformed(format!(
                        "{} value '{}' is not a non-negative integer",
                        kind, value
                    ))
                })?;
                if kind == FacetKind::TotalDigits && digits == 0 {
                    return Err(Error::malformed("totalDigits must be positive"));
                }
                Constraint::Digits(digits)
            }
            FacetKind::WhiteSpace => Constraint::WhiteSpace(WhiteSpace::from_str(value)?),
        };

        Ok(Self {
            kind,
            value: value.to_string(),
            constraint,
        })
    }

    /// Facet kind
    pub fn kind(&self) -> FacetKind {
        self.kind
    }

    /// Literal `value` attribute
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered facets of one restriction step
#[derive(Debug, Clone, Default)]
pub struct Facets {
    facets: Vec<Facet>,
}

impl Facets {
    /// Create an empty facet list
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collect the facets of one restriction, checking that enumeration is not
    /// combined with any other kind
    pub fn new(facets: Vec<Facet>) -> Result<Self> {
        let has_enumeration = facets.iter().any(|f| f.kind == FacetKind::Enumeration);
        if has_enumeration {
            if let Some(other) = facets.iter().find(|f| f.kind != FacetKind::Enumeration) {
                return Err(Error::malformed(format!(
                    "enumeration cannot be combined with the {} facet in the same restriction",
                    other.kind
                )));
            }
        }
        Ok(Self { facets })
    }

    /// Iterate the facets in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.facets.iter()
    }

    /// Number of facets
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    /// Check if there are no facets
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Enumerated values, in declaration order
    pub fn enumeration(&self) -> Vec<&str> {
        self.facets
            .iter()
            .filter(|f| f.kind == FacetKind::Enumeration)
            .map(|f| f.value.as_str())
            .collect()
    }

    /// Explicit whiteSpace facet, if any
    pub fn white_space(&self) -> Option<WhiteSpace> {
        self.facets.iter().find_map(|f| match f.constraint {
            Constraint::WhiteSpace(ws) => Some(ws),
            _ => None,
        })
    }

    /// Check a normalized literal; `length` is its length in the value space
    /// (characters, or items for list types)
    pub fn check(&self, value: &str, length: usize) -> std::result::Result<(), ValidationError> {
        let enumeration = self.enumeration();
        if !enumeration.is_empty()
            && !enumeration
                .iter()
                .any(|e| *e == value || compare_values(value, e) == Some(Ordering::Equal))
        {
            return Err(ValidationError::new("value is not in the enumeration")
                .with_value(value)
                .with_reason(format!("allowed values: {:?}", enumeration)));
        }

        let mut patterns = self.facets.iter().filter_map(|f| match &f.constraint {
            Constraint::Pattern(regex) => Some((f, regex)),
            _ => None,
        });
        if let Some((first, regex)) = patterns.next() {
            // Patterns of the same step are alternatives
            if !regex.is_match(value) && !patterns.any(|(_, r)| r.is_match(value)) {
                return Err(ValidationError::new(format!(
                    "value does not match pattern '{}'",
                    first.value
                ))
                .with_value(value));
            }
        }

        for facet in &self.facets {
            match (&facet.constraint, facet.kind) {
                (Constraint::Count(n), FacetKind::Length) if length != *n => {
                    return Err(length_error("exactly", *n, length, value));
                }
                (Constraint::Count(n), FacetKind::MinLength) if length < *n => {
                    return Err(length_error("at least", *n, length, value));
                }
                (Constraint::Count(n), FacetKind::MaxLength) if length > *n => {
                    return Err(length_error("at most", *n, length, value));
                }
                (Constraint::Literal, kind) if kind != FacetKind::Enumeration => {
                    check_bound(kind, &facet.value, value)?;
                }
                (Constraint::Digits(n), kind) => check_digits(kind, *n, value)?,
                _ => {}
            }
        }

        Ok(())
    }
}

fn length_error(relation: &str, expected: usize, actual: usize, value: &str) -> ValidationError {
    ValidationError::new(format!("length must be {} {}", relation, expected))
        .with_value(value)
        .with_reason(format!("actual length: {}", actual))
}

fn check_bound(kind: FacetKind, bound: &str, value: &str) -> std::result::Result<(), ValidationError> {
    let ordering = compare_values(value, bound).ok_or_else(|| {
        ValidationError::new(format!("value is not comparable with the {} bound", kind))
            .with_value(value)
    })?;
    let ok = match kind {
        FacetKind::MinInclusive => ordering != Ordering::Less,
        FacetKind::MaxInclusive => ordering != Ordering::Greater,
        FacetKind::MinExclusive => ordering == Ordering::Greater,
        FacetKind::MaxExclusive => ordering == Ordering::Less,
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(format!("value violates {} '{}'", kind, bound)).with_value(value))
    }
}

fn check_digits(kind: FacetKind, limit: u32, value: &str) -> std::result::Result<(), ValidationError> {
    let (total, fraction) = count_digits(value).ok_or_else(|| {
        ValidationError::new(format!("{} applies to decimal values only", kind)).with_value(value)
    })?;
    let actual = if kind == FacetKind::TotalDigits { total } else { fraction };
    if actual > limit {
        Err(ValidationError::new(format!("{} must be at most {}", kind, limit))
            .with_value(value)
            .with_reason(format!("actual: {}", actual)))
    } else {
        Ok(())
    }
}

/// Significant total and fractional digits of a decimal literal
fn count_digits(value: &str) -> Option<(u32, u32)> {
    let unsigned = value.trim_start_matches(['+', '-']);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let int_digits = int_part.trim_start_matches('0').len() as u32;
    let frac_digits = frac_part.trim_end_matches('0').len() as u32;
    Some(((int_digits + frac_digits).max(1), frac_digits))
}

/// Compare two literals in the value space: numerically, then
/// chronologically, then lexically
pub fn compare_values(a: &str, b: &str) -> Option<Ordering> {
    let (a, b) = (a.trim(), b.trim());

    if let (Ok(x), Ok(y)) = (parse_decimal(a), parse_decimal(b)) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (parse_float(a), parse_float(b)) {
        return x.partial_cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        return Some(x.cmp(&y));
    }
    if let (Ok(x), Ok(y)) = (
        NaiveDateTime::parse_from_str(a, "%Y-%m-%dT%H:%M:%S%.f"),
        NaiveDateTime::parse_from_str(b, "%Y-%m-%dT%H:%M:%S%.f"),
    ) {
        return Some(x.cmp(&y));
    }
    if let (Ok(x), Ok(y)) = (
        NaiveDate::parse_from_str(a, "%Y-%m-%d"),
        NaiveDate::parse_from_str(b, "%Y-%m-%d"),
    ) {
        return Some(x.cmp(&y));
    }
    if let (Ok(x), Ok(y)) = (
        NaiveTime::parse_from_str(a, "%H:%M:%S%.f"),
        NaiveTime::parse_from_str(b, "%H:%M:%S%.f"),
    ) {
        return Some(x.cmp(&y));
    }

    Some(a.cmp(b))
}

fn parse_decimal(s: &str) -> std::result::Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s.strip_prefix('+').unwrap_or(s))
}

fn parse_float(s: &str) -> Option<f64> {
    match s {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => None,
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => s.parse().ok(),
    }
}

/// Translate an XSD regular expression into an anchored Rust regex
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let translated = pattern
        .replace(r"\i", "[_:A-Za-z]")
        .replace(r"\I", "[^_:A-Za-z]")
        .replace(r"\c", "[-._:A-Za-z0-9]")
        .replace(r"\C", "[^-._:A-Za-z0-9]");
    Regex::new(&format!("^(?:{})$", translated))
        .map_err(|e| Error::malformed(format!("Invalid pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facets(specs: &[(FacetKind, &str)]) -> Result<Facets> {
        let list = specs
            .iter()
            .map(|(kind, value)| Facet::new(*kind, value))
            .collect::<Result<Vec<_>>>()?;
        Facets::new(list)
    }

    #[test]
    fn test_white_space_normalize() {
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\nc"), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize("  a \t b  "), "a b");
        assert_eq!(WhiteSpace::Preserve.normalize(" a "), " a ");
        assert!(WhiteSpace::from_str("squash").is_err());
    }

    #[test]
    fn test_enumeration() {
        let f = facets(&[(FacetKind::Enumeration, "A"), (FacetKind::Enumeration, "C")]).unwrap();
        assert!(f.check("A", 1).is_ok());
        assert!(f.check("C", 1).is_ok());
        assert!(f.check("B", 1).is_err());
        assert_eq!(f.enumeration(), vec!["A", "C"]);
    }

    #[test]
    fn test_enumeration_is_exclusive() {
        let result = facets(&[(FacetKind::Enumeration, "A"), (FacetKind::Pattern, "[A-Z]")]);
        assert!(matches!(result, Err(Error::MalformedAttribute(_))));
    }

    #[test]
    fn test_patterns_are_anchored_alternatives() {
        let f = facets(&[(FacetKind::Pattern, "[0-9]{3}"), (FacetKind::Pattern, "x+")]).unwrap();
        assert!(f.check("123", 3).is_ok());
        assert!(f.check("xx", 2).is_ok());
        assert!(f.check("1234", 4).is_err());
        assert!(f.check("a123", 4).is_err());
    }

    #[test]
    fn test_length_facets() {
        let f = facets(&[(FacetKind::MinLength, "2"), (FacetKind::MaxLength, "4")]).unwrap();
        assert!(f.check("ab", 2).is_ok());
        assert!(f.check("a", 1).is_err());
        assert!(f.check("abcde", 5).is_err());
        assert!(Facet::new(FacetKind::Length, "two").is_err());
    }

    #[test]
    fn test_numeric_bounds() {
        let f = facets(&[(FacetKind::MinInclusive, "1"), (FacetKind::MaxExclusive, "10.5")]).unwrap();
        assert!(f.check("1", 1).is_ok());
        assert!(f.check("10.4", 4).is_ok());
        assert!(f.check("10.5", 4).is_err());
        assert!(f.check("0.99", 4).is_err());
        assert!(f.check("+5", 2).is_ok());
    }

    #[test]
    fn test_date_bounds() {
        let f = facets(&[(FacetKind::MinInclusive, "2020-01-01")]).unwrap();
        assert!(f.check("2021-06-30", 10).is_ok());
        assert!(f.check("2019-12-31", 10).is_err());
    }

    #[test]
    fn test_digits() {
        let f = facets(&[(FacetKind::TotalDigits, "4"), (FacetKind::FractionDigits, "2")]).unwrap();
        assert!(f.check("12.34", 5).is_ok());
        assert!(f.check("0012.3400", 9).is_ok());
        assert!(f.check("123.4", 5).is_ok());
        assert!(f.check("12345", 5).is_err());
        assert!(f.check("1.234", 5).is_err());
        assert!(Facet::new(FacetKind::TotalDigits, "0").is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            Facet::new(FacetKind::Pattern, "[unclosed"),
            Err(Error::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values("2", "10"), Some(Ordering::Less));
        assert_eq!(compare_values("1.0", "1"), Some(Ordering::Equal));
        assert_eq!(compare_values("1e3", "999"), Some(Ordering::Greater));
        assert_eq!(compare_values("b", "a"), Some(Ordering::Greater));
    }
}
