//! XSD particle occurrence bounds
//!
//! Particles (`element`, `group`, `any` and the compositors) carry
//! `minOccurs`/`maxOccurs`. An absent bound is 1; `maxOccurs="unbounded"`
//! maps to [`UNBOUNDED`].
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#p

use crate::error::{Error, Result};
use std::fmt;

/// The unbounded `maxOccurs` sentinel
pub const UNBOUNDED: Option<u32> = None;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: UNBOUNDED }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if maxOccurs is unbounded
    pub fn is_unbounded(&self) -> bool {
        self.max == UNBOUNDED
    }

    /// Check if this is exactly (1, 1)
    pub fn is_once(&self) -> bool {
        *self == Self::once()
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}..{}]", self.min, max),
            None => write!(f, "[{}..unbounded]", self.min),
        }
    }
}

/// Parse minOccurs/maxOccurs from XML attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        occurs.min = min_str.trim().parse::<u32>().map_err(|_| {
            Error::malformed(format!(
                "minOccurs value '{}' is not a valid non-negative integer",
                min_str
            ))
        })?;
    }

    match max_occurs.map(str::trim) {
        Some("unbounded") => occurs.max = UNBOUNDED,
        Some(max_str) => {
            let max = max_str.parse::<u32>().map_err(|_| {
                Error::malformed(format!(
                    "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                    max_str
                ))
            })?;
            if occurs.min > max {
                return Err(Error::malformed(format!(
                    "maxOccurs {} is lesser than minOccurs {}",
                    max, occurs.min
                )));
            }
            occurs.max = Some(max);
        }
        None => {
            // Default maxOccurs is 1, but must be >= minOccurs
            if occurs.min > 1 {
                return Err(Error::malformed(
                    "minOccurs must be lesser or equal than maxOccurs",
                ));
            }
        }
    }

    Ok(occurs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(parse_occurs(Some("0"), None).unwrap(), Occurs::optional());
    }

    #[test]
    fn test_unbounded() {
        let occurs = parse_occurs(Some("0"), Some("unbounded")).unwrap();
        assert_eq!(occurs, Occurs::zero_or_more());
        assert!(occurs.is_unbounded());
        assert_eq!(occurs.max, UNBOUNDED);
        assert_eq!(occurs.to_string(), "[0..unbounded]");
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(
            parse_occurs(Some("-1"), None),
            Err(Error::MalformedAttribute(_))
        ));
        assert!(matches!(
            parse_occurs(None, Some("many")),
            Err(Error::MalformedAttribute(_))
        ));
        assert!(parse_occurs(Some("3"), Some("2")).is_err());
        assert!(parse_occurs(Some("2"), None).is_err());
    }

    proptest! {
        #[test]
        fn finite_bounds_round_trip(min in 0u32..1000, extra in 0u32..1000) {
            let max = min + extra;
            let occurs = parse_occurs(Some(&min.to_string()), Some(&max.to_string())).unwrap();
            prop_assert_eq!(occurs, Occurs::new(min, Some(max)));
            prop_assert!(!occurs.is_unbounded());
        }

        #[test]
        fn garbage_is_rejected(value in "[a-z]{1,8}") {
            prop_assume!(value != "unbounded");
            prop_assert!(parse_occurs(Some(&value), None).is_err());
            prop_assert!(parse_occurs(None, Some(&value)).is_err());
        }
    }
}
