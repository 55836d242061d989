//! XSD built-in types
//!
//! The built-in primitive and derived datatypes, plus the `anyType` ur-type.
//! Each built-in is compiled once into a shared [`SimpleType`]; looking the
//! same name up twice returns the same `Arc`.

use crate::error::ValidationError;
use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname};
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use url::Url;

use super::attributes::AttributeSet;
use super::complex_types::{ComplexType, ContentModel};
use super::facets::{Facet, FacetKind, Facets, WhiteSpace};
use super::groups::{ElementGrouping, ModelGroup};
use super::particles::Occurs;
use super::schemas::DerivationSet;
use super::simple_types::{SimpleDerivation, SimpleType};
use super::wildcards::{AnyAttribute, AnyElement, NamespaceConstraint, ProcessContents};

type Check = fn(&str) -> Result<(), ValidationError>;

/// Definition of an atomic built-in XSD type
#[derive(Debug, Clone, Copy)]
pub struct BuiltinType {
    /// Type name (local name without namespace)
    pub name: &'static str,
    /// Base type name
    pub base: Option<&'static str>,
    /// White space handling
    pub white_space: WhiteSpace,
    check: Check,
}

impl BuiltinType {
    const fn new(
        name: &'static str,
        base: Option<&'static str>,
        white_space: WhiteSpace,
        check: Check,
    ) -> Self {
        Self {
            name,
            base,
            white_space,
            check,
        }
    }

    /// Check an already normalized literal
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        (self.check)(value)
    }

    /// Check if this type is in the decimal family
    pub fn is_numeric(&self) -> bool {
        let mut current = Some(self.name);
        while let Some(name) = current {
            if matches!(name, "decimal" | "float" | "double") {
                return true;
            }
            current = BUILTINS.iter().find(|b| b.name == name).and_then(|b| b.base);
        }
        false
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name)
    }
}

use WhiteSpace::{Collapse, Preserve, Replace};

/// Atomic built-ins, bases before derived types
const BUILTINS: &[BuiltinType] = &[
    BuiltinType::new("anySimpleType", None, Preserve, accept),
    BuiltinType::new("anyAtomicType", Some("anySimpleType"), Preserve, accept),
    BuiltinType::new("string", Some("anySimpleType"), Preserve, accept),
    BuiltinType::new("normalizedString", Some("string"), Replace, check_normalized_string),
    BuiltinType::new("token", Some("normalizedString"), Collapse, check_token),
    BuiltinType::new("language", Some("token"), Collapse, check_language),
    BuiltinType::new("Name", Some("token"), Collapse, check_name),
    BuiltinType::new("NCName", Some("Name"), Collapse, check_ncname),
    BuiltinType::new("ID", Some("NCName"), Collapse, check_ncname),
    BuiltinType::new("IDREF", Some("NCName"), Collapse, check_ncname),
    BuiltinType::new("ENTITY", Some("NCName"), Collapse, check_ncname),
    BuiltinType::new("NMTOKEN", Some("token"), Collapse, check_nmtoken),
    BuiltinType::new("boolean", Some("anySimpleType"), Collapse, check_boolean),
    BuiltinType::new("decimal", Some("anySimpleType"), Collapse, check_decimal),
    BuiltinType::new("integer", Some("decimal"), Collapse, check_integer),
    BuiltinType::new("long", Some("integer"), Collapse, check_long),
    BuiltinType::new("int", Some("long"), Collapse, check_int),
    BuiltinType::new("short", Some("int"), Collapse, check_short),
    BuiltinType::new("byte", Some("short"), Collapse, check_byte),
    BuiltinType::new("nonNegativeInteger", Some("integer"), Collapse, check_non_negative_integer),
    BuiltinType::new("positiveInteger", Some("nonNegativeInteger"), Collapse, check_positive_integer),
    BuiltinType::new("unsignedLong", Some("nonNegativeInteger"), Collapse, check_unsigned_long),
    BuiltinType::new("unsignedInt", Some("unsignedLong"), Collapse, check_unsigned_int),
    BuiltinType::new("unsignedShort", Some("unsignedInt"), Collapse, check_unsigned_short),
    BuiltinType::new("unsignedByte", Some("unsignedShort"), Collapse, check_unsigned_byte),
    BuiltinType::new("nonPositiveInteger", Some("integer"), Collapse, check_non_positive_integer),
    BuiltinType::new("negativeInteger", Some("nonPositiveInteger"), Collapse, check_negative_integer),
    BuiltinType::new("float", Some("anySimpleType"), Collapse, check_float),
    BuiltinType::new("double", Some("anySimpleType"), Collapse, check_float),
    BuiltinType::new("duration", Some("anySimpleType"), Collapse, check_duration),
    BuiltinType::new("dateTime", Some("anySimpleType"), Collapse, check_date_time),
    BuiltinType::new("time", Some("anySimpleType"), Collapse, check_time),
    BuiltinType::new("date", Some("anySimpleType"), Collapse, check_date),
    BuiltinType::new("gYearMonth", Some("anySimpleType"), Collapse, check_g_year_month),
    BuiltinType::new("gYear", Some("anySimpleType"), Collapse, check_g_year),
    BuiltinType::new("gMonthDay", Some("anySimpleType"), Collapse, check_g_month_day),
    BuiltinType::new("gDay", Some("anySimpleType"), Collapse, check_g_day),
    BuiltinType::new("gMonth", Some("anySimpleType"), Collapse, check_g_month),
    BuiltinType::new("hexBinary", Some("anySimpleType"), Collapse, check_hex_binary),
    BuiltinType::new("base64Binary", Some("anySimpleType"), Collapse, check_base64_binary),
    BuiltinType::new("anyURI", Some("anySimpleType"), Collapse, check_any_uri),
    BuiltinType::new("QName", Some("anySimpleType"), Collapse, check_qname),
    BuiltinType::new("NOTATION", Some("anySimpleType"), Collapse, check_qname),
];

/// Built-in list types and their item type
const LIST_BUILTINS: &[(&str, &str)] = &[
    ("IDREFS", "IDREF"),
    ("ENTITIES", "ENTITY"),
    ("NMTOKENS", "NMTOKEN"),
];

static SIMPLE_TYPES: Lazy<IndexMap<&'static str, Arc<SimpleType>>> = Lazy::new(|| {
    let mut types = IndexMap::new();
    for builtin in BUILTINS {
        let simple = SimpleType {
            name: Some(QName::namespaced(XSD_NAMESPACE, builtin.name)),
            derivation: SimpleDerivation::Builtin(*builtin),
            facets: Facets::empty(),
            white_space: builtin.white_space,
        };
        types.insert(builtin.name, Arc::new(simple));
    }
    for (name, item) in LIST_BUILTINS {
        if let Some(item) = types.get(item).cloned() {
            let mut list = SimpleType::list(Some(QName::namespaced(XSD_NAMESPACE, *name)), item);
            // Built-in lists hold at least one item
            list.facets = Facet::new(FacetKind::MinLength, "1")
                .and_then(|facet| Facets::new(vec![facet]))
                .unwrap_or_default();
            types.insert(*name, Arc::new(list));
        }
    }
    types
});

static ANY_TYPE: Lazy<Arc<ComplexType>> = Lazy::new(|| {
    let wildcard = AnyElement::new(
        NamespaceConstraint::Any,
        ProcessContents::Lax,
        Occurs::zero_or_more(),
    );
    let content = ElementGrouping::Sequence(Arc::new(ModelGroup {
        occurs: Occurs::once(),
        children: vec![ElementGrouping::Any(Arc::new(wildcard))],
    }));

    Arc::new(ComplexType {
        name: Some(QName::namespaced(XSD_NAMESPACE, "anyType")),
        base: None,
        derivation: None,
        is_abstract: false,
        mixed: true,
        block: DerivationSet::default(),
        final_set: DerivationSet::default(),
        attributes: AttributeSet::new(),
        attribute_wildcard: Some(AnyAttribute::new(NamespaceConstraint::Any, ProcessContents::Lax)),
        content: ContentModel::Elements(content),
    })
});

/// Look up a built-in simple type by local name
pub fn builtin_simple_type(local_name: &str) -> Option<Arc<SimpleType>> {
    SIMPLE_TYPES.get(local_name).cloned()
}

/// The `anySimpleType` built-in
pub fn any_simple_type() -> Arc<SimpleType> {
    builtin_simple_type("anySimpleType").unwrap_or_else(|| {
        Arc::new(SimpleType {
            name: Some(QName::namespaced(XSD_NAMESPACE, "anySimpleType")),
            derivation: SimpleDerivation::Builtin(BUILTINS[0]),
            facets: Facets::empty(),
            white_space: Preserve,
        })
    })
}

/// The `anyType` ur-type
pub fn any_type() -> Arc<ComplexType> {
    Arc::clone(&ANY_TYPE)
}

/// Names of all built-in simple types
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    SIMPLE_TYPES.keys().copied()
}

// =============================================================================
// Lexical checks
// =============================================================================

static LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("language regex"));
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("decimal regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer regex"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|-?INF|NaN)$").expect("float regex")
});
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$")
        .expect("duration regex")
});
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,}-\d{2}-\d{2})T(\d{2}:\d{2}:\d{2}(\.\d+)?)(Z|[+-]\d{2}:\d{2})?$")
        .expect("dateTime regex")
});
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,}-\d{2}-\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("date regex")
});
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2}(\.\d+)?)(Z|[+-]\d{2}:\d{2})?$").expect("time regex")
});
static G_YEAR_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{4,}-(0[1-9]|1[0-2])(Z|[+-]\d{2}:\d{2})?$").expect("gYearMonth regex")
});
static G_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$").expect("gYear regex"));
static G_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^--(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])(Z|[+-]\d{2}:\d{2})?$")
        .expect("gMonthDay regex")
});
static G_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^---(0[1-9]|[12]\d|3[01])(Z|[+-]\d{2}:\d{2})?$").expect("gDay regex")
});
static G_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^--(0[1-9]|1[0-2])(Z|[+-]\d{2}:\d{2})?$").expect("gMonth regex")
});

fn invalid(type_name: &str, value: &str) -> ValidationError {
    ValidationError::new(format!("invalid value for {}", type_name)).with_value(value)
}

fn matching(regex: &Regex, type_name: &str, value: &str) -> Result<(), ValidationError> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(invalid(type_name, value))
    }
}

fn accept(_: &str) -> Result<(), ValidationError> {
    Ok(())
}

fn check_normalized_string(value: &str) -> Result<(), ValidationError> {
    if value.contains(['\r', '\n', '\t']) {
        return Err(ValidationError::new(
            "normalizedString cannot contain CR, LF, or TAB characters",
        )
        .with_value(value));
    }
    Ok(())
}

fn check_token(value: &str) -> Result<(), ValidationError> {
    check_normalized_string(value)?;
    if value.starts_with(' ') || value.ends_with(' ') || value.contains("  ") {
        return Err(ValidationError::new(
            "token cannot have leading/trailing spaces or consecutive spaces",
        )
        .with_value(value));
    }
    Ok(())
}

fn check_language(value: &str) -> Result<(), ValidationError> {
    matching(&LANGUAGE, "language", value)
}

fn check_name(value: &str) -> Result<(), ValidationError> {
    if is_valid_name(value) {
        Ok(())
    } else {
        Err(invalid("Name", value))
    }
}

fn check_ncname(value: &str) -> Result<(), ValidationError> {
    if is_valid_ncname(value) {
        Ok(())
    } else {
        Err(invalid("NCName", value))
    }
}

fn check_nmtoken(value: &str) -> Result<(), ValidationError> {
    if is_valid_nmtoken(value) {
        Ok(())
    } else {
        Err(invalid("NMTOKEN", value))
    }
}

fn check_qname(value: &str) -> Result<(), ValidationError> {
    if is_valid_qname(value) {
        Ok(())
    } else {
        Err(invalid("QName", value))
    }
}

fn check_boolean(value: &str) -> Result<(), ValidationError> {
    match value {
        "true" | "false" | "1" | "0" => Ok(()),
        _ => Err(invalid("boolean", value)),
    }
}

fn check_decimal(value: &str) -> Result<(), ValidationError> {
    matching(&DECIMAL, "decimal", value)
}

fn check_integer(value: &str) -> Result<(), ValidationError> {
    matching(&INTEGER, "integer", value)
}

/// Check an integer literal against optional inclusive bounds
fn integer_in(
    type_name: &str,
    value: &str,
    min: Option<i128>,
    max: Option<i128>,
) -> Result<(), ValidationError> {
    check_integer(value).map_err(|_| invalid(type_name, value))?;
    let out_of_range = || {
        ValidationError::new(format!("value out of range for {}", type_name)).with_value(value)
    };
    match value.parse::<i128>() {
        Ok(n) => {
            if min.map_or(false, |min| n < min) || max.map_or(false, |max| n > max) {
                return Err(out_of_range());
            }
        }
        // Too many digits for i128: only an unbounded side can accept it
        Err(_) => {
            let negative = value.starts_with('-');
            if (negative && min.is_some()) || (!negative && max.is_some()) {
                return Err(out_of_range());
            }
        }
    }
    Ok(())
}

fn check_long(value: &str) -> Result<(), ValidationError> {
    integer_in("long", value, Some(i64::MIN as i128), Some(i64::MAX as i128))
}

fn check_int(value: &str) -> Result<(), ValidationError> {
    integer_in("int", value, Some(i32::MIN as i128), Some(i32::MAX as i128))
}

fn check_short(value: &str) -> Result<(), ValidationError> {
    integer_in("short", value, Some(i16::MIN as i128), Some(i16::MAX as i128))
}

fn check_byte(value: &str) -> Result<(), ValidationError> {
    integer_in("byte", value, Some(i8::MIN as i128), Some(i8::MAX as i128))
}

fn check_non_negative_integer(value: &str) -> Result<(), ValidationError> {
    integer_in("nonNegativeInteger", value, Some(0), None)
}

fn check_positive_integer(value: &str) -> Result<(), ValidationError> {
    integer_in("positiveInteger", value, Some(1), None)
}

fn check_unsigned_long(value: &str) -> Result<(), ValidationError> {
    integer_in("unsignedLong", value, Some(0), Some(u64::MAX as i128))
}

fn check_unsigned_int(value: &str) -> Result<(), ValidationError> {
    integer_in("unsignedInt", value, Some(0), Some(u32::MAX as i128))
}

fn check_unsigned_short(value: &str) -> Result<(), ValidationError> {
    integer_in("unsignedShort", value, Some(0), Some(u16::MAX as i128))
}

fn check_unsigned_byte(value: &str) -> Result<(), ValidationError> {
    integer_in("unsignedByte", value, Some(0), Some(u8::MAX as i128))
}

fn check_non_positive_integer(value: &str) -> Result<(), ValidationError> {
    integer_in("nonPositiveInteger", value, None, Some(0))
}

fn check_negative_integer(value: &str) -> Result<(), ValidationError> {
    integer_in("negativeInteger", value, None, Some(-1))
}

fn check_float(value: &str) -> Result<(), ValidationError> {
    matching(&FLOAT, "float", value)
}

fn check_duration(value: &str) -> Result<(), ValidationError> {
    matching(&DURATION, "duration", value)?;
    // At least one component, and no dangling time designator
    if value.ends_with('P') || value.ends_with('T') {
        return Err(invalid("duration", value));
    }
    Ok(())
}

fn check_date_time(value: &str) -> Result<(), ValidationError> {
    let captures = DATE_TIME
        .captures(value)
        .ok_or_else(|| invalid("dateTime", value))?;
    let local = format!("{}T{}", &captures[1], &captures[2]);
    if !local.starts_with('-') && local.len() >= 19 {
        NaiveDateTime::parse_from_str(&local, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| invalid("dateTime", value).with_reason(e.to_string()))?;
    }
    Ok(())
}

fn check_date(value: &str) -> Result<(), ValidationError> {
    let captures = DATE.captures(value).ok_or_else(|| invalid("date", value))?;
    let date = &captures[1];
    if !date.starts_with('-') {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| invalid("date", value).with_reason(e.to_string()))?;
    }
    Ok(())
}

fn check_time(value: &str) -> Result<(), ValidationError> {
    let captures = TIME.captures(value).ok_or_else(|| invalid("time", value))?;
    NaiveTime::parse_from_str(&captures[1], "%H:%M:%S%.f")
        .map_err(|e| invalid("time", value).with_reason(e.to_string()))?;
    Ok(())
}

fn check_g_year_month(value: &str) -> Result<(), ValidationError> {
    matching(&G_YEAR_MONTH, "gYearMonth", value)
}

fn check_g_year(value: &str) -> Result<(), ValidationError> {
    matching(&G_YEAR, "gYear", value)
}

fn check_g_month_day(value: &str) -> Result<(), ValidationError> {
    matching(&G_MONTH_DAY, "gMonthDay", value)
}

fn check_g_day(value: &str) -> Result<(), ValidationError> {
    matching(&G_DAY, "gDay", value)
}

fn check_g_month(value: &str) -> Result<(), ValidationError> {
    matching(&G_MONTH, "gMonth", value)
}

fn check_hex_binary(value: &str) -> Result<(), ValidationError> {
    if value.len() % 2 != 0 {
        return Err(ValidationError::new("hexBinary must have an even number of digits")
            .with_value(value));
    }
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("hexBinary", value));
    }
    Ok(())
}

fn check_base64_binary(value: &str) -> Result<(), ValidationError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(|_| ())
        .map_err(|e| invalid("base64Binary", value).with_reason(e.to_string()))
}

static URI_BASE: Lazy<Option<Url>> = Lazy::new(|| Url::parse("file:///").ok());

fn check_any_uri(value: &str) -> Result<(), ValidationError> {
    if Url::parse(value).is_ok() {
        return Ok(());
    }
    // Relative references are allowed
    match URI_BASE.as_ref().map(|base| base.join(value)) {
        Some(Ok(_)) => Ok(()),
        Some(Err(e)) => Err(invalid("anyURI", value).with_reason(e.to_string())),
        None => Err(invalid("anyURI", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(type_name: &str, value: &str) -> bool {
        builtin_simple_type(type_name)
            .unwrap_or_else(|| panic!("missing built-in {}", type_name))
            .validate(value)
            .is_ok()
    }

    #[test]
    fn test_lookup_is_shared() {
        let a = builtin_simple_type("string").unwrap();
        let b = builtin_simple_type("string").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(builtin_simple_type("nonsense").is_none());
        assert!(Arc::ptr_eq(&any_type(), &any_type()));
    }

    #[test]
    fn test_string_family() {
        assert!(check("string", "  anything\t"));
        assert!(check("token", "  a   b "));
        assert!(check("language", "en-US"));
        assert!(!check("language", "toolonglanguage"));
        assert!(check("NCName", "abc"));
        assert!(!check("NCName", "a:b"));
        assert!(check("NMTOKENS", "a b c"));
        assert!(!check("NMTOKENS", ""));
    }

    #[test]
    fn test_numeric_family() {
        assert!(check("decimal", "-1.50"));
        assert!(!check("decimal", "1e5"));
        assert!(check("integer", "123456789012345678901234567890"));
        assert!(check("byte", "127"));
        assert!(!check("byte", "128"));
        assert!(check("unsignedLong", "18446744073709551615"));
        assert!(!check("unsignedLong", "-1"));
        assert!(!check("positiveInteger", "0"));
        assert!(check("negativeInteger", "-99999999999999999999999999999999999999999"));
        assert!(check("double", "1.5E-3"));
        assert!(check("float", "INF"));
        assert!(check("boolean", "1"));
        assert!(!check("boolean", "yes"));
    }

    #[test]
    fn test_temporal_family() {
        assert!(check("date", "2024-02-29"));
        assert!(!check("date", "2023-02-29"));
        assert!(check("dateTime", "2024-01-01T12:30:00Z"));
        assert!(check("dateTime", "2024-01-01T12:30:00.5+02:00"));
        assert!(!check("dateTime", "2024-01-01 12:30:00"));
        assert!(check("time", "23:59:59"));
        assert!(check("duration", "P1Y2M3DT4H5M6.5S"));
        assert!(!check("duration", "P"));
        assert!(!check("duration", "P1DT"));
        assert!(check("gYearMonth", "2024-12"));
        assert!(check("gMonthDay", "--12-25"));
        assert!(check("gDay", "---01"));
        assert!(check("gMonth", "--07"));
    }

    #[test]
    fn test_binary_and_uri() {
        assert!(check("hexBinary", "0FB7"));
        assert!(!check("hexBinary", "0FB"));
        assert!(check("base64Binary", "SGVsbG8="));
        assert!(!check("base64Binary", "SGVsbG8"));
        assert!(check("anyURI", "http://example.com/a"));
        assert!(check("anyURI", "relative/path.xsd"));
        assert!(check("QName", "xs:string"));
    }

    #[test]
    fn test_any_type_shape() {
        let any = any_type();
        assert!(any.mixed);
        assert_eq!(any.name.as_ref().map(|n| n.local_name.as_str()), Some("anyType"));
        assert!(any.attribute_wildcard.is_some());
        assert_eq!(any.grouping().map(|g| g.to_string()), Some("sequence(any[0..unbounded])".to_string()));
    }

    #[test]
    fn test_is_numeric() {
        let byte = BUILTINS.iter().find(|b| b.name == "byte").unwrap();
        assert!(byte.is_numeric());
        let token = BUILTINS.iter().find(|b| b.name == "token").unwrap();
        assert!(!token.is_numeric());
    }
}
