use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::types::errors::ValidationError;

/// Attribute definitions of one entity kind, keyed by attribute name.
pub type AttributeCatalog = BTreeMap<String, AttributeDefinition>;

/// The kind of entity an attribute definition applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeKind {
    Node,
    Message,
    Signal,
}

impl AttributeKind {
    /// Every kind, in validation order.
    pub const ALL: [AttributeKind; 3] = [
        AttributeKind::Node,
        AttributeKind::Message,
        AttributeKind::Signal,
    ];

    /// Object keyword used by DBC attribute statements (`BU_`, `BO_`, `SG_`).
    pub fn dbc_object(&self) -> &'static str {
        match self {
            AttributeKind::Node => "BU_",
            AttributeKind::Message => "BO_",
            AttributeKind::Signal => "SG_",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeKind::Node => "Node",
            AttributeKind::Message => "Message",
            AttributeKind::Signal => "Signal",
        })
    }
}

/// Set of values an attribute accepts.
///
/// Numeric ranges follow the DBC convention: a `0..0` range places no restriction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeDomain {
    String,
    Int { min: i64, max: i64 },
    Hex { min: u64, max: u64 },
    Float { min: f64, max: f64 },
    Enum(Vec<String>),
}

impl AttributeDomain {
    /// Checks that the domain is internally consistent, returning the reason when it is not.
    pub fn check_consistency(&self) -> Result<(), String> {
        match self {
            AttributeDomain::String => Ok(()),
            AttributeDomain::Int { min, max } => check_bounds(min, max),
            AttributeDomain::Hex { min, max } => check_bounds(min, max),
            AttributeDomain::Float { min, max } => {
                if min.is_nan() || max.is_nan() {
                    return Err("range bound is NaN".to_string());
                }
                check_bounds(min, max)
            }
            AttributeDomain::Enum(labels) => {
                if labels.is_empty() {
                    return Err("enumeration has no values".to_string());
                }
                let mut seen: BTreeSet<&str> = BTreeSet::new();
                for label in labels {
                    if !seen.insert(label.as_str()) {
                        return Err(format!("enumeration value \"{}\" is repeated", label));
                    }
                }
                Ok(())
            }
        }
    }

    /// Returns `true` if `value` belongs to this domain.
    ///
    /// Each domain accepts only its own value variant (`Float` for FLOAT, `Hex` for HEX,
    /// `Enum` for ENUM), so a value keeps its variant when written to DBC and read back.
    pub fn contains(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (AttributeDomain::String, AttributeValue::Str(_)) => true,
            (AttributeDomain::Int { min, max }, AttributeValue::Int(v)) => in_range(*v, *min, *max),
            (AttributeDomain::Hex { min, max }, AttributeValue::Hex(v)) => in_range(*v, *min, *max),
            (AttributeDomain::Float { min, max }, AttributeValue::Float(v)) => {
                v.is_finite() && in_range(*v, *min, *max)
            }
            (AttributeDomain::Enum(labels), AttributeValue::Enum(label)) => {
                labels.iter().any(|l| l == label)
            }
            _ => false,
        }
    }

    /// Position of `label` within an enumeration domain.
    pub fn enum_index(&self, label: &str) -> Option<usize> {
        match self {
            AttributeDomain::Enum(labels) => labels.iter().position(|l| l == label),
            _ => None,
        }
    }
}

fn check_bounds<T: PartialOrd + fmt::Display>(min: &T, max: &T) -> Result<(), String> {
    if min > max {
        Err(format!("minimum {} is greater than maximum {}", min, max))
    } else {
        Ok(())
    }
}

fn in_range<T: PartialOrd + Default>(value: T, min: T, max: T) -> bool {
    let unbounded = min == T::default() && max == T::default();
    unbounded || (min <= value && value <= max)
}

impl fmt::Display for AttributeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDomain::String => write!(f, "STRING"),
            AttributeDomain::Int { min, max } => write!(f, "INT {} {}", min, max),
            AttributeDomain::Hex { min, max } => write!(f, "HEX 0x{:X} 0x{:X}", min, max),
            AttributeDomain::Float { min, max } => {
                write!(f, "FLOAT {} {}", compact_f64(*min), compact_f64(*max))
            }
            AttributeDomain::Enum(labels) => {
                let joined: Vec<String> = labels.iter().map(|l| format!("\"{}\"", l)).collect();
                write!(f, "ENUM {}", joined.join(", "))
            }
        }
    }
}

/// Concrete attribute value stored on Node/Message/Signal entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Hex(u64), // memorize as a number, proper display later.
    Float(f64),
    Enum(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "\"{}\"", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Hex(h) => write!(f, "0x{:X}", h),
            AttributeValue::Float(x) => write!(f, "{}", compact_f64(*x)),
            AttributeValue::Enum(s) => write!(f, "{}", s),
        }
    }
}

/// Prints a float without superfluous trailing zeros.
pub(crate) fn compact_f64(value: f64) -> String {
    let mut s: String = format!("{}", value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// Named, kind-scoped attribute schema entry (DBC `BA_DEF_` plus its `BA_DEF_DEF_` default).
///
/// The name is the key under which the definition is stored in its [`AttributeCatalog`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Entity kind the attribute applies to. Fixed at creation.
    kind: AttributeKind,
    /// Accepted values.
    pub domain: AttributeDomain,
    /// Value assumed by entities without an explicit assignment.
    pub default: Option<AttributeValue>,
}

impl AttributeDefinition {
    pub fn new(kind: AttributeKind, domain: AttributeDomain) -> Self {
        Self {
            kind,
            domain,
            default: None,
        }
    }

    pub fn with_default(mut self, default: AttributeValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Checks the definition registered as `name` in the catalog of `expected_kind`.
    pub fn validate(&self, name: &str, expected_kind: AttributeKind) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidAttributeDefinition {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("attribute name is empty".to_string()));
        }
        if self.kind != expected_kind {
            return Err(invalid(format!(
                "declared for {} but registered in the {} catalog",
                self.kind, expected_kind
            )));
        }
        self.domain.check_consistency().map_err(invalid)?;
        if let Some(default) = &self.default
            && !self.domain.contains(default)
        {
            return Err(invalid(format!(
                "default {} is outside {}",
                default, self.domain
            )));
        }
        Ok(())
    }

    /// Checks that `value`, assigned to attribute `name`, lies in this definition's domain.
    pub fn check_value(&self, name: &str, value: &AttributeValue) -> Result<(), ValidationError> {
        if self.domain.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::AttributeValueOutOfDomain {
                name: name.to_string(),
                value: value.to_string(),
                domain: self.domain.to_string(),
            })
        }
    }
}
