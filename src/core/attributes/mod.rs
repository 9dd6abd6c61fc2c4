//! Attribute statements: `BA_DEF_`, `BA_DEF_DEF_` and `BA_`.
//!
//! Network-scoped statements (no `BU_`/`BO_`/`SG_` object) and relation attributes are
//! recognised and skipped.

pub(crate) mod ba_;
pub(crate) mod ba_def_;
pub(crate) mod ba_def_def_;

use crate::core::strings::Token;
use crate::types::attributes::{AttributeDefinition, AttributeDomain, AttributeKind, AttributeValue};

/// Maps the DBC object keyword to the entity kind it designates.
pub(crate) fn object_kind(object: &str) -> Option<AttributeKind> {
    AttributeKind::ALL
        .into_iter()
        .find(|kind| kind.dbc_object() == object)
}

/// Converts a value token using the definition of the attribute, when known.
///
/// Enumeration values are written as the index of the label; an index outside the
/// label list is kept as a plain integer so that validation reports it.
pub(crate) fn parse_value(
    token: &Token,
    definition: Option<&AttributeDefinition>,
) -> Result<AttributeValue, String> {
    let domain: Option<&AttributeDomain> = definition.map(|d| &d.domain);
    let word: &str = match (token, domain) {
        (Token::Quoted(s), Some(AttributeDomain::Enum(_))) => {
            return Ok(AttributeValue::Enum(s.clone()));
        }
        (Token::Quoted(s), _) => return Ok(AttributeValue::Str(s.clone())),
        (Token::Word(w), _) => w,
    };

    match domain {
        Some(AttributeDomain::String) => Ok(AttributeValue::Str(word.to_string())),
        Some(AttributeDomain::Enum(labels)) => {
            let index: i64 = word
                .parse()
                .map_err(|_| format!("invalid enumeration index '{}'", word))?;
            Ok(usize::try_from(index)
                .ok()
                .and_then(|i| labels.get(i))
                .map_or(AttributeValue::Int(index), |label| {
                    AttributeValue::Enum(label.clone())
                }))
        }
        Some(AttributeDomain::Hex { .. }) => match parse_hex(word) {
            Some(v) => Ok(AttributeValue::Hex(v)),
            None => parse_untyped(word),
        },
        Some(AttributeDomain::Float { .. }) => match word.parse::<f64>() {
            Ok(v) => Ok(AttributeValue::Float(v)),
            Err(_) => parse_untyped(word),
        },
        Some(AttributeDomain::Int { .. }) | None => parse_untyped(word),
    }
}

/// Decimal as written by DBC tools, `0x` prefix tolerated.
pub(crate) fn parse_hex(word: &str) -> Option<u64> {
    match word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => word.parse::<u64>().ok(),
    }
}

fn parse_untyped(word: &str) -> Result<AttributeValue, String> {
    if let Ok(v) = word.parse::<i64>() {
        return Ok(AttributeValue::Int(v));
    }
    word.parse::<f64>()
        .map(AttributeValue::Float)
        .map_err(|_| format!("invalid attribute value '{}'", word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(domain: AttributeDomain) -> AttributeDefinition {
        AttributeDefinition::new(AttributeKind::Message, domain)
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_enum_index_resolves_label() {
        let send_type = def(AttributeDomain::Enum(vec!["Cyclic".into(), "OnEvent".into()]));
        assert_eq!(
            parse_value(&word("1"), Some(&send_type)),
            Ok(AttributeValue::Enum("OnEvent".into()))
        );
        assert_eq!(
            parse_value(&word("7"), Some(&send_type)),
            Ok(AttributeValue::Int(7))
        );
        assert_eq!(
            parse_value(&Token::Quoted("Cyclic".into()), Some(&send_type)),
            Ok(AttributeValue::Enum("Cyclic".into()))
        );
        assert!(parse_value(&word("x"), Some(&send_type)).is_err());
    }

    #[test]
    fn test_typed_numbers() {
        let hex = def(AttributeDomain::Hex { min: 0, max: 0 });
        assert_eq!(parse_value(&word("255"), Some(&hex)), Ok(AttributeValue::Hex(255)));
        assert_eq!(parse_value(&word("0xFF"), Some(&hex)), Ok(AttributeValue::Hex(255)));

        let float = def(AttributeDomain::Float { min: 0.0, max: 0.0 });
        assert_eq!(parse_value(&word("100"), Some(&float)), Ok(AttributeValue::Float(100.0)));

        assert_eq!(parse_value(&word("-3"), None), Ok(AttributeValue::Int(-3)));
        assert_eq!(parse_value(&word("2.5"), None), Ok(AttributeValue::Float(2.5)));
        assert_eq!(
            parse_value(&Token::Quoted("txt".into()), None),
            Ok(AttributeValue::Str("txt".into()))
        );
        assert!(parse_value(&word("abc"), None).is_err());
    }

    #[test]
    fn test_object_kind() {
        assert_eq!(object_kind("BU_"), Some(AttributeKind::Node));
        assert_eq!(object_kind("SG_"), Some(AttributeKind::Signal));
        assert_eq!(object_kind("EV_"), None);
    }
}
