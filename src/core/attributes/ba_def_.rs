use tracing::debug;

use crate::core::{
    attributes::object_kind,
    strings::{Token, parse_num},
};
use crate::parse::ParseState;
use crate::types::attributes::{AttributeDefinition, AttributeDomain, AttributeKind};

pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    // Expected formats:
    // BA_DEF_ BU_  "NodeLayerModules" STRING;
    // BA_DEF_ BO_  "GenMsgCycleTime" INT 0 65535;
    // BA_DEF_ SG_  "GenSigMissingSourceValue" HEX 0 2147483647;
    // BA_DEF_ SG_  "SigDelay" FLOAT 0.0 100.0;
    // BA_DEF_ SG_  "GenSigSwitchedByIgnition" ENUM "No", "Yes";
    // BA_DEF_  "BusType" STRING;          network scope, skipped
    let kind: AttributeKind = match tokens.get(1) {
        Some(Token::Word(object)) => match object_kind(object) {
            Some(kind) => kind,
            None => {
                debug!(object = %object, "attribute definition for unsupported object skipped");
                return Ok(());
            }
        },
        Some(Token::Quoted(name)) => {
            debug!(attribute = %name, "network attribute definition skipped");
            return Ok(());
        }
        None => return Err("missing attribute name".to_string()),
    };

    let name: &str = tokens
        .get(2)
        .and_then(Token::as_quoted)
        .ok_or("missing attribute name")?;
    let value_type: &str = tokens
        .get(3)
        .and_then(Token::as_word)
        .ok_or("missing attribute value type")?;

    let domain: AttributeDomain = match value_type {
        "STRING" => AttributeDomain::String,
        "INT" => AttributeDomain::Int {
            min: parse_num(tokens.get(4), "INT minimum")?,
            max: parse_num(tokens.get(5), "INT maximum")?,
        },
        "HEX" => AttributeDomain::Hex {
            min: parse_num(tokens.get(4), "HEX minimum")?,
            max: parse_num(tokens.get(5), "HEX maximum")?,
        },
        "FLOAT" => AttributeDomain::Float {
            min: parse_num(tokens.get(4), "FLOAT minimum")?,
            max: parse_num(tokens.get(5), "FLOAT maximum")?,
        },
        "ENUM" => AttributeDomain::Enum(
            tokens
                .iter()
                .skip(4)
                .map(|t| match t {
                    Token::Quoted(label) | Token::Word(label) => label.clone(),
                })
                .collect(),
        ),
        other => return Err(format!("unknown attribute value type '{}'", other)),
    };

    state
        .model
        .define_attribute(name, AttributeDefinition::new(kind, domain))
        .map_err(|e| e.to_string())
}
