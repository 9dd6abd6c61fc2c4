use tracing::debug;

use crate::core::{attributes::parse_value, strings::Token};
use crate::parse::ParseState;
use crate::types::attributes::{AttributeKind, AttributeValue};

/// Parse `BA_DEF_DEF_ "<AttributeName>" <value>;` and attach the default to every
/// catalog defining that name.
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    let name: &str = tokens
        .get(1)
        .and_then(Token::as_quoted)
        .ok_or("missing attribute name")?;
    let value_token: &Token = tokens.get(2).ok_or("missing default value")?;

    let mut applied: bool = false;
    for kind in AttributeKind::ALL {
        if let Some(definition) = state.model.catalog_mut(kind).get_mut(name) {
            let value: AttributeValue = parse_value(value_token, Some(&*definition))?;
            definition.default = Some(value);
            applied = true;
        }
    }
    if !applied {
        debug!(attribute = name, "default of network attribute skipped");
    }
    Ok(())
}
