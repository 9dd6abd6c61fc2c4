use crate::core::strings::{Token, parse_num};
use crate::parse::ParseState;

/// Decode the bus speed line. The speed is optional and any BTR values after it are ignored.
/// Examples: `BS_:` and `BS_: 500000 : 12,34`
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    if tokens.len() > 1 {
        state.model.bus_speed = parse_num(tokens.get(1), "bus speed")?;
    }
    Ok(())
}
