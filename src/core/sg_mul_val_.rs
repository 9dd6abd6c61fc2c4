use tracing::warn;

use crate::core::strings::{Token, parse_num};
use crate::parse::ParseState;

/// Parse an extended multiplexing line naming the switch of a multiplexed signal:
/// `SG_MUL_VAL_ <MessageID> <SignalName> <SwitchName> <from>-<to>, ...;`
///
/// Only the parent link is kept. The selector value comes from the signal's `mX` tag.
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    let id: u32 = parse_num(tokens.get(1), "message id")?;
    let signal: &str = tokens
        .get(2)
        .and_then(Token::as_word)
        .ok_or("missing signal name")?;
    let switch: &str = tokens
        .get(3)
        .and_then(Token::as_word)
        .ok_or("missing multiplexer switch name")?;

    let Some(message) = state.model.message_by_id(id).map(|m| m.name.clone()) else {
        warn!(message_id = id, "SG_MUL_VAL_ for unknown message skipped");
        return Ok(());
    };
    state
        .mux_parents
        .entry(message)
        .or_default()
        .insert(signal.to_string(), switch.to_string());
    Ok(())
}
