use tracing::warn;

use crate::core::strings::{Token, parse_num};
use crate::parse::ParseState;
use crate::types::signal::ValueType;

/// Parse `SIG_VALTYPE_ <MessageID> <SignalName> : <code>;`
/// where 1 marks an IEEE float and 2 an IEEE double.
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    let id: u32 = parse_num(tokens.get(1), "message id")?;
    let name: &str = tokens
        .get(2)
        .and_then(Token::as_word)
        .ok_or("missing signal name")?;
    let code: u8 = parse_num(tokens.get(3), "value type")?;

    let value_type: Option<ValueType> = match code {
        0 => None, // integer: sign from SG_ is kept
        1 => Some(ValueType::Float32),
        2 => Some(ValueType::Float64),
        other => return Err(format!("unknown signal value type {}", other)),
    };

    match state
        .model
        .message_by_id_mut(id)
        .and_then(|m| m.signals.get_mut(name))
    {
        Some(signal) => {
            if let Some(value_type) = value_type {
                signal.value_type = value_type;
            }
        }
        None => warn!(message_id = id, signal = name, "SIG_VALTYPE_ for unknown signal skipped"),
    }
    Ok(())
}
