use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::core::strings::{Token, parse_num};
use crate::parse::ParseState;

/// Parse a VAL_ line that defines the bitmap of a specific signal:
/// `VAL_ <MessageID> <SignalName> <value> "<label>" ... ;`
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    // VAL_ <EnvVarName> ... describes an environment variable
    let Some(Ok(id)) = tokens
        .get(1)
        .and_then(Token::as_word)
        .map(str::parse::<u32>)
    else {
        debug!("value table of environment variable skipped");
        return Ok(());
    };
    let name: &str = tokens
        .get(2)
        .and_then(Token::as_word)
        .ok_or("missing signal name")?;

    // Collect pairs: numeric value followed by quoted label
    let mut bitmap: BTreeMap<String, i64> = BTreeMap::new();
    for pair in tokens.get(3..).unwrap_or_default().chunks(2) {
        let [value, label] = pair else {
            return Err("value without label".to_string());
        };
        let raw: i64 = parse_num(Some(value), "raw value")?;
        let label: &str = label.as_quoted().ok_or("label is not quoted")?;
        bitmap.insert(label.to_string(), raw);
    }

    match state
        .model
        .message_by_id_mut(id)
        .and_then(|m| m.signals.get_mut(name))
    {
        Some(signal) => signal.bitmap = bitmap,
        None => warn!(message_id = id, signal = name, "VAL_ for unknown signal skipped"),
    }
    Ok(())
}
