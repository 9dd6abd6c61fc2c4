use tracing::warn;

use crate::core::{
    NO_NODE,
    strings::{Token, parse_num},
};
use crate::parse::ParseState;
use crate::types::message::Message;

/// Decode a `BO_` line and make it the current message for the `SG_` lines that follow.
/// Accepts both: `BO_ 123 NAME: 8 Node` and `BO_ 123 NAME : 8 Node`.
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    let id: u32 = parse_num(tokens.get(1), "message id")?;
    let name: &str = tokens
        .get(2)
        .and_then(Token::as_word)
        .ok_or("missing message name")?;
    let byte_length: u16 = parse_num(tokens.get(3), "message length")?;
    let transmitter: &str = tokens.get(4).and_then(Token::as_word).unwrap_or(NO_NODE);

    state
        .model
        .add_message(Message::new(id, name, byte_length))
        .map_err(|e| e.to_string())?;
    state.current_message = Some(name.to_string());

    if transmitter != NO_NODE {
        match state.model.node_mut(transmitter) {
            Some(node) => node.add_tx_message(name),
            None => warn!(message = name, node = transmitter, "transmitter is not declared in BU_"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strings::tokenize;
    use crate::types::node::Node;

    #[test]
    fn test_decode() {
        let mut state = ParseState::default();
        state.model.add_node(Node::new("ECU1")).unwrap();

        decode(&mut state, &tokenize("BO_ 100 Speed : 8 ECU1").unwrap()).unwrap();
        let msg = state.model.message("Speed").unwrap();
        assert_eq!((msg.id, msg.byte_length), (100, 8));
        assert_eq!(state.current_message.as_deref(), Some("Speed"));
        assert!(state.model.node("ECU1").unwrap().transmits("Speed"));

        decode(&mut state, &tokenize("BO_ 2147483948 Ext: 64 Vector__XXX").unwrap()).unwrap();
        assert!(state.model.message("Ext").unwrap().is_extended());
    }

    #[test]
    fn test_malformed() {
        let mut state = ParseState::default();
        assert!(decode(&mut state, &tokenize("BO_ x Speed: 8 ECU1").unwrap()).is_err());
        assert!(decode(&mut state, &tokenize("BO_ 1 Speed").unwrap()).is_err());

        decode(&mut state, &tokenize("BO_ 1 A: 8 Vector__XXX").unwrap()).unwrap();
        let err = decode(&mut state, &tokenize("BO_ 1 B: 8 Vector__XXX").unwrap()).unwrap_err();
        assert!(err.contains("already assigned"));
    }
}
