use tracing::warn;

use crate::core::{
    NO_NODE,
    strings::{Token, parse_num},
};
use crate::parse::ParseState;

/// Parse `BO_TX_BU_` lines assigning transmit-capable nodes to a message.
/// Example: `BO_TX_BU_ 123 :NodeA,NodeB;`
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    let id: u32 = parse_num(tokens.get(1), "message id")?;

    // take the message name once before the mutable borrow of the nodes
    let Some(message) = state.model.message_by_id(id).map(|m| m.name.clone()) else {
        warn!(message_id = id, "BO_TX_BU_ for unknown message skipped");
        return Ok(());
    };

    for token in tokens.iter().skip(2) {
        let name: &str = token.as_word().ok_or("quoted transmitter name")?;
        if name == NO_NODE {
            continue;
        }
        match state.model.node_mut(name) {
            Some(node) => node.add_tx_message(&message),
            None => warn!(message = %message, node = name, "transmitter is not declared in BU_"),
        }
    }
    Ok(())
}
