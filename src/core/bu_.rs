use crate::core::{NO_NODE, strings::Token};
use crate::parse::ParseState;
use crate::types::node::Node;

/// Decode the BU_ line listing node names and register them in the model.
/// Example: `BU_: ECU1 ECU2 ECU3`
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    for token in tokens.iter().skip(1) {
        let name: &str = token
            .as_word()
            .ok_or_else(|| "quoted node name".to_string())?;
        if name == NO_NODE || state.model.node(name).is_some() {
            continue;
        }
        // creates the node and ignore the reference returned
        let _ = state.model.add_node(Node::new(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strings::tokenize;

    #[test]
    fn test_decode() {
        let mut state = ParseState::default();
        decode(&mut state, &tokenize("BU_: ECU1 ECU2 Vector__XXX ECU1").unwrap()).unwrap();
        let names: Vec<&String> = state.model.nodes.keys().collect();
        assert_eq!(names, vec!["ECU1", "ECU2"]);
    }
}
