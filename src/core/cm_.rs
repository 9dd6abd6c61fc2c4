use tracing::{debug, warn};

use crate::core::strings::{Token, parse_num};
use crate::parse::ParseState;

/// Parse a comment statement, in any of its scopes:
/// `CM_ "network";`, `CM_ BU_ <Node> "...";`, `CM_ BO_ <MessageID> "...";`,
/// `CM_ SG_ <MessageID> <SignalName> "...";`
///
/// Multi-line comments reach this function already joined.
pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    let object: &str = match tokens.get(1) {
        Some(Token::Quoted(text)) => {
            state.model.description = text.clone();
            return Ok(());
        }
        Some(Token::Word(object)) => object.as_str(),
        None => return Err("missing comment text".to_string()),
    };

    match object {
        "BU_" => {
            let name: &str = tokens
                .get(2)
                .and_then(Token::as_word)
                .ok_or("missing node name")?;
            let text: String = comment_text(tokens.get(3))?;
            match state.model.node_mut(name) {
                Some(node) => node.description = text,
                None => warn!(node = name, "comment for unknown node skipped"),
            }
        }
        "BO_" => {
            let id: u32 = parse_num(tokens.get(2), "message id")?;
            let text: String = comment_text(tokens.get(3))?;
            match state.model.message_by_id_mut(id) {
                Some(message) => message.description = text,
                None => warn!(message_id = id, "comment for unknown message skipped"),
            }
        }
        "SG_" => {
            let id: u32 = parse_num(tokens.get(2), "message id")?;
            let name: &str = tokens
                .get(3)
                .and_then(Token::as_word)
                .ok_or("missing signal name")?;
            let text: String = comment_text(tokens.get(4))?;
            match state
                .model
                .message_by_id_mut(id)
                .and_then(|m| m.signals.get_mut(name))
            {
                Some(signal) => signal.description = text,
                None => warn!(message_id = id, signal = name, "comment for unknown signal skipped"),
            }
        }
        other => debug!(object = other, "comment on unsupported object skipped"),
    }
    Ok(())
}

fn comment_text(token: Option<&Token>) -> Result<String, String> {
    token
        .and_then(Token::as_quoted)
        .map(str::to_string)
        .ok_or_else(|| "missing comment text".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strings::tokenize;
    use crate::types::{message::Message, node::Node, signal::Signal};

    fn state() -> ParseState {
        let mut state = ParseState::default();
        state.model.add_node(Node::new("ECU1")).unwrap();
        let msg = state.model.add_message(Message::new(100, "Speed", 8)).unwrap();
        msg.add_signal(Signal::new("Value", 0, 16));
        state
    }

    #[test]
    fn test_all_scopes() {
        let mut state = state();
        for line in [
            r#"CM_ "Powertrain network";"#,
            r#"CM_ BU_ ECU1 "Engine controller";"#,
            r#"CM_ BO_ 100 "Vehicle speed";"#,
            "CM_ SG_ 100 Value \"first line\nsecond \\\"quoted\\\" line\";",
        ] {
            decode(&mut state, &tokenize(line).unwrap()).unwrap();
        }
        assert_eq!(state.model.description, "Powertrain network");
        assert_eq!(state.model.node("ECU1").unwrap().description, "Engine controller");
        let msg = state.model.message("Speed").unwrap();
        assert_eq!(msg.description, "Vehicle speed");
        assert_eq!(
            msg.signals["Value"].description,
            "first line\nsecond \"quoted\" line"
        );
    }

    #[test]
    fn test_unknown_targets_are_skipped() {
        let mut state = state();
        decode(&mut state, &tokenize(r#"CM_ SG_ 100 Missing "x";"#).unwrap()).unwrap();
        decode(&mut state, &tokenize(r#"CM_ EV_ Env "x";"#).unwrap()).unwrap();
        assert!(decode(&mut state, &tokenize("CM_ BO_ 100;").unwrap()).is_err());
    }
}
