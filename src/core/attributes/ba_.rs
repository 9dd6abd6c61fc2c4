use tracing::{debug, warn};

use crate::core::{
    attributes::parse_value,
    strings::{Token, parse_num},
};
use crate::parse::ParseState;
use crate::types::{assignment::AttributeCarrier, attributes::AttributeValue};

pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    // Expected formats:
    // BA_ "NodeLayerModules" BU_ ECU1 "CANoeILNVector.dll";
    // BA_ "GenMsgCycleTime" BO_ 100 100;
    // BA_ "GenSigStartValue" SG_ 100 Speed 0;
    // BA_ "BusType" "CAN";                 network scope, skipped
    let name: &str = tokens
        .get(1)
        .and_then(Token::as_quoted)
        .ok_or("missing attribute name")?;

    match tokens.get(2).and_then(Token::as_word) {
        Some("BU_") => {
            let node_name: &str = tokens
                .get(3)
                .and_then(Token::as_word)
                .ok_or("missing node name")?;
            let value: AttributeValue = parse_value(
                tokens.get(4).ok_or("missing attribute value")?,
                state.model.node_attributes.get(name),
            )?;
            match state.model.node_mut(node_name) {
                Some(node) => {
                    node.assign_attribute(name, value);
                }
                None => warn!(attribute = name, node = node_name, "BA_ for unknown node skipped"),
            }
        }
        Some("BO_") => {
            let id: u32 = parse_num(tokens.get(3), "message id")?;
            let value: AttributeValue = parse_value(
                tokens.get(4).ok_or("missing attribute value")?,
                state.model.message_attributes.get(name),
            )?;
            match state.model.message_by_id_mut(id) {
                Some(message) => {
                    message.assign_attribute(name, value);
                }
                None => warn!(attribute = name, message_id = id, "BA_ for unknown message skipped"),
            }
        }
        Some("SG_") => {
            let id: u32 = parse_num(tokens.get(3), "message id")?;
            let signal_name: &str = tokens
                .get(4)
                .and_then(Token::as_word)
                .ok_or("missing signal name")?;
            let value: AttributeValue = parse_value(
                tokens.get(5).ok_or("missing attribute value")?,
                state.model.signal_attributes.get(name),
            )?;
            match state
                .model
                .message_by_id_mut(id)
                .and_then(|m| m.signals.get_mut(signal_name))
            {
                Some(signal) => {
                    signal.assign_attribute(name, value);
                }
                None => warn!(
                    attribute = name,
                    message_id = id,
                    signal = signal_name,
                    "BA_ for unknown signal skipped"
                ),
            }
        }
        _ => debug!(attribute = name, "network or environment attribute skipped"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strings::tokenize;
    use crate::types::{
        attributes::{AttributeDefinition, AttributeDomain, AttributeKind},
        message::Message,
        node::Node,
        signal::Signal,
    };

    fn state() -> ParseState {
        let mut state = ParseState::default();
        state.model.add_node(Node::new("ECU1")).unwrap();
        let msg = state.model.add_message(Message::new(100, "Speed", 8)).unwrap();
        msg.add_signal(Signal::new("Value", 0, 16));
        state
            .model
            .define_attribute(
                "GenSigSendType",
                AttributeDefinition::new(
                    AttributeKind::Signal,
                    AttributeDomain::Enum(vec!["Cyclic".into(), "OnWrite".into()]),
                ),
            )
            .unwrap();
        state
    }

    #[test]
    fn test_all_objects() {
        let mut state = state();
        for line in [
            r#"BA_ "NodeLayerModules" BU_ ECU1 "CANoeILNVector.dll";"#,
            r#"BA_ "GenMsgCycleTime" BO_ 100 100;"#,
            r#"BA_ "GenSigSendType" SG_ 100 Value 1;"#,
            r#"BA_ "BusType" "CAN";"#,
        ] {
            decode(&mut state, &tokenize(line).unwrap()).unwrap();
        }

        let model = &state.model;
        assert_eq!(
            model.node("ECU1").unwrap().attributes.get("NodeLayerModules"),
            Some(&AttributeValue::Str("CANoeILNVector.dll".into()))
        );
        let msg = model.message("Speed").unwrap();
        assert_eq!(
            msg.attributes.get("GenMsgCycleTime"),
            Some(&AttributeValue::Int(100))
        );
        assert_eq!(
            msg.signals["Value"].attributes.get("GenSigSendType"),
            Some(&AttributeValue::Enum("OnWrite".into()))
        );
    }

    #[test]
    fn test_unknown_targets_and_malformed() {
        let mut state = state();
        decode(&mut state, &tokenize(r#"BA_ "X" BU_ Nobody 1;"#).unwrap()).unwrap();
        decode(&mut state, &tokenize(r#"BA_ "X" SG_ 100 Nothing 1;"#).unwrap()).unwrap();
        assert!(decode(&mut state, &tokenize(r#"BA_ "X" BO_ 100;"#).unwrap()).is_err());
        assert!(decode(&mut state, &tokenize(r#"BA_ X BO_ 100 1;"#).unwrap()).is_err());
    }
}
