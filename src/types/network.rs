//! Network model: the aggregate root of a CAN network description.
//!
//! Storage is name-keyed and ordered ([`BTreeMap`]): nodes, messages and the three
//! attribute catalogs (node, message, signal scope). Every traversal, validation
//! included, visits entries sorted by name, so the first error reported for a model
//! with several violations is always the same.
//!
//! Validation runs in a fixed phase order: attribute definitions (node, message,
//! signal catalogs), then nodes, then messages with their signals, then the
//! model-wide message id check. A malformed schema is therefore reported before
//! any assignment that refers to it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::types::{
    assignment::AttributeCarrier,
    attributes::{AttributeCatalog, AttributeDefinition, AttributeKind},
    errors::{ModelError, StructuralError, ValidationError},
    message::Message,
    node::Node,
    records::{MessageAttributeRecord, NodeAttributeRecord, SignalAttributeRecord},
};

/// In-memory representation of a CAN network description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    // --- General information ---
    /// Version string (`VERSION`).
    #[serde(default)]
    pub version: String,
    /// Nominal bus speed in bit/s (`BS_`). `0` if not specified.
    #[serde(default)]
    pub bus_speed: u32,
    /// Network comment (`CM_ "..."`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    // --- Main storage ---
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub messages: BTreeMap<String, Message>,

    // --- Attribute Definitions ---
    #[serde(default)]
    pub node_attributes: AttributeCatalog,
    #[serde(default)]
    pub message_attributes: AttributeCatalog,
    #[serde(default)]
    pub signal_attributes: AttributeCatalog,
}

impl NetworkModel {
    // --------- Nodes --------
    /// Adds a node. Fails if a node with the same name exists.
    pub fn add_node(&mut self, node: Node) -> Result<&mut Node, ModelError> {
        if self.nodes.contains_key(&node.name) {
            return Err(ModelError::NodeAlreadyExists { name: node.name });
        }
        Ok(self.nodes.entry(node.name.clone()).or_insert(node))
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Nodes listing `message` among their transmitted messages.
    pub fn transmitters_of<'a>(&'a self, message: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.transmits(message))
    }

    // ------------- Messages ------------
    /// Adds a message. Fails if its name or its id is already used.
    pub fn add_message(&mut self, message: Message) -> Result<&mut Message, ModelError> {
        if self.messages.contains_key(&message.name) {
            return Err(ModelError::MessageAlreadyExists { name: message.name });
        }
        if let Some(existing) = self.message_by_id(message.id) {
            return Err(ModelError::MessageIdAlreadyAssigned {
                id: message.id,
                existing: existing.name.clone(),
            });
        }
        Ok(self.messages.entry(message.name.clone()).or_insert(message))
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.get(name)
    }

    pub fn message_mut(&mut self, name: &str) -> Option<&mut Message> {
        self.messages.get_mut(name)
    }

    /// Returns a `&Message` given the numeric CAN ID.
    pub fn message_by_id(&self, id: u32) -> Option<&Message> {
        self.messages.values().find(|m| m.id == id)
    }

    /// Returns a `&mut Message` given the numeric CAN ID.
    pub fn message_by_id_mut(&mut self, id: u32) -> Option<&mut Message> {
        self.messages.values_mut().find(|m| m.id == id)
    }

    // ------------- Attributes ------------
    /// Registers `definition` as `name` in the catalog matching its kind.
    pub fn define_attribute(
        &mut self,
        name: &str,
        definition: AttributeDefinition,
    ) -> Result<(), ModelError> {
        let kind: AttributeKind = definition.kind();
        let catalog: &mut AttributeCatalog = self.catalog_mut(kind);
        if catalog.contains_key(name) {
            return Err(ModelError::AttributeAlreadyExists {
                name: name.to_string(),
                kind,
            });
        }
        catalog.insert(name.to_string(), definition);
        Ok(())
    }

    pub fn catalog(&self, kind: AttributeKind) -> &AttributeCatalog {
        match kind {
            AttributeKind::Node => &self.node_attributes,
            AttributeKind::Message => &self.message_attributes,
            AttributeKind::Signal => &self.signal_attributes,
        }
    }

    pub fn catalog_mut(&mut self, kind: AttributeKind) -> &mut AttributeCatalog {
        match kind {
            AttributeKind::Node => &mut self.node_attributes,
            AttributeKind::Message => &mut self.message_attributes,
            AttributeKind::Signal => &mut self.signal_attributes,
        }
    }

    // ------------- Validation ------------
    /// Validates the whole model and returns the first error found.
    ///
    /// The only mutation is the scale normalization of signals (`0` becomes `1`),
    /// so running it again on a valid model changes nothing.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        for kind in AttributeKind::ALL {
            let catalog: &AttributeCatalog = self.catalog(kind);
            debug!(%kind, definitions = catalog.len(), "validating attribute definitions");
            for (name, definition) in catalog {
                definition
                    .validate(name, kind)
                    .map_err(|e| e.in_definition(kind, name))?;
            }
        }

        debug!(nodes = self.nodes.len(), "validating nodes");
        for (key, node) in &self.nodes {
            if key != &node.name {
                return Err(StructuralError::KeyMismatch {
                    entity: "node",
                    key: key.clone(),
                    name: node.name.clone(),
                }
                .into());
            }
            node.validate(&self.node_attributes)?;
        }

        debug!(messages = self.messages.len(), "validating messages");
        for (key, message) in self.messages.iter_mut() {
            if key != &message.name {
                return Err(StructuralError::KeyMismatch {
                    entity: "message",
                    key: key.clone(),
                    name: message.name.clone(),
                }
                .into());
            }
            message.validate(&self.message_attributes, &self.signal_attributes)?;
        }

        self.check_message_ids()?;
        Ok(())
    }

    fn check_message_ids(&self) -> Result<(), StructuralError> {
        let mut seen: HashMap<u32, &str> = HashMap::new();
        for message in self.messages.values() {
            if let Some(first) = seen.insert(message.id, &message.name) {
                return Err(StructuralError::DuplicateMessageId {
                    id: message.id,
                    first: first.to_string(),
                    second: message.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Node and signal cross-references that name no existing entity.
    ///
    /// Not part of [`NetworkModel::validate`]: dangling references are allowed in a
    /// valid model (e.g. a receiver node described in another network file).
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling: Vec<DanglingReference> = Vec::new();

        for node in self.nodes.values() {
            for message in &node.tx_messages {
                if !self.messages.contains_key(message) {
                    dangling.push(DanglingReference::TxMessage {
                        node: node.name.clone(),
                        message: message.clone(),
                    });
                }
            }
            for rx in &node.rx_signals {
                let exists = self
                    .message(&rx.message)
                    .is_some_and(|m| m.signal(&rx.signal).is_some());
                if !exists {
                    dangling.push(DanglingReference::RxSignal {
                        node: node.name.clone(),
                        message: rx.message.clone(),
                        signal: rx.signal.clone(),
                    });
                }
            }
        }

        for message in self.messages.values() {
            for signal in message.iter_signals() {
                for receiver in &signal.receivers {
                    if !self.nodes.contains_key(receiver) {
                        dangling.push(DanglingReference::Receiver {
                            message: message.name.clone(),
                            signal: signal.name.clone(),
                            node: receiver.clone(),
                        });
                    }
                }
            }
        }

        dangling
    }

    // ------------- Projections ------------
    /// One record per node attribute assignment.
    pub fn node_assignments(&self) -> Vec<NodeAttributeRecord> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.attributes().iter().map(|(name, value)| NodeAttributeRecord {
                    node: node.name.clone(),
                    attribute: name.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }

    /// One record per message attribute assignment.
    pub fn message_assignments(&self) -> Vec<MessageAttributeRecord> {
        self.messages
            .values()
            .flat_map(|message| {
                message
                    .attributes()
                    .iter()
                    .map(|(name, value)| MessageAttributeRecord {
                        message_id: message.id,
                        attribute: name.clone(),
                        value: value.clone(),
                    })
            })
            .collect()
    }

    /// One record per signal attribute assignment, nested mux signals included.
    pub fn signal_assignments(&self) -> Vec<SignalAttributeRecord> {
        let mut records: Vec<SignalAttributeRecord> = Vec::new();
        for message in self.messages.values() {
            for signal in message.iter_signals() {
                for (name, value) in signal.attributes() {
                    records.push(SignalAttributeRecord {
                        message_id: message.id,
                        signal: signal.name.clone(),
                        attribute: name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        records
    }

    /// Clear the model
    pub fn clear(&mut self) {
        *self = NetworkModel::default();
    }
}

/// A name-based cross-reference with no matching entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DanglingReference {
    /// A node transmits a message that does not exist.
    TxMessage { node: String, message: String },
    /// A node receives a signal that does not exist.
    RxSignal {
        node: String,
        message: String,
        signal: String,
    },
    /// A signal lists a receiver node that does not exist.
    Receiver {
        message: String,
        signal: String,
        node: String,
    },
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingReference::TxMessage { node, message } => {
                write!(f, "node {} transmits unknown message {}", node, message)
            }
            DanglingReference::RxSignal {
                node,
                message,
                signal,
            } => write!(
                f,
                "node {} receives unknown signal {}.{}",
                node, message, signal
            ),
            DanglingReference::Receiver {
                message,
                signal,
                node,
            } => write!(
                f,
                "signal {}.{} is received by unknown node {}",
                message, signal, node
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::attributes::{AttributeDomain, AttributeValue};
    use crate::types::errors::ValidationErrorKind;
    use crate::types::signal::Signal;
    use proptest::prelude::*;

    fn speed_model() -> NetworkModel {
        let mut model = NetworkModel {
            version: "1.0".into(),
            bus_speed: 500_000,
            ..Default::default()
        };
        model.add_node(Node::new("ECU1")).unwrap().add_tx_message("Speed");
        let msg = model.add_message(Message::new(100, "Speed", 8)).unwrap();
        let mut value = Signal::new("Value", 0, 16);
        value.scale = 0.01;
        value.receivers.push("ECU1".into());
        msg.add_signal(value);
        model
    }

    #[test]
    fn test_scenario_plain_model_is_valid() {
        let mut model = speed_model();
        assert!(model.validate().is_ok());
        assert_eq!(model.messages["Speed"].signals["Value"].scale, 0.01);
        assert_eq!(model.transmitters_of("Speed").count(), 1);
    }

    #[test]
    fn test_scenario_message_value_out_of_domain() {
        let mut model = speed_model();
        model
            .define_attribute(
                "Priority",
                AttributeDefinition::new(
                    AttributeKind::Message,
                    AttributeDomain::Int { min: 0, max: 2 },
                ),
            )
            .unwrap();
        model
            .message_mut("Speed")
            .unwrap()
            .assign_attribute("Priority", AttributeValue::Int(5));

        let err = model.validate().unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::AttributeValueOutOfDomain);
        assert!(matches!(
            &err,
            ValidationError::InMessage { name, id: 100, .. } if name == "Speed"
        ));
        assert!(matches!(
            err.root_cause(),
            ValidationError::AttributeValueOutOfDomain { name, .. } if name == "Priority"
        ));
    }

    #[test]
    fn test_scenario_signal_uses_node_only_attribute() {
        let mut model = speed_model();
        model
            .define_attribute(
                "Comment",
                AttributeDefinition::new(AttributeKind::Node, AttributeDomain::String),
            )
            .unwrap();
        model
            .message_mut("Speed")
            .unwrap()
            .signals
            .get_mut("Value")
            .unwrap()
            .assign_attribute("Comment", AttributeValue::Str("x".into()));

        let err = model.validate().unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ValidationError::UnknownAttribute { name, kind: AttributeKind::Signal } if name == "Comment"
        ));
    }

    #[test]
    fn test_scenario_nested_multiplexors() {
        let mut model = NetworkModel::default();
        let msg = model.add_message(Message::new(200, "Muxed", 8)).unwrap();

        let mut deepest = Signal::new("Deepest", 32, 8);
        deepest.mux_switch = Some(3);
        let mut level3 = Signal::new("Level3", 24, 4);
        level3.mux_switch = Some(2);
        level3.mux_group.insert("Deepest".into(), deepest);
        let mut inner_a = Signal::new("A", 8, 4);
        inner_a.mux_switch = Some(0);
        inner_a.mux_group.insert("Level3".into(), level3);
        let mut inner_b = Signal::new("B", 16, 8);
        inner_b.mux_switch = Some(1);
        inner_b.scale = 0.0;
        let mut mode = Signal::new("Mode", 0, 4);
        mode.mux_group.insert("A".into(), inner_a);
        mode.mux_group.insert("B".into(), inner_b);
        msg.add_signal(mode);

        assert!(model.validate().is_ok());
        let mode = &model.messages["Muxed"].signals["Mode"];
        assert!(mode.is_multiplexor());
        assert!(mode.mux_group["A"].is_multiplexor());
        assert!(mode.mux_group["A"].mux_group["Level3"].is_multiplexor());
        assert_eq!(mode.mux_group["B"].scale, 1.0);
    }

    #[test]
    fn test_definitions_are_checked_before_assignments() {
        let mut model = speed_model();
        model
            .define_attribute(
                "SendType",
                AttributeDefinition::new(AttributeKind::Signal, AttributeDomain::Enum(vec![])),
            )
            .unwrap();
        model
            .node_mut("ECU1")
            .unwrap()
            .assign_attribute("Unknown", AttributeValue::Int(1));

        let err = model.validate().unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::InvalidAttributeDefinition);
        assert!(matches!(
            &err,
            ValidationError::InDefinition { kind: AttributeKind::Signal, name, .. } if name == "SendType"
        ));
    }

    #[test]
    fn test_definition_in_wrong_catalog() {
        let mut model = speed_model();
        model.node_attributes.insert(
            "GenMsgCycleTime".into(),
            AttributeDefinition::new(AttributeKind::Message, AttributeDomain::Int { min: 0, max: 0 }),
        );
        assert_eq!(
            model.validate().unwrap_err().kind(),
            ValidationErrorKind::InvalidAttributeDefinition
        );
    }

    #[test]
    fn test_nodes_are_checked_before_messages() {
        let mut model = speed_model();
        model
            .node_mut("ECU1")
            .unwrap()
            .assign_attribute("NodeOnly", AttributeValue::Int(1));
        model
            .message_mut("Speed")
            .unwrap()
            .assign_attribute("MessageOnly", AttributeValue::Int(1));

        assert!(matches!(
            model.validate().unwrap_err(),
            ValidationError::InNode { ref name, .. } if name == "ECU1"
        ));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let mut model = speed_model();
        model
            .message_mut("Speed")
            .unwrap()
            .signals
            .get_mut("Value")
            .unwrap()
            .scale = 0.0;
        assert!(model.validate().is_ok());
        let snapshot = model.clone();
        assert!(model.validate().is_ok());
        assert_eq!(model, snapshot);
        assert_eq!(model.messages["Speed"].signals["Value"].scale, 1.0);
    }

    #[test]
    fn test_duplicate_ids_and_key_mismatch() {
        let mut model = speed_model();
        assert!(matches!(
            model.add_message(Message::new(100, "Other", 8)),
            Err(ModelError::MessageIdAlreadyAssigned { id: 100, .. })
        ));
        assert!(matches!(
            model.add_node(Node::new("ECU1")),
            Err(ModelError::NodeAlreadyExists { .. })
        ));

        model
            .messages
            .insert("Other".into(), Message::new(100, "Other", 8));
        assert!(matches!(
            model.validate().unwrap_err().root_cause(),
            ValidationError::Structural(StructuralError::DuplicateMessageId { id: 100, .. })
        ));

        let mut model = speed_model();
        model.nodes.insert("Alias".into(), Node::new("ECU2"));
        assert!(matches!(
            model.validate().unwrap_err(),
            ValidationError::Structural(StructuralError::KeyMismatch { entity: "node", .. })
        ));
    }

    #[test]
    fn test_define_attribute_routes_by_kind() {
        let mut model = NetworkModel::default();
        let def = AttributeDefinition::new(AttributeKind::Signal, AttributeDomain::String);
        model.define_attribute("SigInfo", def.clone()).unwrap();
        assert!(model.signal_attributes.contains_key("SigInfo"));
        assert!(model.catalog(AttributeKind::Node).is_empty());
        assert!(matches!(
            model.define_attribute("SigInfo", def),
            Err(ModelError::AttributeAlreadyExists { kind: AttributeKind::Signal, .. })
        ));
    }

    #[test]
    fn test_projections() {
        let mut model = speed_model();
        model
            .node_mut("ECU1")
            .unwrap()
            .assign_attribute("NodeLayer", AttributeValue::Int(1));
        let msg = model.message_mut("Speed").unwrap();
        msg.assign_attribute("GenMsgCycleTime", AttributeValue::Int(100));
        let mut inner = Signal::new("Inner", 16, 8);
        inner.mux_switch = Some(1);
        inner.assign_attribute("SigInfo", AttributeValue::Str("nested".into()));
        msg.signals
            .get_mut("Value")
            .unwrap()
            .mux_group
            .insert("Inner".into(), inner);

        assert_eq!(
            model.node_assignments(),
            vec![NodeAttributeRecord {
                node: "ECU1".into(),
                attribute: "NodeLayer".into(),
                value: AttributeValue::Int(1),
            }]
        );
        assert_eq!(
            model.message_assignments(),
            vec![MessageAttributeRecord {
                message_id: 100,
                attribute: "GenMsgCycleTime".into(),
                value: AttributeValue::Int(100),
            }]
        );
        assert_eq!(
            model.signal_assignments(),
            vec![SignalAttributeRecord {
                message_id: 100,
                signal: "Inner".into(),
                attribute: "SigInfo".into(),
                value: AttributeValue::Str("nested".into()),
            }]
        );
    }

    #[test]
    fn test_dangling_references_do_not_fail_validation() {
        let mut model = speed_model();
        let node = model.node_mut("ECU1").unwrap();
        node.add_tx_message("Ghost");
        node.add_rx_signal("Speed", "Missing");
        model
            .message_mut("Speed")
            .unwrap()
            .signals
            .get_mut("Value")
            .unwrap()
            .receivers
            .push("Nobody".into());

        assert!(model.validate().is_ok());
        let dangling = model.dangling_references();
        assert_eq!(dangling.len(), 3);
        assert_eq!(
            dangling[0].to_string(),
            "node ECU1 transmits unknown message Ghost"
        );
        assert!(dangling.contains(&DanglingReference::Receiver {
            message: "Speed".into(),
            signal: "Value".into(),
            node: "Nobody".into(),
        }));
    }

    proptest! {
        #[test]
        fn prop_assignment_validity_matches_catalog(
            max in 0i64..10,
            value in -5i64..15,
            defined in any::<bool>(),
        ) {
            let mut model = speed_model();
            if defined {
                model.define_attribute(
                    "Priority",
                    AttributeDefinition::new(
                        AttributeKind::Message,
                        AttributeDomain::Int { min: 1, max: max.max(1) },
                    ),
                ).unwrap();
            }
            model
                .message_mut("Speed")
                .unwrap()
                .assign_attribute("Priority", AttributeValue::Int(value));

            let in_domain = (1..=max.max(1)).contains(&value);
            match model.validate() {
                Ok(()) => prop_assert!(defined && in_domain),
                Err(e) if !defined => prop_assert_eq!(e.kind(), ValidationErrorKind::UnknownAttribute),
                Err(e) => {
                    prop_assert!(!in_domain);
                    prop_assert_eq!(e.kind(), ValidationErrorKind::AttributeValueOutOfDomain);
                }
            }
        }
    }
}
