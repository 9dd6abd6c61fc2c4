use serde::{Deserialize, Serialize};

use crate::types::{
    assignment::{AttributeAssignment, AttributeCarrier},
    attributes::{AttributeCatalog, AttributeKind},
    errors::ValidationError,
};

/// Name-based reference to a signal of a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalRef {
    /// Message name.
    pub message: String,
    /// Signal name within the message (nested mux signals included).
    pub signal: String,
}

impl SignalRef {
    pub fn new(message: &str, signal: &str) -> Self {
        Self {
            message: message.to_string(),
            signal: signal.to_string(),
        }
    }
}

/// Node/ECU defined in the network description.
///
/// Transmitted messages and received signals are lookup keys into the model,
/// not owned copies; they are not checked for existence by validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node/ECU name.
    pub name: String,
    /// Associated comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Names of the messages transmitted by this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tx_messages: Vec<String>,
    /// Signals read by this node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rx_signals: Vec<SignalRef>,

    // --- Attributes ---
    #[serde(default, skip_serializing_if = "AttributeAssignment::is_empty")]
    pub attributes: AttributeAssignment,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Insert a message name in `tx_messages`. No duplicates.
    pub fn add_tx_message(&mut self, message: &str) {
        if !self.transmits(message) {
            self.tx_messages.push(message.to_string());
        }
    }

    /// Insert a signal reference in `rx_signals`. No duplicates.
    pub fn add_rx_signal(&mut self, message: &str, signal: &str) {
        if !self.receives(message, signal) {
            self.rx_signals.push(SignalRef::new(message, signal));
        }
    }

    pub fn transmits(&self, message: &str) -> bool {
        self.tx_messages.iter().any(|m| m == message)
    }

    pub fn receives(&self, message: &str, signal: &str) -> bool {
        self.rx_signals
            .iter()
            .any(|r| r.message == message && r.signal == signal)
    }

    /// Checks the node's attributes. Referenced messages and signals are validated
    /// once by the model, not here.
    pub fn validate(&self, catalog: &AttributeCatalog) -> Result<(), ValidationError> {
        self.validate_attributes(catalog)
            .map_err(|e| e.in_node(&self.name))
    }

    /// Resets all fields to their default values.
    pub fn clear(&mut self) {
        *self = Node::default();
    }
}

impl AttributeCarrier for Node {
    const KIND: AttributeKind = AttributeKind::Node;

    fn attributes(&self) -> &AttributeAssignment {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeAssignment {
        &mut self.attributes
    }
}
