use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    assignment::{AttributeAssignment, AttributeCarrier},
    attributes::{AttributeCatalog, AttributeKind},
    errors::{StructuralError, ValidationError},
    signal::Signal,
};

/// Bit 31 of a DBC message id marks an extended (29-bit) frame.
pub const EXTENDED_ID_FLAG: u32 = 0x8000_0000;

/// Largest payload of a CAN FD frame, in bytes.
pub const MAX_BYTE_LENGTH: u16 = 64;

/// CAN message defined in the network description.
///
/// Maintains the numeric ID (`id`), the `name`, payload length (`byte_length`)
/// and the signals composing the payload, keyed by name. Multiplexed signals live
/// inside the mux group of their multiplexor, not at the top level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Numeric CAN ID as written in DBC (extended frames carry [`EXTENDED_ID_FLAG`]).
    pub id: u32,
    /// Message name.
    pub name: String,
    /// Payload length in bytes.
    pub byte_length: u16,
    /// Associated comment (DBC `CM_ BO_` section).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Top-level signals that belong to this message.
    #[serde(default)]
    pub signals: BTreeMap<String, Signal>,

    // --- Message Attribute Entry ---
    #[serde(default, skip_serializing_if = "AttributeAssignment::is_empty")]
    pub attributes: AttributeAssignment,
}

impl Message {
    pub fn new(id: u32, name: &str, byte_length: u16) -> Self {
        Self {
            id,
            name: name.to_string(),
            byte_length,
            ..Default::default()
        }
    }

    /// Adds a top-level signal, replacing any top-level signal with the same name.
    ///
    /// A name already used inside a mux group is not replaced; [`Message::validate`]
    /// reports it as a duplicate.
    pub fn add_signal(&mut self, signal: Signal) -> Option<Signal> {
        self.signals.insert(signal.name.clone(), signal)
    }

    /// Checks the message's own attributes, then the layout and attributes of every signal.
    pub fn validate(
        &mut self,
        message_catalog: &AttributeCatalog,
        signal_catalog: &AttributeCatalog,
    ) -> Result<(), ValidationError> {
        let (name, id) = (self.name.clone(), self.id);
        self.validate_in_place(message_catalog, signal_catalog)
            .map_err(|e| e.in_message(&name, id))
    }

    fn validate_in_place(
        &mut self,
        message_catalog: &AttributeCatalog,
        signal_catalog: &AttributeCatalog,
    ) -> Result<(), ValidationError> {
        self.validate_attributes(message_catalog)?;

        if self.byte_length > MAX_BYTE_LENGTH {
            return Err(StructuralError::MessageTooLong {
                byte_length: self.byte_length,
            }
            .into());
        }

        {
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            for signal in self.iter_signals() {
                if !seen.insert(signal.name.as_str()) {
                    return Err(StructuralError::DuplicateSignalName {
                        message: self.name.clone(),
                        signal: signal.name.clone(),
                    }
                    .into());
                }
            }
        }

        // Next to a multiplexor, a switch value only means something inside its mux group.
        if self.iter_signals().any(Signal::is_multiplexor)
            && let Some(loose) = self.signals.values().find(|s| s.mux_switch.is_some())
        {
            return Err(StructuralError::UnattachedMultiplexedSignal {
                message: self.name.clone(),
                signal: loose.name.clone(),
                switch: loose.mux_switch.unwrap_or_default(),
            }
            .into());
        }

        for (key, signal) in self.signals.iter_mut() {
            if key != &signal.name {
                return Err(StructuralError::KeyMismatch {
                    entity: "signal",
                    key: key.clone(),
                    name: signal.name.clone(),
                }
                .into());
            }
            signal.check_structure(self.byte_length)?;
            signal.validate(signal_catalog)?;
        }
        Ok(())
    }

    /// Returns `true` for 29-bit identifiers.
    pub fn is_extended(&self) -> bool {
        self.id & EXTENDED_ID_FLAG != 0
    }

    /// Identifier without the extended-frame flag.
    pub fn raw_id(&self) -> u32 {
        self.id & !EXTENDED_ID_FLAG
    }

    /// Finds a signal by name anywhere in the message, including nested mux groups.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name).or_else(|| {
            self.signals
                .values()
                .find_map(|top| top.find(name))
        })
    }

    /// Every signal of the message, nested ones included, in pre-order.
    pub fn iter_signals(&self) -> impl Iterator<Item = &Signal> + '_ {
        self.signals.values().flat_map(|s| s.iter_tree())
    }

    /// Resets all fields to their default values.
    pub fn clear(&mut self) {
        *self = Message::default();
    }
}

impl AttributeCarrier for Message {
    const KIND: AttributeKind = AttributeKind::Message;

    fn attributes(&self) -> &AttributeAssignment {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeAssignment {
        &mut self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::attributes::{AttributeDefinition, AttributeDomain, AttributeValue};
    use crate::types::errors::ValidationErrorKind;

    fn priority_catalog() -> AttributeCatalog {
        let mut catalog = AttributeCatalog::new();
        catalog.insert(
            "Priority".into(),
            AttributeDefinition::new(
                AttributeKind::Message,
                AttributeDomain::Int { min: 0, max: 2 },
            ),
        );
        catalog
    }

    #[test]
    fn test_validate_speed_message() {
        let mut msg = Message::new(100, "Speed", 8);
        let mut value = Signal::new("Value", 0, 16);
        value.scale = 0.01;
        msg.add_signal(value);

        let empty = AttributeCatalog::new();
        assert!(msg.validate(&empty, &empty).is_ok());
        assert_eq!(msg.signals["Value"].scale, 0.01);
    }

    #[test]
    fn test_out_of_domain_names_message() {
        let mut msg = Message::new(100, "Speed", 8);
        msg.assign_attribute("Priority", AttributeValue::Int(5));

        let err = msg
            .validate(&priority_catalog(), &AttributeCatalog::new())
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::AttributeValueOutOfDomain);
        assert!(matches!(
            &err,
            ValidationError::InMessage { name, id: 100, .. } if name == "Speed"
        ));
        assert!(err.to_string().contains("'Priority'"));
    }

    #[test]
    fn test_signal_outside_frame() {
        let mut msg = Message::new(0x10, "Short", 1);
        msg.add_signal(Signal::new("TooLong", 4, 8));
        let empty = AttributeCatalog::new();
        let err = msg.validate(&empty, &empty).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::StructuralViolation);
        assert_eq!(
            err.to_string(),
            "message Short (id 16): signal TooLong: out of bounds (Intel): signal end bit 11, message has 8 bits (1 bytes)"
        );
    }

    fn muxed_message() -> Message {
        let mut mode = Signal::new("Mode", 0, 8);
        let mut a = Signal::new("A", 8, 8);
        a.mux_switch = Some(0);
        mode.mux_group.insert("A".into(), a);
        let mut msg = Message::new(0x20, "Muxed", 8);
        msg.add_signal(mode);
        msg
    }

    #[test]
    fn test_duplicate_name_across_mux_tree() {
        let mut msg = muxed_message();
        assert!(msg.add_signal(Signal::new("A", 16, 8)).is_none());
        assert_eq!(msg.iter_signals().filter(|s| s.name == "A").count(), 2);

        let empty = AttributeCatalog::new();
        let err = msg.validate(&empty, &empty).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::StructuralViolation);
        assert!(matches!(
            err.root_cause(),
            ValidationError::Structural(StructuralError::DuplicateSignalName { message, signal })
                if message == "Muxed" && signal == "A"
        ));
    }

    #[test]
    fn test_switch_value_outside_mux_group() {
        let mut msg = muxed_message();
        let mut loose = Signal::new("Loose", 16, 8);
        loose.mux_switch = Some(2);
        msg.add_signal(loose);

        let empty = AttributeCatalog::new();
        let err = msg.validate(&empty, &empty).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::StructuralViolation);
        assert!(matches!(
            err.root_cause(),
            ValidationError::Structural(StructuralError::UnattachedMultiplexedSignal { signal, switch: 2, .. })
                if signal == "Loose"
        ));

        // Without any multiplexor in the message the switch value is left alone.
        let mut plain = Message::new(0x21, "Plain", 8);
        let mut lone = Signal::new("Lone", 0, 8);
        lone.mux_switch = Some(2);
        plain.add_signal(lone);
        assert!(plain.validate(&empty, &empty).is_ok());
    }

    #[test]
    fn test_too_long_message() {
        let mut msg = Message::new(1, "Huge", 65);
        let empty = AttributeCatalog::new();
        assert!(matches!(
            msg.validate(&empty, &empty).unwrap_err().root_cause(),
            ValidationError::Structural(StructuralError::MessageTooLong { byte_length: 65 })
        ));
    }

    #[test]
    fn test_signal_lookup_reaches_nested() {
        let mut mode = Signal::new("Mode", 0, 8);
        let mut inner = Signal::new("Inner", 8, 8);
        inner.mux_switch = Some(1);
        mode.mux_group.insert("Inner".into(), inner);

        let mut msg = Message::new(0x80000123, "Ext", 8);
        msg.add_signal(mode);
        assert!(msg.is_extended());
        assert_eq!(msg.raw_id(), 0x123);
        assert_eq!(msg.signal("Inner").map(|s| s.mux_switch), Some(Some(1)));
        assert_eq!(msg.iter_signals().count(), 2);
        assert!(msg.signal("Missing").is_none());
    }
}
