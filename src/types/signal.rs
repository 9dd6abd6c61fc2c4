use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::message_layout::check_signal_fits;
use crate::types::{
    assignment::{AttributeAssignment, AttributeCarrier},
    attributes::{AttributeCatalog, AttributeKind},
    errors::{StructuralError, ValidationError},
};

/// Definition of a signal within a CAN message.
///
/// Describes position/size, byte order, value type, scaling (scale/offset),
/// physical range, unit, bitmap labels, receiver nodes and, for multiplexors,
/// the group of signals selected by this signal's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name, unique within its message.
    pub name: String,
    /// Associated comment (DBC `CM_ SG_` section).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Multiplexor value selecting this signal. `None` when the signal is always present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mux_switch: Option<u32>,
    /// Bit start in the payload (0-based).
    pub start_bit: u16,
    /// Bit length (1..=64).
    pub size: u16,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub value_type: ValueType,
    /// Unit of measure.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Names of the nodes reading this signal. Not checked for existence by validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<String>,
    /// Scaling factor. `0` is replaced by `1` on validation.
    pub scale: f64,
    pub offset: f64,
    /// Minimum physical value (descriptive only).
    pub min: f64,
    /// Maximum physical value (descriptive only).
    pub max: f64,
    /// Label-to-raw-value mapping (DBC `VAL_`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bitmap: BTreeMap<String, i64>,
    /// Signals selected by this multiplexor, keyed by their name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mux_group: BTreeMap<String, Signal>,

    // --- Signal Attribute Entry ---
    #[serde(default, skip_serializing_if = "AttributeAssignment::is_empty")]
    pub attributes: AttributeAssignment,
}

impl Signal {
    /// Creates an unsigned little-endian signal with identity scaling.
    pub fn new(name: &str, start_bit: u16, size: u16) -> Self {
        Self {
            name: name.to_string(),
            start_bit,
            size,
            scale: 1.0,
            ..Default::default()
        }
    }

    /// Normalizes the scale and checks attributes of this signal and of every
    /// signal nested in its mux group, at any depth.
    pub fn validate(&mut self, catalog: &AttributeCatalog) -> Result<(), ValidationError> {
        if self.scale == 0.0 {
            self.scale = 1.0;
        }

        self.validate_attributes(catalog)
            .map_err(|e| e.in_signal(&self.name))?;

        for child in self.mux_group.values_mut() {
            child
                .validate(catalog)
                .map_err(|e| e.in_signal(&self.name))?;
        }
        Ok(())
    }

    /// Checks size, value type and frame fit of this signal and its nested signals
    /// against a message of `byte_length` bytes. Every signal of a mux group must carry
    /// the multiplexer value selecting it.
    pub fn check_structure(&self, byte_length: u16) -> Result<(), ValidationError> {
        self.check_own_structure(byte_length)
            .map_err(|e| ValidationError::from(e).in_signal(&self.name))?;

        for (key, child) in &self.mux_group {
            if key != &child.name {
                let err = StructuralError::KeyMismatch {
                    entity: "signal",
                    key: key.clone(),
                    name: child.name.clone(),
                };
                return Err(ValidationError::from(err).in_signal(&self.name));
            }
            if child.mux_switch.is_none() {
                let err = StructuralError::MissingMuxSwitch {
                    multiplexor: self.name.clone(),
                    signal: child.name.clone(),
                };
                return Err(ValidationError::from(err).in_signal(&self.name));
            }
            child
                .check_structure(byte_length)
                .map_err(|e| e.in_signal(&self.name))?;
        }
        Ok(())
    }

    fn check_own_structure(&self, byte_length: u16) -> Result<(), StructuralError> {
        if self.size == 0 || self.size > 64 {
            return Err(StructuralError::SignalSize { size: self.size });
        }
        let float_bits: Option<u16> = match self.value_type {
            ValueType::Float32 => Some(32),
            ValueType::Float64 => Some(64),
            _ => None,
        };
        if let Some(bits) = float_bits
            && self.size != bits
        {
            return Err(StructuralError::FloatSize {
                bits,
                size: self.size,
            });
        }
        check_signal_fits(byte_length, self.start_bit, self.size, self.byte_order)?;
        Ok(())
    }

    /// Returns `true` if the signal has bitmap labels.
    pub fn is_bitmap(&self) -> bool {
        !self.bitmap.is_empty()
    }

    /// Returns `true` if the signal selects a non-empty mux group.
    pub fn is_multiplexor(&self) -> bool {
        !self.mux_group.is_empty()
    }

    /// Returns `true` if the signal is selected by a multiplexor value.
    pub fn is_multiplexed(&self) -> bool {
        self.mux_switch.is_some()
    }

    /// Returns `true` if the signal has a description.
    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }

    pub fn is_signed(&self) -> bool {
        !matches!(self.value_type, ValueType::Unsigned)
    }

    fn effective_scale(&self) -> f64 {
        if self.scale == 0.0 { 1.0 } else { self.scale }
    }

    /// `physical = raw * scale + offset`
    pub fn to_physical(&self, raw: i64) -> f64 {
        raw as f64 * self.effective_scale() + self.offset
    }

    /// Inverse of [`Signal::to_physical`], rounded to the nearest raw value.
    pub fn to_raw(&self, physical: f64) -> i64 {
        ((physical - self.offset) / self.effective_scale()).round() as i64
    }

    /// Bitmap label bound to `raw`, if any.
    pub fn label_for(&self, raw: i64) -> Option<&str> {
        self.bitmap
            .iter()
            .find(|(_, value)| **value == raw)
            .map(|(label, _)| label.as_str())
    }

    /// Pre-order walk over this signal and every signal nested in its mux group.
    pub fn iter_tree(&self) -> SignalTree<'_> {
        SignalTree { stack: vec![self] }
    }

    /// Finds `name` in this signal's tree.
    pub fn find(&self, name: &str) -> Option<&Signal> {
        self.iter_tree().find(|s| s.name == name)
    }

    /// Resets all fields to their default values.
    pub fn clear(&mut self) {
        *self = Signal::default();
    }
}

impl AttributeCarrier for Signal {
    const KIND: AttributeKind = AttributeKind::Signal;

    fn attributes(&self) -> &AttributeAssignment {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeAssignment {
        &mut self.attributes
    }
}

/// Iterator returned by [`Signal::iter_tree`].
pub struct SignalTree<'a> {
    stack: Vec<&'a Signal>,
}

impl<'a> Iterator for SignalTree<'a> {
    type Item = &'a Signal;

    fn next(&mut self) -> Option<Self::Item> {
        let current: &Signal = self.stack.pop()?;
        // reversed so children come out in name order
        self.stack.extend(current.mux_group.values().rev());
        Some(current)
    }
}

/// Byte order of a signal (`@1` / `@0` in DBC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Intel, `@1`.
    #[default]
    LittleEndian,
    /// Motorola, `@0`.
    BigEndian,
}

/// Raw value representation: sign (`+`/`-`) plus `SIG_VALTYPE_` for IEEE floats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    Unsigned, // +
    Signed,  // -
    Float32, // SIG_VALTYPE_ = 1
    Float64, // SIG_VALTYPE_ = 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::attributes::{AttributeDefinition, AttributeDomain, AttributeValue};
    use crate::types::errors::ValidationErrorKind;
    use proptest::prelude::*;

    fn mux(name: &str, switch: Option<u32>, children: Vec<Signal>) -> Signal {
        let mut s = Signal::new(name, 0, 4);
        s.mux_switch = switch;
        for child in children {
            s.mux_group.insert(child.name.clone(), child);
        }
        s
    }

    #[test]
    fn test_scale_defaulting() {
        let catalog = AttributeCatalog::new();
        let mut zero = Signal::new("Zero", 0, 8);
        zero.scale = 0.0;
        zero.validate(&catalog).unwrap();
        assert_eq!(zero.scale, 1.0);

        let mut scaled = Signal::new("Scaled", 0, 8);
        scaled.scale = 2.5;
        scaled.validate(&catalog).unwrap();
        assert_eq!(scaled.scale, 2.5);
    }

    #[test]
    fn test_physical_conversion() {
        let mut s = Signal::new("Speed", 0, 16);
        s.scale = 0.01;
        s.offset = -10.0;
        assert!((s.to_physical(2000) - 10.0).abs() < 1e-9);
        assert_eq!(s.to_raw(10.0), 2000);

        s.scale = 0.0;
        assert_eq!(s.to_physical(5), -5.0);
    }

    #[test]
    fn test_bitmap_and_multiplexor_can_coexist() {
        let mut s = mux("Mode", None, vec![Signal::new("A", 8, 8)]);
        s.bitmap.insert("Off".into(), 0);
        s.bitmap.insert("On".into(), 1);
        assert!(s.is_bitmap());
        assert!(s.is_multiplexor());
        assert_eq!(s.label_for(1), Some("On"));
        assert!(s.validate(&AttributeCatalog::new()).is_ok());
    }

    #[test]
    fn test_nested_multiplexors_three_levels() {
        let leaf = mux("Leaf", Some(5), vec![]);
        let level2 = mux("Level2", Some(1), vec![leaf]);
        let inner_a = mux("A", Some(0), vec![level2]);
        let inner_b = mux("B", Some(1), vec![]);
        let mut mode = mux("Mode", None, vec![inner_a, inner_b]);

        assert!(mode.is_multiplexor());
        assert!(mode.mux_group["A"].is_multiplexor());
        assert!(mode.mux_group["A"].mux_group["Level2"].is_multiplexor());
        assert!(!mode.mux_group["B"].is_multiplexor());

        let names: Vec<&str> = mode.iter_tree().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Mode", "A", "Level2", "Leaf", "B"]);
        assert!(mode.find("Leaf").is_some());

        assert!(mode.validate(&AttributeCatalog::new()).is_ok());
        assert!(mode.check_structure(8).is_ok());
    }

    #[test]
    fn test_nested_signal_attribute_error_carries_path() {
        let mut leaf = Signal::new("Leaf", 24, 8);
        leaf.assign_attribute("GenSigStartValue", AttributeValue::Int(7));
        let mut mode = mux("Mode", None, vec![mux("A", Some(0), vec![leaf])]);

        let err = mode.validate(&AttributeCatalog::new()).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::UnknownAttribute);
        assert_eq!(
            err.to_string(),
            "signal Mode: signal A: signal Leaf: attribute 'GenSigStartValue' is not defined for Signal"
        );

        let mut catalog = AttributeCatalog::new();
        catalog.insert(
            "GenSigStartValue".into(),
            AttributeDefinition::new(
                AttributeKind::Signal,
                AttributeDomain::Int { min: 0, max: 10 },
            ),
        );
        assert!(mode.validate(&catalog).is_ok());
    }

    #[test]
    fn test_structure_checks() {
        let s = Signal::new("Wide", 0, 65);
        assert!(matches!(
            s.check_structure(8).unwrap_err().root_cause(),
            ValidationError::Structural(StructuralError::SignalSize { size: 65 })
        ));

        let mut f = Signal::new("Temp", 0, 16);
        f.value_type = ValueType::Float32;
        assert!(matches!(
            f.check_structure(8).unwrap_err().root_cause(),
            ValidationError::Structural(StructuralError::FloatSize { bits: 32, size: 16 })
        ));

        let s = Signal::new("Late", 60, 8);
        assert_eq!(
            s.check_structure(8).unwrap_err().kind(),
            ValidationErrorKind::StructuralViolation
        );

        let mut m = mux("Mode", None, vec![]);
        m.mux_group.insert("Other".into(), mux("A", Some(0), vec![]));
        assert!(matches!(
            m.check_structure(8).unwrap_err().root_cause(),
            ValidationError::Structural(StructuralError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_mux_group_member_needs_switch_value() {
        let mode = mux("Mode", None, vec![Signal::new("A", 8, 8)]);
        let err = mode.check_structure(8).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::StructuralViolation);
        assert!(matches!(
            err.root_cause(),
            ValidationError::Structural(StructuralError::MissingMuxSwitch { multiplexor, signal })
                if multiplexor == "Mode" && signal == "A"
        ));

        let nested = mux("Mode", None, vec![mux("A", Some(0), vec![Signal::new("Deep", 16, 8)])]);
        assert!(matches!(
            nested.check_structure(8).unwrap_err().root_cause(),
            ValidationError::Structural(StructuralError::MissingMuxSwitch { signal, .. }) if signal == "Deep"
        ));
    }

    proptest! {
        #[test]
        fn prop_queries_follow_collection_sizes(
            labels in proptest::collection::btree_map("[A-Za-z_]{1,8}", any::<i64>(), 0..4),
            children in proptest::collection::btree_set("[A-Za-z_]{1,8}", 0..4),
            description in "[a-z ]{0,6}",
        ) {
            let mut s = Signal::new("S", 0, 8);
            s.bitmap = labels.clone();
            s.description = description.clone();
            for name in &children {
                s.mux_group.insert(name.clone(), Signal::new(name, 8, 8));
            }
            prop_assert_eq!(s.is_bitmap(), !labels.is_empty());
            prop_assert_eq!(s.is_multiplexor(), !children.is_empty());
            prop_assert_eq!(s.has_description(), !description.is_empty());
        }

        #[test]
        fn prop_scale_normalization_is_stable(scale in prop_oneof![Just(0.0), -1e6f64..1e6f64]) {
            let catalog = AttributeCatalog::new();
            let mut s = Signal::new("S", 0, 8);
            s.scale = scale;
            s.validate(&catalog).unwrap();
            let once = s.clone();
            s.validate(&catalog).unwrap();
            prop_assert_eq!(&s, &once);
            prop_assert!(s.scale != 0.0);
            if scale != 0.0 {
                prop_assert_eq!(s.scale, scale);
            }
        }
    }
}
