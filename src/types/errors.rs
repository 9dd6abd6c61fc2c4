use std::io;
use thiserror::Error;

use crate::types::attributes::AttributeKind;

/// Errors produced while validating a [`NetworkModel`](crate::types::network::NetworkModel).
///
/// The first four variants form the validation taxonomy. The `In*` variants wrap an inner
/// error with the identity of the entity where it was found; use [`ValidationError::root_cause`]
/// or [`ValidationError::kind`] to look through them. A wrapper prints the inner error as part
/// of its own message and does not expose it again through `source()`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid attribute definition '{name}': {reason}")]
    InvalidAttributeDefinition { name: String, reason: String },
    #[error("attribute '{name}' is not defined for {kind}")]
    UnknownAttribute { name: String, kind: AttributeKind },
    #[error("value {value} is outside the domain of attribute '{name}' ({domain})")]
    AttributeValueOutOfDomain {
        name: String,
        value: String,
        domain: String,
    },
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("{kind} attribute {name}: {inner}")]
    InDefinition {
        kind: AttributeKind,
        name: String,
        inner: Box<ValidationError>,
    },
    #[error("node {name}: {inner}")]
    InNode {
        name: String,
        inner: Box<ValidationError>,
    },
    #[error("message {name} (id {id}): {inner}")]
    InMessage {
        name: String,
        id: u32,
        inner: Box<ValidationError>,
    },
    #[error("signal {name}: {inner}")]
    InSignal {
        name: String,
        inner: Box<ValidationError>,
    },
}

/// Flat classification of a [`ValidationError`], ignoring context wrappers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationErrorKind {
    InvalidAttributeDefinition,
    UnknownAttribute,
    AttributeValueOutOfDomain,
    StructuralViolation,
}

impl ValidationError {
    /// Innermost error, with every context wrapper removed.
    pub fn root_cause(&self) -> &ValidationError {
        let mut current: &ValidationError = self;
        loop {
            match current {
                ValidationError::InDefinition { inner, .. }
                | ValidationError::InNode { inner, .. }
                | ValidationError::InMessage { inner, .. }
                | ValidationError::InSignal { inner, .. } => current = &**inner,
                _ => return current,
            }
        }
    }

    pub fn kind(&self) -> ValidationErrorKind {
        match self.root_cause() {
            ValidationError::InvalidAttributeDefinition { .. } => {
                ValidationErrorKind::InvalidAttributeDefinition
            }
            ValidationError::UnknownAttribute { .. } => ValidationErrorKind::UnknownAttribute,
            ValidationError::AttributeValueOutOfDomain { .. } => {
                ValidationErrorKind::AttributeValueOutOfDomain
            }
            _ => ValidationErrorKind::StructuralViolation,
        }
    }

    pub(crate) fn in_definition(self, kind: AttributeKind, name: &str) -> Self {
        ValidationError::InDefinition {
            kind,
            name: name.to_string(),
            inner: Box::new(self),
        }
    }

    pub(crate) fn in_node(self, name: &str) -> Self {
        ValidationError::InNode {
            name: name.to_string(),
            inner: Box::new(self),
        }
    }

    pub(crate) fn in_message(self, name: &str, id: u32) -> Self {
        ValidationError::InMessage {
            name: name.to_string(),
            id,
            inner: Box::new(self),
        }
    }

    pub(crate) fn in_signal(self, name: &str) -> Self {
        ValidationError::InSignal {
            name: name.to_string(),
            inner: Box::new(self),
        }
    }
}

/// Violations of the structural invariants of the entity graph.
#[derive(Debug, Error)]
pub enum StructuralError {
    #[error("message id {id} is used by both '{first}' and '{second}'")]
    DuplicateMessageId {
        id: u32,
        first: String,
        second: String,
    },
    #[error("{entity} stored under key '{key}' is named '{name}'")]
    KeyMismatch {
        entity: &'static str,
        key: String,
        name: String,
    },
    #[error("signal size {size} is outside 1..=64")]
    SignalSize { size: u16 },
    #[error("IEEE {bits}-bit float signal must be {bits} bits long, found {size}")]
    FloatSize { bits: u16, size: u16 },
    #[error("message byte length {byte_length} exceeds 64")]
    MessageTooLong { byte_length: u16 },
    #[error("signal name '{signal}' is used more than once in message '{message}'")]
    DuplicateSignalName { message: String, signal: String },
    #[error("signal '{signal}' in the mux group of '{multiplexor}' has no multiplexer value")]
    MissingMuxSwitch { multiplexor: String, signal: String },
    #[error("top-level signal '{signal}' has multiplexer value {switch} but message '{message}' has a multiplexor")]
    UnattachedMultiplexedSignal {
        message: String,
        signal: String,
        switch: u32,
    },
    #[error(transparent)]
    Layout(#[from] MessageLayoutError),
}

/// Errors produced while verifying that a signal fits a CAN frame layout.
#[derive(Debug, Error)]
pub enum MessageLayoutError {
    #[error("signal bit length cannot be zero")]
    ZeroBitLength,
    #[error(
        "out of bounds (Intel): signal end bit {end}, message has {total_bits} bits ({dlc} bytes)"
    )]
    IntelOutOfBounds {
        end: usize,
        total_bits: usize,
        dlc: u16,
    },
    #[error(
        "out of bounds (Motorola): linearized start bit {start}, message has {total_bits} bits ({dlc} bytes)"
    )]
    MotorolaStartOutOfBounds {
        start: usize,
        total_bits: usize,
        dlc: u16,
    },
    #[error(
        "out of bounds (Motorola): linearized end bit {end}, message has {total_bits} bits ({dlc} bytes)"
    )]
    MotorolaEndOutOfBounds {
        end: usize,
        total_bits: usize,
        dlc: u16,
    },
}

/// Errors returned by the building operations on [`NetworkModel`](crate::types::network::NetworkModel).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Node '{name}' already exists")]
    NodeAlreadyExists { name: String },
    #[error("Message '{name}' already exists")]
    MessageAlreadyExists { name: String },
    #[error("Message ID {id} already assigned to '{existing}'")]
    MessageIdAlreadyAssigned { id: u32, existing: String },
    #[error("Attribute '{name}' already defined for {kind}")]
    AttributeAlreadyExists { name: String, kind: AttributeKind },
}

/// Errors produced by a [`Reader`](crate::codec::Reader).
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed while reading input")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },
    #[error("invalid JSON network description")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Errors produced by a [`Writer`](crate::codec::Writer).
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed while writing output")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("failed to encode JSON network description")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
