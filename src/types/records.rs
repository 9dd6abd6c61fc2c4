//! Flattened attribute assignment records.
//!
//! Each record carries the identity of the owning entity, so a writer can emit one
//! `BA_` statement per record without walking the model again.

use serde::{Deserialize, Serialize};

use crate::types::attributes::AttributeValue;

/// `BA_ "<attribute>" BU_ <node> <value>;`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributeRecord {
    pub node: String,
    pub attribute: String,
    pub value: AttributeValue,
}

/// `BA_ "<attribute>" BO_ <message_id> <value>;`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageAttributeRecord {
    pub message_id: u32,
    pub attribute: String,
    pub value: AttributeValue,
}

/// `BA_ "<attribute>" SG_ <message_id> <signal> <value>;`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalAttributeRecord {
    pub message_id: u32,
    pub signal: String,
    pub attribute: String,
    pub value: AttributeValue,
}
