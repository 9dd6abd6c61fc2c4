//! # canconv
//!
//! Rust model of an **automotive CAN** network description, with attribute validation and
//! conversion between DBC and JSON.
//!
//! ## Highlights
//! - **Network model**: [`NetworkModel`] owns nodes, messages and signals, keyed by name and
//!   iterated in name order.
//! - **Multiplexing trees**: a multiplexor [`Signal`] owns the signals it selects, to any depth.
//! - **Typed attributes**: per-kind catalogs of [`AttributeDefinition`]s, and assignments checked
//!   against them by [`NetworkModel::validate`].
//! - **Projections**: flat attribute records (`node_assignments`, `message_assignments`,
//!   `signal_assignments`) for tabular views.
//! - **Codecs**: [`DbcReader`]/[`DbcWriter`] (feature `dbc`) and [`JsonReader`]/[`JsonWriter`]
//!   behind the [`Reader`] and [`Writer`] traits.
//!
//! ## Example
//! ```no_run
//! use canconv::{DbcReader, JsonWriter, Reader, Writer};
//!
//! let mut model = DbcReader.read_path("network.dbc").expect("Failed to parse DBC file");
//! model.validate().expect("invalid network");
//! JsonWriter { pretty: true }
//!     .write_path("network.json", &model)
//!     .expect("Failed to write JSON");
//! ```

pub mod codec;
pub(crate) mod core;
pub mod json;
#[cfg(feature = "dbc")]
pub mod parse;
#[cfg(feature = "dbc")]
pub mod save;
#[doc(hidden)]
pub mod types;

// Top-level re-exports (appear under Crate Items → Structs)
pub use crate::codec::{Reader, Writer};
pub use crate::json::{JsonReader, JsonWriter};
#[cfg(feature = "dbc")]
pub use crate::parse::DbcReader;
#[cfg(feature = "dbc")]
pub use crate::save::DbcWriter;

#[doc(inline)]
pub use crate::types::{
    assignment::{AttributeAssignment, AttributeCarrier},
    attributes::{AttributeCatalog, AttributeDefinition, AttributeDomain, AttributeKind, AttributeValue},
    errors::{
        MessageLayoutError, ModelError, ReadError, StructuralError, ValidationError,
        ValidationErrorKind, WriteError,
    },
    message::{EXTENDED_ID_FLAG, MAX_BYTE_LENGTH, Message},
    network::{DanglingReference, NetworkModel},
    node::{Node, SignalRef},
    records::{MessageAttributeRecord, NodeAttributeRecord, SignalAttributeRecord},
    signal::{ByteOrder, Signal, SignalTree, ValueType},
};
