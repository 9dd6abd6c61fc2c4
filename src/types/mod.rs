//! # types
//!
//! `types` is the module containing the public model of the crate: the network and its
//! entities, attribute schemas and values, and the error types.

pub mod assignment;
pub mod attributes;
pub mod errors;
pub mod message;
pub mod network;
pub mod node;
pub mod records;
pub mod signal;
