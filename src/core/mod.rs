//! Statement decoders and frame layout checks.
//!
//! Each DBC keyword has its own module exposing `decode`, called by the reader loop in
//! [`crate::parse`] with the statement already joined across lines.

pub(crate) mod message_layout;

#[cfg(feature = "dbc")]
pub(crate) mod attributes;
#[cfg(feature = "dbc")]
pub(crate) mod bo_;
#[cfg(feature = "dbc")]
pub(crate) mod bo_tx_bu_;
#[cfg(feature = "dbc")]
pub(crate) mod bs_;
#[cfg(feature = "dbc")]
pub(crate) mod bu_;
#[cfg(feature = "dbc")]
pub(crate) mod cm_;
#[cfg(feature = "dbc")]
pub(crate) mod mux;
#[cfg(feature = "dbc")]
pub(crate) mod sg_;
#[cfg(feature = "dbc")]
pub(crate) mod sg_mul_val_;
#[cfg(feature = "dbc")]
pub(crate) mod sig_valtype_;
#[cfg(feature = "dbc")]
pub(crate) mod strings;
#[cfg(feature = "dbc")]
pub(crate) mod val_;
#[cfg(feature = "dbc")]
pub(crate) mod version;

/// DBC placeholder for "no node" in transmitter and receiver positions.
#[cfg(feature = "dbc")]
pub(crate) const NO_NODE: &str = "Vector__XXX";
