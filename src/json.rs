//! # json
//!
//! JSON form of a [`NetworkModel`], mirroring the model field by field.

use std::io::{self, Write};

use tracing::info;

use crate::codec::{Reader, Writer};
use crate::types::{
    errors::{ReadError, WriteError},
    network::NetworkModel,
};

/// Reads a [`NetworkModel`] from its JSON form.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonReader;

impl Reader for JsonReader {
    fn read(&self, source: &mut dyn io::Read) -> Result<NetworkModel, ReadError> {
        let model: NetworkModel = serde_json::from_reader(source)?;
        info!(
            nodes = model.nodes.len(),
            messages = model.messages.len(),
            "JSON network read"
        );
        Ok(model)
    }
}

/// Writes a [`NetworkModel`] as JSON, followed by a newline.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonWriter {
    /// Indent the output.
    pub pretty: bool,
}

impl Writer for JsonWriter {
    fn write(&self, destination: &mut dyn io::Write, model: &NetworkModel) -> Result<(), WriteError> {
        let mut out = io::BufWriter::new(destination);
        if self.pretty {
            serde_json::to_writer_pretty(&mut out, model)?;
        } else {
            serde_json::to_writer(&mut out, model)?;
        }
        writeln!(out)?;
        out.flush()?;
        info!(pretty = self.pretty, "JSON network written");
        Ok(())
    }
}
