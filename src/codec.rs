//! # codec
//!
//! Format-neutral seams between a [`NetworkModel`] and its serialized forms.
//!
//! Readers build a model from a byte stream and writers serialize one. Neither side
//! validates: call [`NetworkModel::validate`] on the result when the content comes from an
//! untrusted source.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::types::{
    errors::{ReadError, WriteError},
    network::NetworkModel,
};

/// Builds a [`NetworkModel`] from a serialized description.
pub trait Reader {
    /// Reads the whole `source` and returns the decoded model.
    fn read(&self, source: &mut dyn io::Read) -> Result<NetworkModel, ReadError>;

    /// Opens `path` and reads it with [`Reader::read`].
    ///
    /// # Example
    /// ```no_run
    /// use canconv::{DbcReader, Reader};
    ///
    /// let model = DbcReader.read_path("example.dbc").expect("Failed to parse DBC file");
    /// println!("Parsed {} messages", model.messages.len());
    /// ```
    fn read_path(&self, path: impl AsRef<Path>) -> Result<NetworkModel, ReadError>
    where
        Self: Sized,
    {
        let file: File = File::open(path)?;
        let mut reader: BufReader<File> = BufReader::new(file);
        self.read(&mut reader)
    }
}

/// Serializes a [`NetworkModel`].
pub trait Writer {
    /// Writes `model` to `destination`.
    fn write(&self, destination: &mut dyn io::Write, model: &NetworkModel) -> Result<(), WriteError>;

    /// Creates (or truncates) `path` and writes the model into it.
    fn write_path(&self, path: impl AsRef<Path>, model: &NetworkModel) -> Result<(), WriteError>
    where
        Self: Sized,
    {
        let mut file: File = File::create(path)?;
        self.write(&mut file, model)
    }
}
