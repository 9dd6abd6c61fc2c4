//! # canconv
//!
//! Command-line front end: validates CAN network descriptions and converts them between
//! DBC and JSON.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use canconv::{
    DbcReader, DbcWriter, JsonReader, JsonWriter, NetworkModel, ReadError, Reader,
    ValidationError, WriteError, Writer,
};
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Serialized form of a network description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Vector DBC text.
    Dbc,
    /// JSON form of the network model.
    Json,
}

impl Format {
    /// Infers the format from the file extension, case-insensitively.
    fn from_path(path: &Path) -> Option<Self> {
        let extension: String = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "dbc" => Some(Format::Dbc),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    fn resolve(explicit: Option<Self>, path: &Path) -> Result<Self, CliError> {
        explicit
            .or_else(|| Format::from_path(path))
            .ok_or_else(|| CliError::UnknownFormat(path.to_path_buf()))
    }
}

/// canconv - CAN network description validator and converter
#[derive(Parser, Debug)]
#[command(name = "canconv")]
#[command(author, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tool version
    Version,
    /// Read a network description and check it against its attribute schema
    Validate {
        /// Input file (.dbc or .json)
        input: PathBuf,
        /// Input format, inferred from the extension when omitted
        #[arg(long, value_enum)]
        from: Option<Format>,
    },
    /// Read, validate and write a network description in another format
    Convert {
        /// Input file (.dbc or .json)
        input: PathBuf,
        /// Output file (.dbc or .json)
        output: PathBuf,
        /// Input format, inferred from the extension when omitted
        #[arg(long, value_enum)]
        from: Option<Format>,
        /// Output format, inferred from the extension when omitted
        #[arg(long, value_enum)]
        to: Option<Format>,
        /// Indent JSON output
        #[arg(long)]
        pretty: bool,
        /// Omit the NS_ block from DBC output
        #[arg(long)]
        no_ns: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot infer the format of '{}', use --from/--to", .0.display())]
    UnknownFormat(PathBuf),
    #[error("failed to read '{}'", path.display())]
    Read { path: PathBuf, source: ReadError },
    #[error("invalid network description")]
    Invalid(#[from] ValidationError),
    #[error("failed to write '{}'", path.display())]
    Write { path: PathBuf, source: WriteError },
}

/// Joins an error and its sources with `: `, each printed once.
fn error_chain(err: &dyn Error) -> String {
    let mut text: String = err.to_string();
    let mut source: Option<&dyn Error> = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", error_chain(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Version => {
            println!("{}", VERSION);
            Ok(())
        }
        Commands::Validate { input, from } => {
            let format: Format = Format::resolve(from, &input)?;
            let mut model: NetworkModel = read_model(&input, format)?;
            model.validate()?;
            for dangling in model.dangling_references() {
                info!(%dangling, "dangling reference");
            }
            println!("valid");
            Ok(())
        }
        Commands::Convert {
            input,
            output,
            from,
            to,
            pretty,
            no_ns,
        } => {
            let from: Format = Format::resolve(from, &input)?;
            let to: Format = Format::resolve(to, &output)?;
            let mut model: NetworkModel = read_model(&input, from)?;
            model.validate()?;

            debug!(?from, ?to, output = %output.display(), "writing converted network");
            let result: Result<(), WriteError> = match to {
                Format::Dbc => DbcWriter {
                    emit_ns_block: !no_ns,
                }
                .write_path(&output, &model),
                Format::Json => JsonWriter { pretty }.write_path(&output, &model),
            };
            result.map_err(|source| CliError::Write {
                path: output,
                source,
            })
        }
    }
}

fn read_model(path: &Path, format: Format) -> Result<NetworkModel, CliError> {
    let result: Result<NetworkModel, ReadError> = match format {
        Format::Dbc => DbcReader.read_path(path),
        Format::Json => JsonReader.read_path(path),
    };
    result.map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(Format::from_path(Path::new("net.DBC")), Some(Format::Dbc));
        assert_eq!(Format::from_path(Path::new("out/net.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("net.arxml")), None);
        assert_eq!(
            Format::resolve(Some(Format::Json), Path::new("net.txt")).unwrap(),
            Format::Json
        );
        assert!(matches!(
            Format::resolve(None, Path::new("net")),
            Err(CliError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::try_parse_from(["canconv", "convert", "a.dbc", "b.txt", "--to", "json", "--pretty"])
            .unwrap();
        match cli.command {
            Commands::Convert { to, pretty, no_ns, .. } => {
                assert_eq!(to, Some(Format::Json));
                assert!(pretty);
                assert!(!no_ns);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_error_chain_names_each_layer_once() {
        let err = CliError::Read {
            path: PathBuf::from("net.dbc"),
            source: ReadError::from(std::io::Error::other("permission denied")),
        };
        assert_eq!(
            error_chain(&err),
            "failed to read 'net.dbc': failed while reading input: permission denied"
        );

        let mut model = NetworkModel::default();
        model
            .add_message(canconv::Message::new(7, "Huge", 65))
            .unwrap();
        let err = CliError::from(model.validate().unwrap_err());
        let text = error_chain(&err);
        assert!(text.starts_with("invalid network description: message Huge (id 7): "));
        assert_eq!(text.matches("Huge").count(), 1);
    }

    #[test]
    fn test_version_string() {
        assert_eq!(VERSION, "v0.4.0");
    }
}
