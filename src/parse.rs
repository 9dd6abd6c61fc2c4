use encoding_rs::WINDOWS_1252;
use std::collections::BTreeMap;
use std::io;
use tracing::{debug, info, warn};

use crate::codec::Reader;
use crate::core::{self, strings};
use crate::types::{errors::ReadError, network::NetworkModel};

/// Statements recognised as DBC but not represented in the model.
const SKIPPED_KEYWORDS: &[&str] = &[
    "NS_DESC_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "EV_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIGTYPE_VALTYPE_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
];

/// Statements decoded into the model.
const MODELLED_KEYWORDS: &[&str] = &[
    "VERSION",
    "NS_",
    "BS_",
    "BU_",
    "BO_",
    "SG_",
    "BO_TX_BU_",
    "CM_",
    "BA_DEF_",
    "BA_DEF_DEF_",
    "BA_",
    "VAL_",
    "SIG_VALTYPE_",
    "SG_MUL_VAL_",
];

/// Statements closed by `;`. They may wrap over several lines.
const TERMINATED_KEYWORDS: &[&str] = &[
    "BO_TX_BU_",
    "CM_",
    "BA_DEF_",
    "BA_DEF_DEF_",
    "BA_",
    "VAL_",
    "SIG_VALTYPE_",
    "SG_MUL_VAL_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SGTYPE_VAL_",
    "SIG_TYPE_REF_",
    "SIGTYPE_VALTYPE_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "EV_",
    "ENVVAR_DATA_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
];

/// Parses DBC text into a [`NetworkModel`].
///
/// The input is decoded as UTF-8, falling back to Windows-1252 (the encoding most DBC
/// editors write) when it is not valid UTF-8. Parsing fills:
/// - **Version** (from `VERSION` line)
/// - **Bus speed** (from `BS_` line)
/// - **Nodes** (from `BU_` line)
/// - **Messages** and their **transmitters** (from `BO_` and `BO_TX_BU_` lines)
/// - **Signals** and their **receivers** (from `SG_` lines)
/// - **Comments** for the network, nodes, messages and signals (from `CM_` lines)
/// - **Attribute definitions, defaults and assignments** (from `BA_DEF_`, `BA_DEF_DEF_`, `BA_`)
/// - **Bitmaps** (from `VAL_` lines) and IEEE float signals (from `SIG_VALTYPE_`)
/// - **Multiplexing trees** (from `SG_` tags and `SG_MUL_VAL_` lines)
///
/// Quoted text spanning several lines is joined before the statement is decoded.
///
/// # Errors
/// - [`ReadError::Io`] if the source cannot be read.
/// - [`ReadError::Format`] with the 1-based line of the first malformed statement.
///
/// # Notes
/// - Statements that are valid DBC but not modelled are skipped; unknown keywords are
///   skipped with a warning.
/// - The returned model is **not** validated.
#[derive(Clone, Copy, Debug, Default)]
pub struct DbcReader;

impl Reader for DbcReader {
    fn read(&self, source: &mut dyn io::Read) -> Result<NetworkModel, ReadError> {
        let mut bytes: Vec<u8> = Vec::new();
        source.read_to_end(&mut bytes)?;
        let text: String = decode_text(bytes);
        parse_str(&text)
    }
}

/// Decoding state shared by the per-keyword decoders in [`crate::core`].
#[derive(Debug, Default)]
pub(crate) struct ParseState {
    pub(crate) model: NetworkModel,
    /// Message owning the `SG_` lines being read (the last parsed `BO_`).
    pub(crate) current_message: Option<String>,
    /// message name -> signals tagged `M`
    pub(crate) multiplexors: BTreeMap<String, Vec<String>>,
    /// message name -> multiplexed signal -> switch, from `SG_MUL_VAL_`
    pub(crate) mux_parents: BTreeMap<String, BTreeMap<String, String>>,
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!("input is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = WINDOWS_1252.decode(err.as_bytes());
            decoded.into_owned()
        }
    }
}

fn parse_str(text: &str) -> Result<NetworkModel, ReadError> {
    let mut state: ParseState = ParseState::default();
    let mut in_ns_block: bool = false;
    let mut lines = text.trim_start_matches('\u{feff}').lines().enumerate().peekable();

    while let Some((index, line)) = lines.next() {
        // NS_ block: indented keywords until the next statement at column 0
        if in_ns_block {
            if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
                continue;
            }
            in_ns_block = false;
        }

        let trimmed: &str = line.trim();
        // skip comments and empty lines
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        // Accumulate multiline until every quoted segment is closed and, for statements
        // ending in ';', until the terminator. A missing ';' stops at the next statement.
        let mut statement: String = trimmed.to_string();
        let needs_terminator: bool = TERMINATED_KEYWORDS.contains(&keyword_of(trimmed));
        loop {
            let open_quote: bool = strings::has_open_quote(&statement);
            if !open_quote && !(needs_terminator && !strings::has_terminator(&statement)) {
                break;
            }
            let next = if open_quote {
                lines.next()
            } else {
                lines.next_if(|(_, next)| !starts_statement(next))
            };
            let Some((_, next)) = next else {
                break;
            };
            statement.push('\n');
            statement.push_str(next);
        }

        decode_statement(&mut state, &statement, &mut in_ns_block).map_err(|reason| {
            ReadError::Format {
                line: index + 1,
                reason,
            }
        })?;
    }

    core::mux::build_trees(&mut state);

    info!(
        nodes = state.model.nodes.len(),
        messages = state.model.messages.len(),
        "DBC network read"
    );
    Ok(state.model)
}

fn keyword_of(statement: &str) -> &str {
    statement
        .split(|c: char| c.is_whitespace() || c == ':')
        .next()
        .unwrap_or_default()
}

fn starts_statement(line: &str) -> bool {
    let trimmed: &str = line.trim();
    let keyword: &str = keyword_of(trimmed);
    trimmed.starts_with("//")
        || MODELLED_KEYWORDS.contains(&keyword)
        || SKIPPED_KEYWORDS.contains(&keyword)
}

fn decode_statement(
    state: &mut ParseState,
    statement: &str,
    in_ns_block: &mut bool,
) -> Result<(), String> {
    let keyword: &str = keyword_of(statement);

    match keyword {
        "NS_" => {
            *in_ns_block = true;
            return Ok(());
        }
        "SG_" => return core::sg_::decode(state, statement),
        _ => {}
    }

    let tokens: Vec<strings::Token> = strings::tokenize(statement)?;
    match keyword {
        "VERSION" => core::version::decode(state, &tokens),
        "BS_" => core::bs_::decode(state, &tokens),
        "BU_" => core::bu_::decode(state, &tokens),
        "BO_" => core::bo_::decode(state, &tokens),
        "BO_TX_BU_" => core::bo_tx_bu_::decode(state, &tokens),
        "CM_" => core::cm_::decode(state, &tokens),
        "BA_DEF_" => core::attributes::ba_def_::decode(state, &tokens),
        "BA_DEF_DEF_" => core::attributes::ba_def_def_::decode(state, &tokens),
        "BA_" => core::attributes::ba_::decode(state, &tokens),
        "VAL_" => core::val_::decode(state, &tokens),
        "SIG_VALTYPE_" => core::sig_valtype_::decode(state, &tokens),
        "SG_MUL_VAL_" => core::sg_mul_val_::decode(state, &tokens),
        k if SKIPPED_KEYWORDS.contains(&k) => {
            debug!(keyword = k, "statement not modelled, skipped");
            Ok(())
        }
        other => {
            warn!(keyword = other, "unknown DBC statement skipped");
            Ok(())
        }
    }
}
