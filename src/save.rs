use std::io::{self, BufWriter, Write};
use tracing::info;

use crate::codec::Writer;
use crate::core::{NO_NODE, strings::escape_dbc_string};
use crate::types::{
    attributes::{AttributeDefinition, AttributeDomain, AttributeKind, AttributeValue, compact_f64},
    errors::WriteError,
    message::Message,
    network::NetworkModel,
    signal::{ByteOrder, Signal, ValueType},
};

const NS_KEYWORDS: &[&str] = &[
    "NS_DESC_",
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "SG_MUL_VAL_",
];

/// Serializes a [`NetworkModel`] into DBC text.
///
/// Mux trees are flattened into `SG_` lines tagged `M`, `mX` or `mXM`; when a message
/// nests multiplexors, `SG_MUL_VAL_` lines record the switch of every multiplexed signal.
/// Attribute assignments are written from the model's assignment projections.
#[derive(Clone, Copy, Debug)]
pub struct DbcWriter {
    /// Write the `NS_` block listing the new-symbol keywords.
    pub emit_ns_block: bool,
}

impl Default for DbcWriter {
    fn default() -> Self {
        Self {
            emit_ns_block: true,
        }
    }
}

impl Writer for DbcWriter {
    fn write(&self, destination: &mut dyn io::Write, model: &NetworkModel) -> Result<(), WriteError> {
        let mut out = BufWriter::new(destination);
        self.serialize_network(model, &mut out)?;
        out.flush()?;
        info!(
            nodes = model.nodes.len(),
            messages = model.messages.len(),
            "DBC network written"
        );
        Ok(())
    }
}

impl DbcWriter {
    /// Serializes the model into raw DBC text using the provided writer.
    fn serialize_network<W: Write>(&self, model: &NetworkModel, out: &mut W) -> io::Result<()> {
        writeln!(out, "VERSION \"{}\"\n", escape_dbc_string(&model.version))?;

        if self.emit_ns_block {
            writeln!(out, "NS_ :")?;
            for keyword in NS_KEYWORDS {
                writeln!(out, "\t{}", keyword)?;
            }
            writeln!(out)?;
        }

        if model.bus_speed == 0 {
            writeln!(out, "BS_:\n")?;
        } else {
            writeln!(out, "BS_: {}\n", model.bus_speed)?;
        }

        write!(out, "BU_:")?;
        for node in model.nodes.values() {
            write!(out, " {}", node.name)?;
        }
        writeln!(out, "\n")?;

        write_messages(model, out)?;
        write_bo_tx_bu(model, out)?;
        writeln!(out)?;

        write_comments(model, out)?;
        write_attribute_definitions(model, out)?;
        write_attribute_defaults(model, out)?;
        write_attribute_assignments(model, out)?;
        write_value_tables(model, out)?;
        write_sig_valtype(model, out)?;
        write_sg_mul_val(model, out)?;

        Ok(())
    }
}

/// Writes each message and its signals into standard DBC syntax.
fn write_messages<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for message in model.messages.values() {
        let transmitter: &str = model
            .transmitters_of(&message.name)
            .next()
            .map_or(NO_NODE, |node| node.name.as_str());

        writeln!(
            out,
            "BO_ {} {}: {} {}",
            message.id, message.name, message.byte_length, transmitter
        )?;

        for signal in message.iter_signals() {
            let byte_order: char = match signal.byte_order {
                ByteOrder::LittleEndian => '1',
                ByteOrder::BigEndian => '0',
            };
            let sign: char = if signal.is_signed() { '-' } else { '+' };

            writeln!(
                out,
                " SG_ {}{} : {}|{}@{}{} ({},{}) [{}|{}] \"{}\" {}",
                signal.name,
                format_mux_tag(signal),
                signal.start_bit,
                signal.size,
                byte_order,
                sign,
                compact_f64(signal.scale),
                compact_f64(signal.offset),
                compact_f64(signal.min),
                compact_f64(signal.max),
                escape_dbc_string(&signal.unit),
                receivers_field(model, message, signal)
            )?;
        }

        writeln!(out)?;
    }

    Ok(())
}

/// Receivers listed on the signal, then nodes declaring the signal in their rx list.
fn receivers_field(model: &NetworkModel, message: &Message, signal: &Signal) -> String {
    let mut receivers: Vec<&str> = signal.receivers.iter().map(String::as_str).collect();
    for node in model.nodes.values() {
        if node.receives(&message.name, &signal.name) && !receivers.contains(&node.name.as_str()) {
            receivers.push(&node.name);
        }
    }
    if receivers.is_empty() {
        NO_NODE.to_string()
    } else {
        receivers.join(",")
    }
}

/// Produces the multiplexing tag used in `SG_` lines.
fn format_mux_tag(signal: &Signal) -> String {
    match (signal.mux_switch, signal.is_multiplexor()) {
        (None, false) => String::new(),
        (None, true) => " M".to_string(),
        (Some(v), false) => format!(" m{}", v),
        (Some(v), true) => format!(" m{}M", v),
    }
}

/// Emits `BO_TX_BU_` entries for messages with more than one transmitter.
fn write_bo_tx_bu<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for message in model.messages.values() {
        let transmitters: Vec<&str> = model
            .transmitters_of(&message.name)
            .map(|node| node.name.as_str())
            .collect();
        if transmitters.len() < 2 {
            continue;
        }
        writeln!(out, "BO_TX_BU_ {} : {};", message.id, transmitters.join(","))?;
    }

    Ok(())
}

/// Writes `CM_` comment blocks for the network, nodes, messages and signals.
fn write_comments<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    if !model.description.is_empty() {
        writeln!(out, "CM_ \"{}\";", escape_dbc_string(&model.description))?;
    }

    for node in model.nodes.values() {
        if node.description.is_empty() {
            continue;
        }
        writeln!(
            out,
            "CM_ BU_ {} \"{}\";",
            node.name,
            escape_dbc_string(&node.description)
        )?;
    }

    for message in model.messages.values() {
        if !message.description.is_empty() {
            writeln!(
                out,
                "CM_ BO_ {} \"{}\";",
                message.id,
                escape_dbc_string(&message.description)
            )?;
        }
        for signal in message.iter_signals().filter(|s| s.has_description()) {
            writeln!(
                out,
                "CM_ SG_ {} {} \"{}\";",
                message.id,
                signal.name,
                escape_dbc_string(&signal.description)
            )?;
        }
    }

    Ok(())
}

/// Outputs attribute definitions for node, message, and signal scopes.
fn write_attribute_definitions<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for kind in AttributeKind::ALL {
        for (name, definition) in model.catalog(kind) {
            writeln!(
                out,
                "BA_DEF_ {}  \"{}\" {};",
                kind.dbc_object(),
                escape_dbc_string(name),
                format_domain(&definition.domain)
            )?;
        }
    }

    Ok(())
}

/// Writes the default value of every definition that has one.
fn write_attribute_defaults<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for kind in AttributeKind::ALL {
        for (name, definition) in model.catalog(kind) {
            if let Some(default) = &definition.default {
                writeln!(
                    out,
                    "BA_DEF_DEF_  \"{}\" {};",
                    escape_dbc_string(name),
                    format_attribute_value(default, Some(definition))
                )?;
            }
        }
    }

    Ok(())
}

/// Emits attribute assignments for nodes, messages, and signals.
fn write_attribute_assignments<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for record in model.node_assignments() {
        let definition = model.node_attributes.get(&record.attribute);
        writeln!(
            out,
            "BA_ \"{}\" BU_ {} {};",
            escape_dbc_string(&record.attribute),
            record.node,
            format_attribute_value(&record.value, definition)
        )?;
    }

    for record in model.message_assignments() {
        let definition = model.message_attributes.get(&record.attribute);
        writeln!(
            out,
            "BA_ \"{}\" BO_ {} {};",
            escape_dbc_string(&record.attribute),
            record.message_id,
            format_attribute_value(&record.value, definition)
        )?;
    }

    for record in model.signal_assignments() {
        let definition = model.signal_attributes.get(&record.attribute);
        writeln!(
            out,
            "BA_ \"{}\" SG_ {} {} {};",
            escape_dbc_string(&record.attribute),
            record.message_id,
            record.signal,
            format_attribute_value(&record.value, definition)
        )?;
    }

    Ok(())
}

/// Outputs `VAL_` lines for signal bitmaps, ordered by raw value.
fn write_value_tables<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for message in model.messages.values() {
        for signal in message.iter_signals().filter(|s| s.is_bitmap()) {
            let mut entries: Vec<(i64, &str)> = signal
                .bitmap
                .iter()
                .map(|(label, raw)| (*raw, label.as_str()))
                .collect();
            entries.sort();

            write!(out, "VAL_ {} {}", message.id, signal.name)?;
            for (raw, label) in entries {
                write!(out, " {} \"{}\"", raw, escape_dbc_string(label))?;
            }
            writeln!(out, " ;")?;
        }
    }

    Ok(())
}

/// Emits `SIG_VALTYPE_` lines for floating-point signals.
fn write_sig_valtype<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for message in model.messages.values() {
        for signal in message.iter_signals() {
            let code: Option<u8> = match signal.value_type {
                ValueType::Float32 => Some(1),
                ValueType::Float64 => Some(2),
                _ => None,
            };
            if let Some(code) = code {
                writeln!(out, "SIG_VALTYPE_ {} {} : {};", message.id, signal.name, code)?;
            }
        }
    }

    Ok(())
}

/// Emits `SG_MUL_VAL_` lines for messages whose mux trees have more than one multiplexor.
fn write_sg_mul_val<W: Write>(model: &NetworkModel, out: &mut W) -> io::Result<()> {
    for message in model.messages.values() {
        let multiplexors: usize = message
            .iter_signals()
            .filter(|s| s.is_multiplexor())
            .count();
        if multiplexors < 2 {
            continue;
        }
        for switch in message.iter_signals() {
            for child in switch.mux_group.values() {
                if let Some(v) = child.mux_switch {
                    writeln!(
                        out,
                        "SG_MUL_VAL_ {} {} {} {}-{};",
                        message.id, child.name, switch.name, v, v
                    )?;
                }
            }
        }
    }

    Ok(())
}

/// Converts an attribute domain into its `BA_DEF_` signature text.
fn format_domain(domain: &AttributeDomain) -> String {
    match domain {
        AttributeDomain::String => "STRING".to_string(),
        AttributeDomain::Int { min, max } => format!("INT {} {}", min, max),
        AttributeDomain::Hex { min, max } => format!("HEX {} {}", min, max),
        AttributeDomain::Float { min, max } => {
            format!("FLOAT {} {}", compact_f64(*min), compact_f64(*max))
        }
        AttributeDomain::Enum(labels) => {
            let joined = labels
                .iter()
                .map(|label| format!("\"{}\"", escape_dbc_string(label)))
                .collect::<Vec<_>>()
                .join(",");
            format!("ENUM {}", joined)
        }
    }
}

/// Formats an attribute value; enumeration labels are written as their index.
fn format_attribute_value(value: &AttributeValue, definition: Option<&AttributeDefinition>) -> String {
    match value {
        AttributeValue::Enum(s) => match definition.and_then(|d| d.domain.enum_index(s)) {
            Some(index) => index.to_string(),
            None => format!("\"{}\"", escape_dbc_string(s)),
        },
        AttributeValue::Str(s) => format!("\"{}\"", escape_dbc_string(s)),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Hex(v) => v.to_string(),
        AttributeValue::Float(v) => compact_f64(*v),
    }
}
