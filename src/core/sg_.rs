use crate::core::{
    NO_NODE,
    strings::{Token, tokenize},
};
use crate::parse::ParseState;
use crate::types::signal::{ByteOrder, Signal, ValueType};

/// Decode a `SG_` line belonging to the **current message** (the last parsed BO_).
/// Format (typical):
/// SG_ <name> [M|mX|mXM] : <start_bit>|<size>@<byte_order><sign> (<scale>,<offset>) [<min>|<max>] "<unit>" <receivers...>
///
/// The signal is stored at the top level of the message; mux trees are built once the
/// whole input has been read.
pub(crate) fn decode(state: &mut ParseState, line: &str) -> Result<(), String> {
    let Some(message_name) = state.current_message.clone() else {
        return Err("SG_ outside of a message".to_string());
    };

    let body: &str = line
        .trim()
        .strip_prefix("SG_")
        .ok_or("not a SG_ statement")?;
    let (left, right) = body
        .split_once(':')
        .ok_or("missing ':' after signal name")?;

    // Left part analysis: NAME [M|mX|mXM]
    let mut left_it = left.split_ascii_whitespace();
    let name: &str = left_it.next().ok_or("missing signal name")?;
    let (is_multiplexor, mux_switch) = decode_mux_tag(left_it.next())?;
    if let Some(extra) = left_it.next() {
        return Err(format!("unexpected '{}' after multiplexer tag", extra));
    }

    // Right part: layout up to the unit, then "unit" and receivers
    let quote: usize = right.find('"').ok_or("missing unit")?;
    let (layout, tail) = right.split_at(quote);
    let mut tail_tokens = tokenize(tail)?.into_iter();
    let unit: String = match tail_tokens.next() {
        Some(Token::Quoted(u)) => u,
        _ => return Err("missing unit".to_string()),
    };
    let receivers: Vec<String> = tail_tokens
        .filter_map(|t| match t {
            Token::Word(w) if w != NO_NODE => Some(w),
            _ => None,
        })
        .collect();

    let compact: String = layout.chars().filter(|c| !c.is_whitespace()).collect();
    let layout = decode_layout(&compact)?;

    let signal = Signal {
        name: name.to_string(),
        mux_switch,
        start_bit: layout.start_bit,
        size: layout.size,
        byte_order: layout.byte_order,
        value_type: layout.value_type,
        unit,
        receivers: receivers.clone(),
        scale: layout.scale,
        offset: layout.offset,
        min: layout.min,
        max: layout.max,
        ..Default::default()
    };

    let message = state
        .model
        .message_mut(&message_name)
        .ok_or("current message disappeared")?;
    if message.signals.contains_key(name) {
        return Err(format!(
            "signal '{}' defined twice in message '{}'",
            name, message_name
        ));
    }
    message.add_signal(signal);

    if is_multiplexor && mux_switch.is_none() {
        state
            .multiplexors
            .entry(message_name.clone())
            .or_default()
            .push(name.to_string());
    }

    for receiver in &receivers {
        if let Some(node) = state.model.node_mut(receiver) {
            node.add_rx_signal(&message_name, name);
        }
    }
    Ok(())
}

/// Returns `(is_multiplexor, mux_switch)` for the optional tag after the signal name.
fn decode_mux_tag(tag: Option<&str>) -> Result<(bool, Option<u32>), String> {
    let Some(tag) = tag else {
        return Ok((false, None));
    };
    if tag == "M" {
        return Ok((true, None));
    }
    let invalid = || format!("invalid multiplexer tag '{}'", tag);
    let body: &str = tag.strip_prefix('m').ok_or_else(invalid)?;
    let (digits, is_multiplexor) = match body.strip_suffix('M') {
        Some(digits) => (digits, true),
        None => (body, false),
    };
    let switch: u32 = digits.parse().map_err(|_| invalid())?;
    Ok((is_multiplexor, Some(switch)))
}

struct Layout {
    start_bit: u16,
    size: u16,
    byte_order: ByteOrder,
    value_type: ValueType,
    scale: f64,
    offset: f64,
    min: f64,
    max: f64,
}

/// Parses `0|16@1+(0.01,0)[0|655.35]` (whitespace already removed).
fn decode_layout(compact: &str) -> Result<Layout, String> {
    let (bits, rest) = compact
        .split_once('@')
        .ok_or("missing '@' in bit layout")?;
    let (start, size) = bits.split_once('|').ok_or("missing '|' in bit layout")?;

    let mut flags = rest.chars();
    let byte_order: ByteOrder = match flags.next() {
        Some('1') => ByteOrder::LittleEndian,
        Some('0') => ByteOrder::BigEndian,
        _ => return Err(format!("invalid byte order in '{}'", compact)),
    };
    let value_type: ValueType = match flags.next() {
        Some('+') => ValueType::Unsigned,
        Some('-') => ValueType::Signed,
        _ => return Err(format!("invalid value sign in '{}'", compact)),
    };

    let (scaling, range) = flags
        .as_str()
        .strip_prefix('(')
        .and_then(|r| r.split_once(')'))
        .ok_or("missing (scale,offset)")?;
    let (scale, offset) = scaling.split_once(',').ok_or("missing (scale,offset)")?;
    let (min, max) = range
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .and_then(|r| r.split_once('|'))
        .ok_or("missing [min|max]")?;

    Ok(Layout {
        start_bit: parse(start, "start bit")?,
        size: parse(size, "signal size")?,
        byte_order,
        value_type,
        scale: parse(scale, "scale")?,
        offset: parse(offset, "offset")?,
        min: parse(min, "minimum")?,
        max: parse(max, "maximum")?,
    })
}

fn parse<T: std::str::FromStr>(s: &str, what: &str) -> Result<T, String> {
    s.parse::<T>().map_err(|_| format!("invalid {} '{}'", what, s))
}
