//! Rebuilds the multiplexing trees once every `SG_` and `SG_MUL_VAL_` line is known.
//!
//! While reading, every signal sits at the top level of its message. A multiplexed
//! signal (`mX`) is then moved into the mux group of its switch: the one named by its
//! `SG_MUL_VAL_` entry, otherwise the only `M` signal of the message. Signals whose
//! switch cannot be resolved, or whose parent chain loops, stay at the top level.

use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::parse::ParseState;
use crate::types::{message::Message, signal::Signal};

pub(crate) fn build_trees(state: &mut ParseState) {
    for (name, message) in state.model.messages.iter_mut() {
        let explicit: Option<&BTreeMap<String, String>> = state.mux_parents.get(name);
        let multiplexors: &[String] = state
            .multiplexors
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default();
        nest_signals(message, explicit, multiplexors);
    }
}

fn nest_signals(
    message: &mut Message,
    explicit: Option<&BTreeMap<String, String>>,
    multiplexors: &[String],
) {
    let default_switch: Option<&String> = match multiplexors {
        [single] => Some(single),
        _ => None,
    };

    // child -> parent
    let mut parents: BTreeMap<String, String> = BTreeMap::new();
    for signal in message.signals.values().filter(|s| s.is_multiplexed()) {
        let parent: Option<&String> = explicit
            .and_then(|e| e.get(&signal.name))
            .or(default_switch);
        match parent {
            Some(p) if p != &signal.name && message.signals.contains_key(p) => {
                parents.insert(signal.name.clone(), p.clone());
            }
            _ => warn!(
                message = %message.name,
                signal = %signal.name,
                "multiplexed signal without a resolvable switch kept at top level"
            ),
        }
    }

    let cyclic: Vec<String> = parents
        .keys()
        .filter(|s| in_cycle(s, &parents))
        .cloned()
        .collect();
    for signal in cyclic {
        warn!(message = %message.name, signal = %signal, "cyclic multiplexer chain broken");
        parents.remove(&signal);
    }

    let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (child, parent) in &parents {
        children
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
    }

    let mut pool: BTreeMap<String, Signal> = std::mem::take(&mut message.signals);
    let roots: Vec<String> = pool
        .keys()
        .filter(|k| !parents.contains_key(*k))
        .cloned()
        .collect();
    for root in roots {
        if let Some(signal) = attach(&root, &mut pool, &children) {
            message.signals.insert(root, signal);
        }
    }
}

/// Returns `true` if following the parent links from `start` leads back to it.
fn in_cycle(start: &str, parents: &BTreeMap<String, String>) -> bool {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut current: &str = start;
    while let Some(parent) = parents.get(current) {
        if parent == start {
            return true;
        }
        if !seen.insert(parent.as_str()) {
            return false;
        }
        current = parent.as_str();
    }
    false
}

fn attach(
    name: &str,
    pool: &mut BTreeMap<String, Signal>,
    children: &BTreeMap<String, Vec<String>>,
) -> Option<Signal> {
    let mut signal: Signal = pool.remove(name)?;
    for child in children.get(name).into_iter().flatten() {
        if let Some(nested) = attach(child, pool, children) {
            signal.mux_group.insert(child.clone(), nested);
        }
    }
    Some(signal)
}
