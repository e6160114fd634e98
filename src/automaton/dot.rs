//! DOT-graph dump of a compiled automaton, for debugging with graphviz.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use super::arena::{StateArena, StateId};
use super::{Symbol, ANY_CHAR, EPSILON};

fn edge_label(symbol: Symbol) -> String {
    match symbol {
        EPSILON => "ε".to_string(),
        ANY_CHAR => "any".to_string(),
        c if c == Symbol::from(b'\n') => "\\\\n".to_string(),
        c if c <= 0xFF && (c as u8).is_ascii_graphic() => (c as u8 as char).to_string(),
        c => format!("0x{c:02x}"),
    }
}

/// Render the automaton reachable from `start` as a DOT digraph. States
/// are named by arena index; anchors and the terminal are highlighted.
pub(crate) fn dump(arena: &StateArena, start: StateId) -> String {
    let mut out = String::from("digraph nfa {\n");
    let mut visited = FxHashSet::default();
    let mut pending = vec![start];

    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let state = arena.state(id);

        let _ = writeln!(out, "  s{} [label=\"s{}\"]", id.index(), id.index());
        if state.start_of_text {
            let _ = writeln!(out, "  s{} [color=red,style=filled]", id.index());
        }
        if state.end_of_text {
            let _ = writeln!(out, "  s{} [color=blue,style=filled]", id.index());
        }
        if state.terminal {
            let _ = writeln!(out, "  s{} [shape=doublecircle]", id.index());
        }

        let mut edges: Vec<(Symbol, StateId)> = state
            .transitions
            .iter()
            .flat_map(|(&symbol, targets)| targets.iter().map(move |&to| (symbol, to)))
            .collect();
        edges.sort_by_key(|&(symbol, to)| (symbol, to.index()));
        for (symbol, to) in edges {
            let _ = writeln!(
                out,
                "  s{} -> s{} [label=\"{}\"]",
                id.index(),
                to.index(),
                edge_label(symbol)
            );
            pending.push(to);
        }

        if let Some(backref) = &state.backreference {
            let _ = writeln!(
                out,
                "  s{} -> s{} [label=\"backref({})\",style=dashed]",
                id.index(),
                backref.target.index(),
                backref.name
            );
            pending.push(backref.target);
        }
    }

    out.push_str("}\n");
    out
}
