// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The expansion engine: repeatedly promotes edges in `next` whose
//! requirements are already met, discovering newly-reachable nodes and
//! deferring `OneWay`/`NoReturn` edges into `one_way` for the driver to
//! pick up later. Runs to a fixed point — a pass that unlocks nothing ends
//! the loop.

use crate::graph::{EdgeId, EdgeData, EdgeKind, Graph, KeyId, KeyKind};
use crate::state::State;
use log::{debug, trace};

/// Runs [`expand`]'s fixed-point loop over `state` and returns the result.
pub fn expand(graph: &Graph, mut state: State) -> State {
    loop {
        let candidates: Vec<EdgeId> = state.next().collect();
        let satisfied: Vec<EdgeId> = candidates
            .into_iter()
            .filter(|&e| is_satisfied(graph, &state, e))
            .collect();
        if satisfied.is_empty() {
            return state;
        }

        let mut any_applied = false;
        for edge_id in satisfied {
            // Re-check against the *current* state, not the pre-pass
            // snapshot: applying an earlier edge in this same batch may
            // have debited a consumable token this one also needed, or
            // already visited both of its endpoints.
            if !state.next().any(|e| e == edge_id) || !is_satisfied(graph, &state, edge_id) {
                continue;
            }
            state = apply(graph, state, edge_id);
            any_applied = true;
        }
        if !any_applied {
            return state;
        }
    }
}

/// `is_satisfied(e)`: every required node already visited, and
/// every required key held in sufficient count — reusable/consumable
/// keys need their edge multiplicity times the key's token value;
/// removable keys need `min_occurrences`, the minimum count of that key
/// on any path from `start` to the edge's destination.
///
/// Exposed crate-wide so the route solver can drive its own,
/// order-sensitive simulation over the same satisfaction rule rather than
/// duplicating it.
pub(crate) fn is_satisfied(graph: &Graph, state: &State, edge_id: EdgeId) -> bool {
    let edge = graph.edge(edge_id);
    if !edge.required_nodes().iter().all(|&n| state.is_visited(n)) {
        return false;
    }
    let (_, destination) = graph.endpoints(edge_id);
    for (key, count) in edge.required_keys().iter() {
        let need = match graph.key(key).kind() {
            KeyKind::Removable => graph.min_occurrences(key, destination),
            KeyKind::Reusable | KeyKind::Consumable => count * graph.key(key).quantity(),
        };
        if state.keys().count(key) < need {
            return false;
        }
    }
    true
}

/// For each key `edge` requires beyond what's already held, the number of
/// *item placements* (not raw tokens) still needed to clear it — a
/// reusable key needs exactly one placement once any token is missing
/// (owning one covers every multiplicity); a consumable/removable
/// key needs `ceil(deficit / quantity)` placements, since each placement
/// credits one key's full `quantity()` worth of tokens (see `credit_key`).
///
/// Used by the driver's slot-assignment step, which only
/// ever needs to know how many *items* to hand out, not the underlying
/// token arithmetic `is_satisfied` works in.
pub(crate) fn missing_placements(graph: &Graph, state: &State, edge_id: EdgeId) -> Vec<(KeyId, u32)> {
    let edge = graph.edge(edge_id);
    let (_, destination) = graph.endpoints(edge_id);
    let mut out = Vec::new();
    for (key, count) in edge.required_keys().iter() {
        let quantity = graph.key(key).quantity();
        match graph.key(key).kind() {
            KeyKind::Reusable => {
                if state.keys().count(key) == 0 {
                    out.push((key, 1));
                }
            }
            kind @ (KeyKind::Consumable | KeyKind::Removable) => {
                let need_tokens = match kind {
                    // Matches `is_satisfied`: a removable key's requirement
                    // is already a token count (`min_occurrences`), not a
                    // per-edge multiplicity to scale by `quantity`.
                    KeyKind::Removable => graph.min_occurrences(key, destination),
                    _ => count * quantity,
                };
                let held = state.keys().count(key);
                let deficit = need_tokens.saturating_sub(held);
                if deficit > 0 {
                    out.push((key, (deficit + quantity - 1) / quantity));
                }
            }
        }
    }
    out
}

/// Applies one satisfied edge: visits whichever
/// endpoint becomes newly reachable, defers `OneWay`/`NoReturn` edges
/// instead of visiting their destination directly, and debits consumable
/// tokens. Crate-visible for the same reason as [`is_satisfied`].
pub(crate) fn apply(graph: &Graph, state: State, edge_id: EdgeId) -> State {
    let (source, destination) = graph.endpoints(edge_id);
    let edge: &EdgeData = graph.edge(edge_id);
    let source_visited = state.is_visited(source);
    let dest_visited = state.is_visited(destination);

    let consumed: Vec<KeyId> = edge
        .required_keys()
        .iter()
        .filter(|&(k, _)| graph.key(k).kind() == KeyKind::Consumable)
        .flat_map(|(k, count)| std::iter::repeat(k).take((count * graph.key(k).quantity()) as usize))
        .collect();

    let state = state.use_key(edge_id, consumed);

    if source_visited && !dest_visited {
        if matches!(edge.kind(), EdgeKind::OneWay | EdgeKind::NoReturn) {
            trace!("deferring {:?} edge {:?} -> {:?}", edge.kind(), source, destination);
            state.add_one_way(edge_id)
        } else {
            debug!("unlocking edge {:?}: visiting {:?}", edge_id, destination);
            state
                .visit_node(destination)
                .expect("expand only visits nodes reachable within the current parent chain")
        }
    } else if dest_visited && !source_visited {
        debug!("unlocking edge {:?} in reverse: visiting {:?}", edge_id, source);
        state
            .visit_node(source)
            .expect("expand only visits nodes reachable within the current parent chain")
    } else {
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::state::State;
    use std::rc::Rc;

    #[test]
    fn expand_opens_a_door_once_the_key_is_held() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let item = b.item(0, "i0");
        b.door(start, item, "start-i0");
        let k0 = b.reusable_key(0, 1, "k0");
        let gated = b.and_gate("gated");
        b.blocked_door(start, gated, [(k0, 1)], [], "locked");
        let g = Rc::new(b.build().unwrap());

        let state = State::new(Rc::clone(&g)).visit_node(start).unwrap();
        let state = expand(&g, state);
        assert!(!state.is_visited(gated));

        let state = state.place_key(item, k0).unwrap();
        let state = expand(&g, state);
        assert!(state.is_visited(gated));
    }

    #[test]
    fn removable_key_needs_minimum_chain_occurrences() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let k0 = b.removable_key(0, 1, "k0");
        let r1 = b.and_gate("r1");
        b.blocked_door(start, r1, [(k0, 1)], [], "d1");
        let r2 = b.and_gate("r2");
        b.blocked_door(r1, r2, [(k0, 1)], [], "d2");
        let g = Rc::new(b.build().unwrap());

        assert_eq!(g.min_occurrences(k0, r2), 2);
    }
}
