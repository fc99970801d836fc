// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The requirement analyzer: for any target node, computes the set
//! of nodes and reusable keys that are mandatory on *every* path from
//! `start`. Used to seed a fresh segment so the search doesn't spuriously
//! re-place keys that are already guaranteed to be held.
//!
//! Both recursions keep a per-call visited (on-stack) set and treat
//! re-entry as "contributes nothing" — the identity element for the set
//! intersection this analysis folds over, not an empty set. `key_req`
//! intersects over the *substituted* (union-expanded) requirement set, so
//! returning empty on cycle re-entry there correctly treats a cycle as
//! contributing nothing.

use crate::graph::{Graph, KeyId, KeyKind, NodeId};
use std::collections::{HashMap, HashSet};

/// A single guaranteed prerequisite: either a node that must already be
/// visited, or a key that must already be held.
///
/// The `bool` on `Node` marks whether the requirement is "soft" — true
/// for a node that's merely an ancestor on the path (always satisfied by
/// construction), false for a node named explicitly in an edge's
/// `required_nodes`. Only hard (`soft == false`) node requirements survive
/// into the final [`GuaranteedRequirements`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Requirement {
    /// A node that must already be visited.
    Node(NodeId, bool),
    /// A key that must already be held.
    Key(KeyId),
}

/// The guaranteed prerequisites for reaching some target node, folded down
/// to what's useful for seeding a fresh segment: hard node requirements
/// and reusable-key requirements.
#[derive(Clone, Debug, Default)]
pub struct GuaranteedRequirements {
    nodes: Vec<NodeId>,
    reusable_keys: Vec<KeyId>,
}

impl GuaranteedRequirements {
    /// Nodes guaranteed visited on every path into the target.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Reusable keys guaranteed held on every path into the target.
    pub fn reusable_keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.reusable_keys.iter().copied()
    }
}

/// Item → keys-placed-there, as tracked by the running search. The
/// analyzer treats this as an external input rather than owning it: it's
/// a property of the search-in-progress, not of the immutable graph.
pub use crate::state::Placements;

/// Computes `guaranteed(root)`.
pub fn guaranteed(graph: &Graph, placements: &Placements, root: NodeId) -> GuaranteedRequirements {
    let mut node_memo = HashMap::new();
    let root_reqs = node_req(graph, root, &mut HashSet::new(), &mut node_memo);

    let mut key_memo = HashMap::new();
    let mut nodes = Vec::new();
    let mut reusable_keys = Vec::new();

    for req in &root_reqs {
        match *req {
            Requirement::Node(n, soft) => {
                if !soft {
                    nodes.push(n);
                }
            }
            Requirement::Key(k) => {
                if graph.key(k).kind() != KeyKind::Reusable {
                    continue;
                }
                reusable_keys.push(k);
                let expanded = key_req(
                    graph,
                    placements,
                    k,
                    &mut HashSet::new(),
                    &mut key_memo,
                    &mut node_memo,
                );
                for sub in expanded {
                    match sub {
                        Requirement::Node(n, false) => nodes.push(n),
                        Requirement::Node(_, true) => {}
                        Requirement::Key(k2) if graph.key(k2).kind() == KeyKind::Reusable => {
                            reusable_keys.push(k2)
                        }
                        Requirement::Key(_) => {}
                    }
                }
            }
        }
    }

    nodes.sort();
    nodes.dedup();
    reusable_keys.sort();
    reusable_keys.dedup();

    GuaranteedRequirements {
        nodes,
        reusable_keys,
    }
}

/// Computes the guaranteed-requirement set for a single node. `visiting`
/// is the set of nodes currently on the recursion stack for this outer
/// call, used to detect cycles.
fn node_req(
    graph: &Graph,
    n: NodeId,
    visiting: &mut HashSet<NodeId>,
    memo: &mut HashMap<NodeId, HashSet<Requirement>>,
) -> HashSet<Requirement> {
    if let Some(cached) = memo.get(&n) {
        return cached.clone();
    }
    if !visiting.insert(n) {
        // Cycle re-entry: identity for the intersection below, not empty.
        return HashSet::new();
    }

    let result = if n == graph.start() {
        let mut set = HashSet::new();
        set.insert(Requirement::Node(n, true));
        set
    } else {
        let incoming = graph.edges_to(n);
        let mut acc: Option<HashSet<Requirement>> = None;
        for e in &incoming {
            let other = e.inverse(n);
            let mut edge_set = if visiting.contains(&other) {
                HashSet::new()
            } else {
                node_req(graph, other, visiting, memo)
            };
            for rn in e.required_nodes().iter() {
                edge_set.insert(Requirement::Node(*rn, false));
            }
            for (k, _count) in e.required_keys().iter() {
                edge_set.insert(Requirement::Key(k));
            }
            acc = Some(match acc {
                None => edge_set,
                Some(prev) => prev.intersection(&edge_set).copied().collect(),
            });
        }
        let mut set = acc.unwrap_or_default();
        set.insert(Requirement::Node(n, true));
        set
    };

    visiting.remove(&n);
    memo.insert(n, result.clone());
    result
}

/// Computes the guaranteed-requirement set for a single key, over all of
/// its current placements.
fn key_req(
    graph: &Graph,
    placements: &Placements,
    k: KeyId,
    visiting: &mut HashSet<KeyId>,
    memo: &mut HashMap<KeyId, HashSet<Requirement>>,
    node_memo: &mut HashMap<NodeId, HashSet<Requirement>>,
) -> HashSet<Requirement> {
    if let Some(cached) = memo.get(&k) {
        return cached.clone();
    }
    if !visiting.insert(k) {
        // Cycle re-entry: empty, since this recursion intersects over the
        // substituted requirement set rather than the raw one.
        return HashSet::new();
    }

    let items: Vec<NodeId> = placements
        .iter()
        .filter(|(_, keys)| keys.contains(&k))
        .map(|(&item, _)| item)
        .collect();

    let mut acc: Option<HashSet<Requirement>> = None;
    for item in items {
        let item_reqs = node_req(graph, item, &mut HashSet::new(), node_memo);
        let mut expanded = HashSet::new();
        for req in &item_reqs {
            match *req {
                Requirement::Node(_, _) => {
                    expanded.insert(*req);
                }
                Requirement::Key(k2) => {
                    expanded.extend(key_req(graph, placements, k2, visiting, memo, node_memo));
                }
            }
        }
        acc = Some(match acc {
            None => expanded,
            Some(prev) => prev.intersection(&expanded).copied().collect(),
        });
    }

    let result = acc.unwrap_or_default();
    visiting.remove(&k);
    memo.insert(k, result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphBuilder};

    #[test]
    fn guaranteed_includes_hard_ancestor_and_key() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let k0 = b.reusable_key(0, 1, "k0");
        let i0 = b.item(0, "i0");
        b.door(start, i0, "start-i0");
        let gated = b.and_gate("gated");
        b.add_edge(start, gated, EdgeKind::TwoWay, [(k0, 1)], []);

        let g = b.build().unwrap();
        let mut placements = Placements::new();
        placements.insert(i0, vec![k0]);

        let reqs = guaranteed(&g, &placements, gated);
        assert!(reqs.reusable_keys().any(|k| k == k0));
    }

    #[test]
    fn guaranteed_is_empty_for_start() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let g = b.build().unwrap();
        let reqs = guaranteed(&g, &Placements::new(), start);
        assert_eq!(reqs.nodes().count(), 0);
        assert_eq!(reqs.reusable_keys().count(), 0);
    }

    #[test]
    fn cyclic_requirement_graph_does_not_infinite_loop() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let a = b.and_gate("a");
        let c = b.and_gate("c");
        b.door(start, a, "start-a");
        b.add_edge(a, c, EdgeKind::TwoWay, [], [a]);
        b.add_edge(c, a, EdgeKind::TwoWay, [], [c]);

        let g = b.build().unwrap();
        let reqs = guaranteed(&g, &Placements::new(), c);
        // `a` and `c` each gate the other (edge a->c hard-requires `a`,
        // edge c->a hard-requires `c`), so neither hard requirement is
        // common to both paths into `c` and the intersection collapses to
        // the soft self-ancestor only. The analyzer must still terminate
        // rather than loop on the cycle.
        assert_eq!(reqs.nodes().count(), 0);
        assert_eq!(reqs.reusable_keys().count(), 0);
    }
}
