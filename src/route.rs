// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The output boundary: a read-only snapshot of what
//! [`crate::driver::RouteFinder::find`] produced — which item holds which
//! key, whether every node was actually visited, and a way to re-validate
//! the placement ledger independently via the route solver.

use crate::graph::{EdgeKind, Graph, KeyId, NodeId};
use crate::solver::{self, RouteSolverResult};
use crate::state::{Placements, State};
use std::fmt::Write as _;
use std::rc::Rc;

/// A concrete, provably-solvable-or-not assignment of keys to item slots,
/// plus the traversal order that assignment implies.
///
/// Produced once by [`crate::driver::RouteFinder::find`] and never
/// mutated afterwards — every accessor here is a read-only query over the
/// placement ledger the search left behind.
#[derive(Debug)]
pub struct Route {
    graph: Rc<Graph>,
    placements: Placements,
    all_nodes_visited: bool,
}

impl Route {
    pub(crate) fn new(graph: Rc<Graph>, state: &State, all_nodes_visited: bool) -> Self {
        Route {
            graph,
            placements: state.item_to_key().clone(),
            all_nodes_visited,
        }
    }

    /// Whether the search visited every node in the graph with `next` and
    /// `one_way` both fully drained. `false`
    /// means the search hit a dead end; it is not an error — the
    /// placements here are still the best partial attempt found.
    pub fn all_nodes_visited(&self) -> bool {
        self.all_nodes_visited
    }

    /// The graph this route was computed over.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The key placed at `item`, if any. When a node hosts more than one
    /// key across the run (possible once a reusable key gets placed again
    /// in a later segment past a `NoReturn` edge), this returns the
    /// first (principal) placement rather than the full list — use
    /// [`Route::get_items_containing_key`] from the key's side to see
    /// every placement.
    pub fn get_item_contents(&self, item: NodeId) -> Option<KeyId> {
        self.placements.get(&item).and_then(|keys| keys.first().copied())
    }

    /// Every item node at which `key` was placed, across every segment of
    /// the run, in node-identity order.
    pub fn get_items_containing_key(&self, key: KeyId) -> impl Iterator<Item = NodeId> + '_ {
        self.placements
            .iter()
            .filter(move |(_, keys)| keys.contains(&key))
            .map(|(&item, _)| item)
    }

    /// Re-validates this route's placement ledger against the independent
    /// pessimistic-player route solver, from scratch.
    pub fn solve(&self) -> RouteSolverResult {
        solver::solve(&self.graph, &self.placements)
    }

    /// A small Mermaid flowchart of the graph, annotated with which key
    /// (if any) each item node ended up holding. Intended for humans
    /// debugging a route, not for machine consumption.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "flowchart TD");
        for node in self.graph.nodes() {
            let data = self.graph.node(node);
            let label = match (data.kind().is_item(), self.get_item_contents(node)) {
                (true, Some(key)) => format!("{} [{}]", data.label(), self.graph.key(key).label()),
                (true, None) => format!("{} (empty)", data.label()),
                (false, _) => data.label().to_string(),
            };
            let _ = writeln!(out, "    N{}[\"{}\"]", node_ix(node), label);
        }
        let mut drawn = std::collections::HashSet::new();
        for node in self.graph.nodes() {
            for edge in self.graph.edges_from(node) {
                if !drawn.insert(edge.id) {
                    // Two-way edges show up from both endpoints; draw once.
                    continue;
                }
                let arrow = if edge.kind() == EdgeKind::TwoWay { "---" } else { "-->" };
                let _ = writeln!(out, "    N{} {} N{}", node_ix(edge.from), arrow, node_ix(edge.to));
            }
        }
        out
    }
}

fn node_ix(n: NodeId) -> usize {
    n.index()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RouteFinder;
    use crate::graph::{EdgeKind, GraphBuilder};
    use crate::options::RouteFinderOptions;

    #[test]
    fn get_item_contents_round_trips_a_placement() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let item = b.item(0, "i0");
        b.door(start, item, "start-i0");
        let k0 = b.reusable_key(0, 1, "k0");
        let gated = b.and_gate("gated");
        b.add_edge(start, gated, EdgeKind::TwoWay, [(k0, 1)], [start]);
        let g = b.build().unwrap();

        let mut finder = RouteFinder::new(g, RouteFinderOptions::new(7));
        let route = finder.find().unwrap();

        assert!(route.all_nodes_visited());
        assert_eq!(route.get_item_contents(item), Some(k0));
        assert_eq!(route.get_items_containing_key(k0).collect::<Vec<_>>(), vec![item]);
    }

    #[test]
    fn to_mermaid_includes_every_node_label() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let item = b.item(0, "i0");
        b.door(start, item, "start-i0");
        let g = b.build().unwrap();

        let mut finder = RouteFinder::new(g, RouteFinderOptions::new(1));
        let route = finder.find().unwrap();
        let dump = route.to_mermaid();
        assert!(dump.contains("start"));
        assert!(dump.contains("i0"));
    }
}
