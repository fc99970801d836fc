// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The graph model: immutable nodes, edges and keys,
//! plus adjacency queries. See [`GraphBuilder`] for how a [`Graph`] gets
//! constructed; nothing in here mutates once `build()` has run.

mod builder;

pub use builder::GraphBuilder;

use crate::multiset::KeyMultiset;
use crate::sorted_set::SortedSet;
use once_cell::sync::OnceCell;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies a [`Graph`] node. Opaque outside this crate; obtained from
/// [`GraphBuilder`] or from [`Graph`] iteration methods.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(NodeIndex);

impl NodeId {
    /// This node's dense index, usable as a bit position in a visited set.
    pub(crate) fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0.index())
    }
}

/// Identifies a key definition within a [`Graph`].
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KeyId(u32);

impl KeyId {
    fn new(ix: usize) -> Self {
        KeyId(ix as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(n: u32) -> Self {
        KeyId(n)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.0)
    }
}

/// Identifies a [`Graph`] edge.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EdgeId(EdgeIndex);

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0.index())
    }
}

/// The kind of a node; determines whether it can host a key (`Item`) and
/// documents how it's reached (the actual traversal rule lives on the
/// edges that lead to it — see [`EdgeKind`]).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    /// Reachable once every incoming requirement is satisfied.
    AndGate,
    /// Reachable via any single satisfied incoming edge.
    OrGate,
    /// Can host a key placement.
    Item,
    /// The far side of a `OneWay` edge; may fork and later rejoin.
    OneWay,
    /// The far side of a `NoReturn` edge; begins a fresh segment.
    NoReturn,
}

impl NodeKind {
    /// A node can host a key placement iff it's an `Item`.
    pub fn is_item(self) -> bool {
        matches!(self, NodeKind::Item)
    }
}

/// The kind of a key.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyKind {
    /// Persists through the segment (and descendants) once obtained.
    Reusable,
    /// Spent upon traversing the edge that consumed it.
    Consumable,
    /// Required in a count equal to the minimum multiplicity on any path
    /// from `start` to the gated node.
    Removable,
}

/// The kind of an edge.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EdgeKind {
    /// Traversable in either direction once its requirements are met.
    TwoWay,
    /// Traversable source-to-destination only; the destination may later
    /// rejoin the segment that opened it.
    OneWay,
    /// Traversable source-to-destination only; the destination begins a
    /// fresh segment that never rejoins.
    NoReturn,
}

/// Node payload stored in the underlying graph.
#[derive(Clone, Debug)]
pub struct NodeData {
    kind: NodeKind,
    group: u64,
    label: String,
}

impl NodeData {
    /// This node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// This node's zone bitmask (only meaningful for `Item` nodes).
    pub fn group(&self) -> u64 {
        self.group
    }

    /// This node's display label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Key payload stored in the underlying graph.
#[derive(Clone, Debug)]
pub struct KeyData {
    kind: KeyKind,
    group: u64,
    quantity: u32,
    label: String,
}

impl KeyData {
    /// This key's kind.
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// This key's zone bitmask.
    pub fn group(&self) -> u64 {
        self.group
    }

    /// How many tokens this key represents when referenced by a single
    /// edge requirement (e.g. a requirement of `(k, k)` is `quantity: 2`).
    pub fn quantity(&self) -> u32 {
        self.quantity.max(1)
    }

    /// This key's display label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Edge payload stored in the underlying graph.
#[derive(Clone, Debug)]
pub struct EdgeData {
    kind: EdgeKind,
    required_keys: KeyMultiset,
    required_nodes: SortedSet<NodeId>,
    label: String,
}

impl EdgeData {
    /// This edge's kind.
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// The multiset of keys this edge requires.
    pub fn required_keys(&self) -> &KeyMultiset {
        &self.required_keys
    }

    /// The nodes that must already be visited for this edge to be usable.
    pub fn required_nodes(&self) -> &SortedSet<NodeId> {
        &self.required_nodes
    }

    /// This edge's display label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A directed edge, oriented from the perspective of a particular
/// endpoint: `from` is always the side the caller asked about, `to` is
/// the other side — regardless of which way the underlying petgraph edge
/// actually points. Two-way edges are returned from both
/// [`Graph::edges_from`] and [`Graph::edges_to`] queries on either
/// endpoint; one-way and no-return edges only appear oriented
/// source-to-destination.
#[derive(Clone, Copy, Debug)]
pub struct Edge<'g> {
    /// This edge's identity.
    pub id: EdgeId,
    /// The endpoint the query was issued against.
    pub from: NodeId,
    /// The other endpoint.
    pub to: NodeId,
    data: &'g EdgeData,
}

impl<'g> Edge<'g> {
    /// This edge's kind.
    pub fn kind(&self) -> EdgeKind {
        self.data.kind
    }

    /// The multiset of keys this edge requires.
    pub fn required_keys(&self) -> &'g KeyMultiset {
        &self.data.required_keys
    }

    /// The nodes that must already be visited for this edge to be usable.
    pub fn required_nodes(&self) -> &'g SortedSet<NodeId> {
        &self.data.required_nodes
    }

    /// Returns the endpoint opposite `n` (which must be one of `from`/`to`).
    pub fn inverse(&self, n: NodeId) -> NodeId {
        if n == self.from {
            self.to
        } else {
            debug_assert_eq!(n, self.to);
            self.from
        }
    }

    /// This edge's display label.
    pub fn label(&self) -> &'g str {
        &self.data.label
    }
}

/// An immutable directed graph of rooms, locked edges and item locations.
///
/// Constructed once via [`GraphBuilder::build`] and never mutated
/// afterwards; every search (`RouteFinder::find`) reads the same `Graph`
/// through a shared reference, so it may be reused across concurrent
/// searches from distinct engine instances.
#[derive(Debug)]
pub struct Graph {
    inner: petgraph::Graph<NodeData, EdgeData, Directed>,
    keys: Vec<KeyData>,
    start: NodeId,
    // Lazily computed and cached forever: the table only depends on
    // immutable graph structure, never on search-in-progress state, so
    // it's safe to compute once on first use and reuse across every
    // `is_satisfied` check for the life of a search (and across
    // searches, since `Graph` itself may be shared).
    min_occurrences_cache: OnceCell<HashMap<(KeyId, NodeId), u32>>,
}

impl Graph {
    pub(crate) fn new(
        inner: petgraph::Graph<NodeData, EdgeData, Directed>,
        keys: Vec<KeyData>,
        start: NodeId,
    ) -> Self {
        Self {
            inner,
            keys,
            start,
            min_occurrences_cache: OnceCell::new(),
        }
    }

    /// The distinguished start node: the first `AndGate` with no incoming
    /// requirements, as fixed by the builder.
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// Iterates over every node in the graph, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_indices().map(NodeId)
    }

    /// The total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Iterates over every key definition in the graph, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        (0..self.keys.len()).map(KeyId::new)
    }

    /// Looks up a node's payload.
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.inner[id.0]
    }

    /// Looks up a key's payload.
    pub fn key(&self, id: KeyId) -> &KeyData {
        &self.keys[id.index()]
    }

    /// Looks up an edge's payload.
    pub fn edge(&self, id: EdgeId) -> &EdgeData {
        &self.inner[id.0]
    }

    /// The edge's true `(source, destination)` pair, independent of which
    /// endpoint a caller queried it from. `TwoWay` edges remain navigable
    /// from either side, but the underlying direction — and hence which
    /// side is "the destination" for `min_occurrences` purposes — is
    /// fixed at construction.
    pub(crate) fn endpoints(&self, id: EdgeId) -> (NodeId, NodeId) {
        let (source, target) = self
            .inner
            .edge_endpoints(id.0)
            .expect("EdgeId always refers to a live edge in this graph");
        (NodeId(source), NodeId(target))
    }

    /// The minimum number of tokens of `key` that any acyclic path from
    /// `start` to `target` sums across its edges' `required_keys`
    /// (used for removable-key satisfaction). Computed once for every
    /// `(key, node)` pair the first time any removable key is queried,
    /// then served out of [`Graph::min_occurrences_cache`] for the
    /// remainder of the search.
    pub(crate) fn min_occurrences(&self, key: KeyId, target: NodeId) -> u32 {
        let table = self.min_occurrences_cache.get_or_init(|| self.build_min_occurrences_table());
        table.get(&(key, target)).copied().unwrap_or(0)
    }

    fn build_min_occurrences_table(&self) -> HashMap<(KeyId, NodeId), u32> {
        let mut table = HashMap::new();
        for key in self.keys() {
            if self.key(key).kind() != KeyKind::Removable {
                continue;
            }
            for node in self.nodes() {
                let mut visiting = HashSet::new();
                let mut memo = HashMap::new();
                let value = self.min_occurrences_rec(key, node, &mut visiting, &mut memo);
                table.insert((key, node), value);
            }
        }
        table
    }

    fn min_occurrences_rec(
        &self,
        key: KeyId,
        target: NodeId,
        visiting: &mut HashSet<NodeId>,
        memo: &mut HashMap<NodeId, u32>,
    ) -> u32 {
        if let Some(&cached) = memo.get(&target) {
            return cached;
        }
        if target == self.start {
            return 0;
        }
        if !visiting.insert(target) {
            return u32::MAX;
        }

        let mut best = u32::MAX;
        for edge in self.edges_to(target) {
            let from_other = self.min_occurrences_rec(key, edge.from, visiting, memo);
            if from_other == u32::MAX {
                continue;
            }
            let here = edge.required_keys().count(key);
            best = best.min(from_other.saturating_add(here));
        }

        visiting.remove(&target);
        let result = if best == u32::MAX { 0 } else { best };
        memo.insert(target, result);
        result
    }

    /// Returns every edge applicable from `n`: edges whose source-side
    /// (respecting edge direction) is `n`. Two-way edges incident on `n`
    /// are included regardless of which side stored them as the petgraph
    /// source, oriented so `from == n`.
    pub fn edges_from(&self, n: NodeId) -> Vec<Edge<'_>> {
        let mut out: Vec<Edge<'_>> = self
            .inner
            .edges_directed(n.0, Direction::Outgoing)
            .map(|e| Edge {
                id: EdgeId(e.id()),
                from: n,
                to: NodeId(e.target()),
                data: e.weight(),
            })
            .collect();
        out.extend(
            self.inner
                .edges_directed(n.0, Direction::Incoming)
                .filter(|e| e.weight().kind == EdgeKind::TwoWay)
                .map(|e| Edge {
                    id: EdgeId(e.id()),
                    from: n,
                    to: NodeId(e.source()),
                    data: e.weight(),
                }),
        );
        out
    }

    /// Returns every edge applicable to `n`: edges whose destination-side
    /// (respecting edge direction) is `n`. The dual of [`Graph::edges_from`].
    pub fn edges_to(&self, n: NodeId) -> Vec<Edge<'_>> {
        let mut out: Vec<Edge<'_>> = self
            .inner
            .edges_directed(n.0, Direction::Incoming)
            .map(|e| Edge {
                id: EdgeId(e.id()),
                from: NodeId(e.source()),
                to: n,
                data: e.weight(),
            })
            .collect();
        out.extend(
            self.inner
                .edges_directed(n.0, Direction::Outgoing)
                .filter(|e| e.weight().kind == EdgeKind::TwoWay)
                .map(|e| Edge {
                    id: EdgeId(e.id()),
                    from: NodeId(e.target()),
                    to: n,
                    data: e.weight(),
                }),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_way_edge_is_applicable_from_both_ends() {
        let mut b = GraphBuilder::new();
        let a = b.and_gate("a");
        let c = b.and_gate("c");
        b.door(a, c, "a-c");
        let g = b.build().unwrap();

        assert_eq!(g.edges_from(a).len(), 1);
        assert_eq!(g.edges_from(c).len(), 1);
        assert_eq!(g.edges_from(a)[0].to, c);
        assert_eq!(g.edges_from(c)[0].to, a);
    }

    #[test]
    fn one_way_edge_is_one_directional() {
        let mut b = GraphBuilder::new();
        let a = b.and_gate("a");
        let (c, _e) = b.one_way(a, [], [], 0, "c");
        let g = b.build().unwrap();

        assert_eq!(g.edges_from(a).len(), 1);
        assert_eq!(g.edges_from(c).len(), 0);
        assert_eq!(g.edges_to(c).len(), 1);
        assert_eq!(g.edges_to(a).len(), 0);
    }
}
