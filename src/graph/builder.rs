// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The input boundary: a mutable fluent builder that accumulates
//! nodes, edges and keys, then freezes them into an immutable [`Graph`].
//!
//! Splits construction into a mutable accumulation step and a `build()`
//! that produces the immutable graph type, the way a dependency-graph
//! library separates its command-building phase from the resolved graph
//! it hands back. Here the builder *is* the public construction API
//! rather than a front end over some external resolver process.

use super::{EdgeData, EdgeKind, EdgeId, Graph, KeyData, KeyId, KeyKind, NodeData, NodeId, NodeKind};
use crate::errors::Error;
use crate::multiset::KeyMultiset;
use crate::sorted_set::SortedSet;
use petgraph::prelude::*;
use std::iter::FromIterator as _;

/// Accumulates nodes, edges and keys for a [`Graph`].
///
/// Every `add_*` call and its convenience wrappers return the identity of
/// what they just created so callers can wire further edges against it.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    inner: petgraph::Graph<NodeData, EdgeData, Directed>,
    keys: Vec<KeyData>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    // ---
    // Primitives
    // ---

    /// Adds a node of the given kind.
    pub fn add_node(&mut self, kind: NodeKind, group: u64, label: impl Into<String>) -> NodeId {
        NodeId(self.inner.add_node(NodeData {
            kind,
            group,
            label: label.into(),
        }))
    }

    /// Adds a directed edge from `source` to `destination`.
    ///
    /// `required_keys` is a multiset expressed as `(key, count)` pairs;
    /// `required_nodes` is the set of nodes that must already be visited.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        destination: NodeId,
        kind: EdgeKind,
        required_keys: impl IntoIterator<Item = (KeyId, u32)>,
        required_nodes: impl IntoIterator<Item = NodeId>,
    ) -> EdgeId {
        self.add_edge_labeled(source, destination, kind, required_keys, required_nodes, "")
    }

    /// As [`GraphBuilder::add_edge`], with an explicit display label.
    pub fn add_edge_labeled(
        &mut self,
        source: NodeId,
        destination: NodeId,
        kind: EdgeKind,
        required_keys: impl IntoIterator<Item = (KeyId, u32)>,
        required_nodes: impl IntoIterator<Item = NodeId>,
        label: impl Into<String>,
    ) -> EdgeId {
        let mut keys = KeyMultiset::new();
        for (key, count) in required_keys {
            keys.add_many(key, count);
        }
        let nodes = SortedSet::from_iter(required_nodes);
        let edge = EdgeData {
            kind,
            required_keys: keys,
            required_nodes: nodes,
            label: label.into(),
        };
        EdgeId(self.inner.add_edge(source.0, destination.0, edge))
    }

    fn add_key(&mut self, kind: KeyKind, group: u64, quantity: u32, label: impl Into<String>) -> KeyId {
        let id = KeyId::new(self.keys.len());
        self.keys.push(KeyData {
            kind,
            group,
            quantity,
            label: label.into(),
        });
        id
    }

    // ---
    // Convenience helpers
    // ---

    /// Adds an `AndGate` node: reachable once every incoming edge's
    /// requirements are met.
    pub fn and_gate(&mut self, label: impl Into<String>) -> NodeId {
        self.add_node(NodeKind::AndGate, 0, label)
    }

    /// Adds an `OrGate` node: reachable via any single satisfied incoming
    /// edge.
    pub fn or_gate(&mut self, label: impl Into<String>) -> NodeId {
        self.add_node(NodeKind::OrGate, 0, label)
    }

    /// Adds an `Item` node, able to host a key placement in zone `group`.
    pub fn item(&mut self, group: u64, label: impl Into<String>) -> NodeId {
        self.add_node(NodeKind::Item, group, label)
    }

    /// Adds a reusable key.
    pub fn reusable_key(&mut self, group: u64, quantity: u32, label: impl Into<String>) -> KeyId {
        self.add_key(KeyKind::Reusable, group, quantity, label)
    }

    /// Adds a consumable key.
    pub fn consumable_key(&mut self, group: u64, quantity: u32, label: impl Into<String>) -> KeyId {
        self.add_key(KeyKind::Consumable, group, quantity, label)
    }

    /// Adds a removable key.
    pub fn removable_key(&mut self, group: u64, quantity: u32, label: impl Into<String>) -> KeyId {
        self.add_key(KeyKind::Removable, group, quantity, label)
    }

    /// Adds a free (unlocked) two-way passage between two existing nodes.
    pub fn door(&mut self, from: NodeId, to: NodeId, label: impl Into<String>) -> EdgeId {
        self.add_edge_labeled(from, to, EdgeKind::TwoWay, [], [], label)
    }

    /// Adds a locked two-way passage between two existing nodes.
    pub fn blocked_door(
        &mut self,
        from: NodeId,
        to: NodeId,
        required_keys: impl IntoIterator<Item = (KeyId, u32)>,
        required_nodes: impl IntoIterator<Item = NodeId>,
        label: impl Into<String>,
    ) -> EdgeId {
        self.add_edge_labeled(from, to, EdgeKind::TwoWay, required_keys, required_nodes, label)
    }

    /// Adds a new `OneWay` node reachable only forward from `from`; the
    /// destination may later fork and rejoin an ancestor segment.
    pub fn one_way(
        &mut self,
        from: NodeId,
        required_keys: impl IntoIterator<Item = (KeyId, u32)>,
        required_nodes: impl IntoIterator<Item = NodeId>,
        group: u64,
        label: impl Into<String>,
    ) -> (NodeId, EdgeId) {
        let label = label.into();
        let to = self.add_node(NodeKind::OneWay, group, label.clone());
        let edge = self.add_edge_labeled(from, to, EdgeKind::OneWay, required_keys, required_nodes, label);
        (to, edge)
    }

    /// Adds a new `NoReturn` node reachable only forward from `from`; the
    /// destination begins a fresh segment that never rejoins.
    pub fn no_return(
        &mut self,
        from: NodeId,
        required_keys: impl IntoIterator<Item = (KeyId, u32)>,
        required_nodes: impl IntoIterator<Item = NodeId>,
        group: u64,
        label: impl Into<String>,
    ) -> (NodeId, EdgeId) {
        let label = label.into();
        let to = self.add_node(NodeKind::NoReturn, group, label.clone());
        let edge = self.add_edge_labeled(from, to, EdgeKind::NoReturn, required_keys, required_nodes, label);
        (to, edge)
    }

    /// Freezes the builder into an immutable [`Graph`].
    ///
    /// The start node is fixed as the first `AndGate` with no incoming
    /// edges, in insertion order. Fails if no such node exists.
    pub fn build(self) -> Result<Graph, Error> {
        let start = self
            .inner
            .node_indices()
            .find(|&ix| {
                self.inner[ix].kind == NodeKind::AndGate
                    && self
                        .inner
                        .edges_directed(ix, Direction::Incoming)
                        .next()
                        .is_none()
            })
            .map(NodeId)
            .ok_or_else(|| {
                Error::GraphConstructError(
                    "no AndGate node with no incoming requirements to serve as start".to_string(),
                )
            })?;

        Ok(Graph::new(self.inner, self.keys, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_unlocked_and_gate_as_start() {
        let mut b = GraphBuilder::new();
        let locked = b.and_gate("locked");
        let start = b.and_gate("start");
        b.door(start, locked, "d");
        let g = b.build().unwrap();
        assert_eq!(g.start(), start);
    }

    #[test]
    fn build_fails_with_no_viable_start() {
        let mut b = GraphBuilder::new();
        let a = b.and_gate("a");
        let c = b.and_gate("c");
        // Every AndGate has an incoming requirement; no viable start.
        b.blocked_door(a, c, [], [a], "locked");
        b.blocked_door(c, a, [], [c], "locked2");
        assert!(b.build().is_err());
    }
}
