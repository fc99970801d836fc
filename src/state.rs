// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persistent search state: a cheaply-snapshotted value the driver
//! forks before every speculative placement and either keeps or
//! discards, plus the item→key placement ledger that, unlike the rest of
//! the state, is never reset or forked away — placements are permanent for
//! the life of a search.
//!
//! Snapshots are cheap because most of a `State` is behind an `Rc`:
//! `clone()` is a handful of refcount bumps, not a deep copy, so forking
//! speculatively and discarding on backtrack never pays for a deep-copy
//! of the visited set or the key multiset.

use crate::debug_ignore::DebugIgnore;
use crate::errors::Error;
use crate::graph::{EdgeId, Graph, KeyId, KeyKind, NodeId, NodeKind};
use crate::multiset::KeyMultiset;
use fixedbitset::FixedBitSet;
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;

/// Credited to `keys` the moment a reusable key is obtained. Owning a
/// reusable key once covers every multiplicity an edge could ever
/// require of it — rather than special-case reusable lookups throughout
/// `is_satisfied`, a reusable
/// key is credited with enough tokens that no realistic edge requirement
/// could ever exhaust it, and (unlike consumable keys) nothing in this
/// module ever debits a reusable key's count back down.
const REUSABLE_KEY_CREDIT: u32 = 1 << 20;

/// One segment's worth of mutable search bookkeeping: the part of `State`
/// that gets reset fresh by [`State::clear`]/[`State::fork`] and unioned
/// back into an ancestor by [`State::join`].
#[derive(Clone, Debug)]
struct Segment {
    visited: FixedBitSet,
    keys: KeyMultiset,
    next: IndexSet<EdgeId>,
    one_way: IndexSet<EdgeId>,
    spare_items: IndexSet<NodeId>,
}

impl Segment {
    fn empty(node_count: usize) -> Self {
        Self {
            visited: FixedBitSet::with_capacity(node_count),
            keys: KeyMultiset::new(),
            next: IndexSet::new(),
            one_way: IndexSet::new(),
            spare_items: IndexSet::new(),
        }
    }
}

/// Item → keys placed there so far, across the whole search. Placements
/// only ever grow; unlike `Segment`, this ledger is shared unchanged
/// across every fork and survives `clear`/`join`.
pub type Placements = IndexMap<NodeId, Vec<KeyId>>;

/// The search's persistent state. Cheap to `clone()`; mutating operations
/// all take `&self` and return a new `State` rather than mutating in
/// place, matching the fork/rewind control flow the driver needs.
#[derive(Clone)]
pub struct State {
    graph: DebugIgnore<Rc<Graph>>,
    segment: Rc<Segment>,
    item_to_key: Rc<Placements>,
    parent: Option<Rc<State>>,
    // Every node ever visited, anywhere in the search so far — unlike
    // `segment.visited`, this is never reset by `clear`/`fork` and never
    // shrinks, so it survives `NoReturn` segment boundaries (which drop the
    // parent chain entirely) the same way `item_to_key` does. It's what the
    // "has every node been visited" termination check needs: segment
    // boundaries are an implementation detail of how the search explores
    // the graph, not a scope the final answer should be sensitive to.
    ever_visited: Rc<FixedBitSet>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("visited_count", &self.segment.visited.count_ones(..))
            .field("ever_visited_count", &self.ever_visited.count_ones(..))
            .field("keys", &self.segment.keys)
            .field("next", &self.segment.next.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl State {
    /// Creates the initial, empty state for a fresh search over `graph`.
    pub fn new(graph: Rc<Graph>) -> Self {
        let node_count = graph.node_count();
        State {
            segment: Rc::new(Segment::empty(node_count)),
            item_to_key: Rc::new(Placements::new()),
            parent: None,
            ever_visited: Rc::new(FixedBitSet::with_capacity(node_count)),
            graph: DebugIgnore(graph),
        }
    }

    /// Current item→keys placement ledger.
    pub fn item_to_key(&self) -> &Placements {
        &self.item_to_key
    }

    /// Every key currently held, reusable and otherwise.
    pub fn keys(&self) -> &KeyMultiset {
        &self.segment.keys
    }

    /// Edges known reachable but not yet satisfied in the current segment.
    pub fn next(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.segment.next.iter().copied()
    }

    /// Items visited in the current segment with no placement yet.
    pub fn spare_items(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.segment.spare_items.iter().copied()
    }

    /// One-way edges opened in the current segment, awaiting a later
    /// rejoin.
    pub fn one_way_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.segment.one_way.iter().copied()
    }

    /// Whether `n` has been visited in the current segment.
    pub fn is_visited(&self, n: NodeId) -> bool {
        self.segment.visited.contains(n.index())
    }

    /// Whether `n` has been visited at any point in the search so far, in
    /// the current segment or in any earlier one — including segments
    /// entered via `NoReturn` (and hence `clear`, which drops the parent
    /// chain entirely). [`State::is_visited`] only consults the current
    /// segment, which under-counts: "has every node been reached" is a
    /// property of the whole run, not of whichever segment happens to be
    /// current when the question is asked.
    pub fn is_visited_anywhere(&self, n: NodeId) -> bool {
        self.ever_visited.contains(n.index())
    }

    /// Resets to a fresh segment with no parent, seeded with `visited`,
    /// `keys` and `next` (typically the output of the requirement
    /// analyzer). Used to start an independent segment, e.g. past a
    /// `NoReturn` edge.
    pub fn clear(
        &self,
        visited: impl IntoIterator<Item = NodeId>,
        keys: impl IntoIterator<Item = KeyId>,
        next: impl IntoIterator<Item = EdgeId>,
    ) -> State {
        self.seed(visited, keys, next, None)
    }

    /// As [`State::clear`], but keeps `self` as the new segment's parent so
    /// a later [`State::join`] can merge it back in. Used past a `OneWay`
    /// edge, which may later rejoin.
    pub fn fork(
        &self,
        visited: impl IntoIterator<Item = NodeId>,
        keys: impl IntoIterator<Item = KeyId>,
        next: impl IntoIterator<Item = EdgeId>,
    ) -> State {
        self.seed(visited, keys, next, Some(Rc::new(self.clone())))
    }

    fn seed(
        &self,
        visited: impl IntoIterator<Item = NodeId>,
        keys: impl IntoIterator<Item = KeyId>,
        next: impl IntoIterator<Item = EdgeId>,
        parent: Option<Rc<State>>,
    ) -> State {
        let mut segment = Segment::empty(self.graph.node_count());
        for n in visited {
            segment.visited.insert(n.index());
        }
        for key in keys {
            self.credit_key(&mut segment.keys, key);
        }
        segment.next.extend(next);
        State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(segment),
            item_to_key: Rc::clone(&self.item_to_key),
            parent,
            ever_visited: Rc::clone(&self.ever_visited),
        }
    }

    /// Marks `n` visited, folding in any existing placement and opening its
    /// applicable outgoing edges into `next`.
    ///
    /// If `n` was already visited by some ancestor segment, this instead
    /// rejoins that ancestor via [`State::join`] rather than recording a
    /// second, shadowing visit.
    pub fn visit_node(&self, n: NodeId) -> Result<State, Error> {
        if self.segment.visited.contains(n.index()) {
            return Ok(self.clone());
        }

        let mut ancestor = self.parent.clone();
        while let Some(anc) = ancestor {
            if anc.segment.visited.contains(n.index()) {
                return self.join(&anc);
            }
            ancestor = anc.parent.clone();
        }

        let mut segment = (*self.segment).clone();
        segment.visited.insert(n.index());

        let node = self.graph.node(n);
        if node.kind() == NodeKind::Item {
            if let Some(placed) = self.item_to_key.get(&n) {
                for &key in placed {
                    self.credit_key(&mut segment.keys, key);
                }
            } else {
                segment.spare_items.insert(n);
            }
        }

        for edge in self.graph.edges_from(n) {
            if !segment.visited.contains(edge.to.index()) {
                segment.next.insert(edge.id);
            }
        }

        self.prune_resolved_edges(&mut segment);

        let mut ever_visited = (*self.ever_visited).clone();
        ever_visited.insert(n.index());

        Ok(State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(segment),
            item_to_key: Rc::clone(&self.item_to_key),
            parent: self.parent.clone(),
            ever_visited: Rc::new(ever_visited),
        })
    }

    /// Removes from `segment.next` every edge whose true endpoints
    /// (independent of which side is currently being visited from) are
    /// both now visited in `segment` — the §3 invariant that `next`
    /// contains no edge both of whose endpoints are visited. A node can
    /// become visited by a route other than the one that first queued an
    /// edge incident on it (e.g. a `TwoWay` traversal from the far end, or
    /// another incoming edge into an `AndGate`), which would otherwise
    /// strand that edge in `next` forever, unsatisfied and unsatisfiable,
    /// blocking the "`next` empty" termination check indefinitely.
    fn prune_resolved_edges(&self, segment: &mut Segment) {
        let visited = segment.visited.clone();
        let graph = &self.graph;
        segment.next.retain(|&e| {
            let (a, b) = graph.endpoints(e);
            !(visited.contains(a.index()) && visited.contains(b.index()))
        });
    }

    /// Places `key` at `item`, which must currently be a spare item.
    pub fn place_key(&self, item: NodeId, key: KeyId) -> Result<State, Error> {
        if !self.segment.spare_items.contains(&item) {
            return Err(Error::InvariantViolation(format!(
                "place_key: {:?} is not a spare item in the current segment",
                item
            )));
        }
        let mut segment = (*self.segment).clone();
        segment.spare_items.remove(&item);
        self.credit_key(&mut segment.keys, key);

        let mut item_to_key = (*self.item_to_key).clone();
        item_to_key.entry(item).or_default().push(key);

        Ok(State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(segment),
            item_to_key: Rc::new(item_to_key),
            parent: self.parent.clone(),
            ever_visited: Rc::clone(&self.ever_visited),
        })
    }

    /// Consumes `edge`: removes it from `next` and spends one token of
    /// each key in `consumed` (consumable/removable unlock costs).
    pub fn use_key(&self, edge: EdgeId, consumed: impl IntoIterator<Item = KeyId>) -> State {
        let mut segment = (*self.segment).clone();
        segment.next.remove(&edge);
        for key in consumed {
            segment.keys.remove_many(key, 1);
        }
        State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(segment),
            item_to_key: Rc::clone(&self.item_to_key),
            parent: self.parent.clone(),
            ever_visited: Rc::clone(&self.ever_visited),
        }
    }

    /// Records that `edge` (a `OneWay` edge just taken) is awaiting a
    /// rejoin.
    pub fn add_one_way(&self, edge: EdgeId) -> State {
        let mut segment = (*self.segment).clone();
        segment.one_way.insert(edge);
        State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(segment),
            item_to_key: Rc::clone(&self.item_to_key),
            parent: self.parent.clone(),
            ever_visited: Rc::clone(&self.ever_visited),
        }
    }

    /// Clears a prior [`State::add_one_way`] marker, typically once the
    /// forked segment has rejoined.
    pub fn remove_one_way(&self, edge: EdgeId) -> State {
        let mut segment = (*self.segment).clone();
        segment.one_way.remove(&edge);
        State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(segment),
            item_to_key: Rc::clone(&self.item_to_key),
            parent: self.parent.clone(),
            ever_visited: Rc::clone(&self.ever_visited),
        }
    }

    fn credit_key(&self, keys: &mut KeyMultiset, key: KeyId) {
        match self.graph.key(key).kind() {
            KeyKind::Reusable => keys.add_many(key, REUSABLE_KEY_CREDIT),
            KeyKind::Consumable | KeyKind::Removable => keys.add_many(key, self.graph.key(key).quantity()),
        }
    }

    /// Registers `(item, key)` directly into `item_to_key` without the
    /// spare-item precondition [`State::place_key`] enforces. Used only by
    /// the route solver, which re-validates a completed placement
    /// ledger from an empty state rather than threading placements
    /// through the driver's own spare-item bookkeeping.
    pub(crate) fn seed_placement(&self, item: NodeId, key: KeyId) -> State {
        let mut item_to_key = (*self.item_to_key).clone();
        item_to_key.entry(item).or_default().push(key);
        State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::clone(&self.segment),
            item_to_key: Rc::new(item_to_key),
            parent: self.parent.clone(),
            ever_visited: Rc::clone(&self.ever_visited),
        }
    }

    /// Merges the current segment back into `ancestor`: unions `visited`,
    /// `keys`, `next`, `one_way` and `spare_items` across every segment
    /// from `self` up to (and including) `ancestor`, and reparents the
    /// result onto `ancestor`'s own parent. `item_to_key` needs no
    /// merging — it was never forked away in the first place, so `self`'s
    /// copy is already the up-to-date one.
    ///
    /// `ancestor` must actually appear somewhere in `self`'s parent chain;
    /// this is an internal invariant, not a condition on caller input, so
    /// a missing ancestor is reported as [`Error::InvariantViolation`]
    /// rather than threaded through as an ordinary `None`/`Err` the caller
    /// is expected to handle.
    pub fn join(&self, ancestor: &Rc<State>) -> Result<State, Error> {
        let mut merged = (*self.segment).clone();

        let mut cur: &State = self;
        loop {
            match &cur.parent {
                Some(p) if Rc::ptr_eq(p, ancestor) => break,
                Some(p) => {
                    merged.visited.union_with(&p.segment.visited);
                    merged.keys.union_with(&p.segment.keys);
                    merged.next.extend(p.segment.next.iter().copied());
                    merged.one_way.extend(p.segment.one_way.iter().copied());
                    merged
                        .spare_items
                        .extend(p.segment.spare_items.iter().copied());
                    cur = p;
                }
                None => {
                    return Err(Error::InvariantViolation(
                        "join: ancestor not found in parent chain".to_string(),
                    ))
                }
            }
        }

        merged.visited.union_with(&ancestor.segment.visited);
        merged.keys.union_with(&ancestor.segment.keys);
        merged.next.extend(ancestor.segment.next.iter().copied());
        merged
            .one_way
            .extend(ancestor.segment.one_way.iter().copied());
        merged
            .spare_items
            .extend(ancestor.segment.spare_items.iter().copied());

        self.prune_resolved_edges(&mut merged);

        Ok(State {
            graph: DebugIgnore(Rc::clone(&self.graph)),
            segment: Rc::new(merged),
            item_to_key: Rc::clone(&self.item_to_key),
            parent: ancestor.parent.clone(),
            ever_visited: Rc::clone(&self.ever_visited),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn small_graph() -> Rc<Graph> {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let i0 = b.item(0, "i0");
        b.door(start, i0, "start-i0");
        Rc::new(b.build().unwrap())
    }

    #[test]
    fn visit_node_opens_outgoing_edges_and_collects_spare_items() {
        let g = small_graph();
        let start = g.start();
        let state = State::new(Rc::clone(&g)).visit_node(start).unwrap();
        assert_eq!(state.next().count(), 1);
    }

    #[test]
    fn place_key_moves_item_out_of_spare_and_into_keys() {
        let mut b = GraphBuilder::new();
        let start = b.and_gate("start");
        let item = b.item(0, "i0");
        b.door(start, item, "start-i0");
        let key = b.reusable_key(0, 1, "k0");
        let g = Rc::new(b.build().unwrap());

        let state = State::new(Rc::clone(&g)).visit_node(start).unwrap();
        let edge = state.next().next().unwrap();
        let state = state.use_key(edge, []);
        let state = state.visit_node(item).unwrap();
        assert!(state.spare_items().any(|n| n == item));

        let state = state.place_key(item, key).unwrap();
        assert!(!state.spare_items().any(|n| n == item));
        assert!(state.keys().contains(key));
        assert_eq!(state.item_to_key().get(&item).unwrap(), &vec![key]);
    }

    #[test]
    fn join_unions_ancestor_segments_and_reparents() {
        let g = small_graph();
        let start = g.start();
        let base = State::new(Rc::clone(&g)).visit_node(start).unwrap();
        let forked = base.fork([], [], []);
        let ancestor = match &forked.parent {
            Some(p) => Rc::clone(p),
            None => panic!("fork must set a parent"),
        };
        let joined = forked.join(&ancestor).unwrap();
        assert!(joined.is_visited(start));
        assert!(joined.parent.is_none());
    }
}
