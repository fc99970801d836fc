// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The search driver: backtracking recursion that, at each dead
//! end of expansion, chooses an edge to unlock, selects item slots for
//! the keys it needs, recurses, and validates the result against
//! softlock via the route solver.
//!
//! Grounded in the general seeded-shuffle-then-place backtracking idiom
//! used for randomized item placement, since nothing in a resolved
//! dependency graph ever needs to backtrack: here, a placement that turns
//! out to risk a softlock has to be undone and retried with a different
//! slot. Segment transitions (`fork`/`join`/`do_subgraph`) are logged at
//! `debug!` the same way a build graph logs task transitions.

use crate::expand::{expand, missing_placements};
use crate::graph::{EdgeId, EdgeKind, Graph, KeyId, KeyKind, NodeId};
use crate::options::RouteFinderOptions;
use crate::requirement::guaranteed;
use crate::rng::{seeded_rng, shuffle};
use crate::route::Route;
use crate::solver::{self, RouteSolverResult};
use crate::state::State;
use crate::errors::Error;
use itertools::Itertools;
use log::{debug, warn};
use rand::rngs::StdRng;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::rc::Rc;

/// How many distinct slot assignments [`RouteFinder::place_and_recurse`]
/// will try for a single candidate edge before giving up on it and moving
/// to the next one.
const MAX_ATTEMPTS_PER_EDGE: usize = 10;

/// Runs the backtracking search over an immutable
/// [`Graph`], producing a [`Route`].
///
/// Owns the run's single source of randomness: every shuffle the
/// driver performs goes through the one `StdRng` seeded in
/// [`RouteFinder::new`], so two runs with the same graph, options and
/// seed produce byte-identical routes.
pub struct RouteFinder {
    graph: Rc<Graph>,
    options: RouteFinderOptions,
    rng: StdRng,
}

impl RouteFinder {
    /// Creates a new search over `graph`, configured by `options`.
    pub fn new(graph: Graph, options: RouteFinderOptions) -> Self {
        let rng = seeded_rng(options.seed());
        RouteFinder {
            graph: Rc::new(graph),
            options,
            rng,
        }
    }

    /// Runs the search to completion (or to a dead end) and returns the
    /// resulting [`Route`]. `Route::all_nodes_visited` tells the caller
    /// whether the search actually succeeded; ordinary unsolvability is
    /// not an error.
    pub fn find(&mut self) -> Result<Route, Error> {
        let state = State::new(Rc::clone(&self.graph));
        let start = self.graph.start();
        let state = self.do_subgraph(state, start, false, 0)?;

        let all_nodes_visited = state.next().count() == 0
            && state.one_way_edges().count() == 0
            && self.graph.nodes().all(|n| state.is_visited_anywhere(n));

        Ok(Route::new(Rc::clone(&self.graph), &state, all_nodes_visited))
    }

    /// `do_subgraph(start, fork)`: seeds a new segment with the
    /// guaranteed prerequisites of `start`, visits `start`, and
    /// runs [`RouteFinder::fulfill`] over the result.
    fn do_subgraph(&mut self, state: State, start: NodeId, fork: bool, depth: usize) -> Result<State, Error> {
        let reqs = guaranteed(&self.graph, state.item_to_key(), start);
        let visited: Vec<NodeId> = reqs.nodes().collect();
        let keys: Vec<KeyId> = reqs.reusable_keys().collect();

        debug!(
            "do_subgraph: start={:?} fork={} guaranteed_nodes={} guaranteed_keys={}",
            start,
            fork,
            visited.len(),
            keys.len()
        );

        let seeded = if fork {
            state.fork(visited, keys, [])
        } else {
            state.clear(visited, keys, [])
        };
        let seeded = seeded.visit_node(start)?;
        self.fulfill(seeded, depth)
    }

    /// `fulfill(state, depth)`: the heart of the backtracking
    /// search. Expands to a fixed point, peels off one pending `OneWay`
    /// fork at a time, then — once no fork remains — either places keys
    /// for a candidate edge and recurses, or, once `next` is fully
    /// drained, walks any pending `NoReturn` edges into fresh segments.
    fn fulfill(&mut self, state: State, depth: usize) -> Result<State, Error> {
        if self.options.cancellation().is_cancelled() {
            return Err(Error::Cancelled);
        }
        if depth > self.options.debug_depth_limit() {
            return Err(Error::DepthLimitReached { depth });
        }

        let state = expand(&self.graph, state);

        if let Some(edge) = self.pick_one_way(&state) {
            let (_, destination) = self.graph.endpoints(edge);
            let state = state.remove_one_way(edge);
            debug!("forking through one-way edge {:?} -> {:?}", edge, destination);
            let state = self.do_subgraph(state, destination, true, depth + 1)?;
            return self.fulfill(state, depth + 1);
        }

        if state.next().count() > 0 {
            return self.place_and_recurse(state, depth);
        }

        self.drain_no_returns(state, depth)
    }

    /// Picks the next pending `OneWay` edge to fork through, in a stable
    /// order (edge identity) shuffled by the seeded RNG so
    /// repeated runs with the same seed pick the same edge, but different
    /// seeds may explore forks in a different order.
    fn pick_one_way(&mut self, state: &State) -> Option<EdgeId> {
        let mut ones: Vec<EdgeId> = state
            .one_way_edges()
            .filter(|&e| self.graph.edge(e).kind() == EdgeKind::OneWay)
            .sorted()
            .collect();
        shuffle(&mut self.rng, &mut ones);
        ones.into_iter().next()
    }

    /// Ranks the pending edges, tries placing keys for each
    /// in turn, and returns either a fully-closed-out state or the best
    /// partial attempt seen if every candidate dead-ends.
    fn place_and_recurse(&mut self, state: State, depth: usize) -> Result<State, Error> {
        let candidates = self.ranked_candidates(&state);
        let mut best: Option<State> = None;

        for edge in candidates {
            for _attempt in 0..MAX_ATTEMPTS_PER_EDGE {
                // `assign_slots` reshuffles its spare-item pool on every
                // call, so a failed attempt here can still succeed on a
                // later one if the only problem was an unlucky greedy
                // zone-assignment order, not a genuine lack of slots.
                let Some(placed) = self.try_place(&state, edge) else {
                    continue;
                };
                let recursed = self.fulfill(placed, depth + 1)?;
                let closed_out = recursed.next().count() == 0 && recursed.one_way_edges().count() == 0;

                if closed_out {
                    if self.validate(&recursed) {
                        return Ok(recursed);
                    }
                    warn!(
                        "rejected placement at depth {}: route solver flagged potential softlock",
                        depth
                    );
                }
                Self::update_best(&mut best, recursed);
            }
        }

        warn!("dead end at depth {}: {} edges still pending", depth, state.next().count());
        self.options.notify_dead_end(&state);
        Ok(best.unwrap_or(state))
    }

    /// Ranks pending edges by fewest already-placed reusable keys among
    /// their requirements first, shuffling ties. The sort is
    /// stable, so edges that tie on rank keep whatever order the shuffle
    /// gave them.
    fn ranked_candidates(&mut self, state: &State) -> Vec<EdgeId> {
        let mut candidates: Vec<EdgeId> = state.next().sorted().collect();
        shuffle(&mut self.rng, &mut candidates);
        candidates.sort_by_key(|&e| self.already_placed_reusable_count(state, e));
        candidates
    }

    fn already_placed_reusable_count(&self, state: &State, edge: EdgeId) -> usize {
        let e = self.graph.edge(edge);
        e.required_keys()
            .iter()
            .filter(|&(k, _)| self.graph.key(k).kind() == KeyKind::Reusable)
            .filter(|&(k, _)| state.item_to_key().values().any(|keys| keys.contains(&k)))
            .count()
    }

    /// Attempts to satisfy `edge`'s outstanding key requirements by
    /// placing keys into spare items. Returns `None` if
    /// there aren't enough zone-compatible spare slots for everything the
    /// edge (plus its consumable look-ahead) needs.
    fn try_place(&mut self, state: &State, edge: EdgeId) -> Option<State> {
        let mut requirements: SmallVec<[(KeyId, u32); 4]> = missing_placements(&self.graph, state, edge).into();
        self.augment_with_lookahead(state, edge, &mut requirements);

        if requirements.is_empty() {
            return Some(state.clone());
        }

        let assignments = self.assign_slots(state, &requirements)?;
        let mut next_state = state.clone();
        for (item, key) in assignments {
            next_state = next_state.place_key(item, key).ok()?;
        }
        Some(next_state)
    }

    /// Augments `requirements` with the consumable-key needs of any other
    /// edge that `edge`'s destination would *newly* unblock — i.e. an edge
    /// that names `destination` among its `required_nodes`, isn't satisfied
    /// yet, and has every other required node already visited. Without this,
    /// the slot-assignment step would place exactly one token at a time and
    /// could strand a later, simultaneously-discoverable edge that needs the
    /// same key with no zone-compatible spare items left to place it in.
    ///
    /// Deliberately narrower than "every other edge in `next`": an edge
    /// already satisfiable regardless of `destination` isn't unblocked *by*
    /// this traversal, so it's left for its own turn through
    /// `place_and_recurse` rather than front-loaded here.
    fn augment_with_lookahead(&self, state: &State, edge: EdgeId, requirements: &mut SmallVec<[(KeyId, u32); 4]>) {
        let (_, destination) = self.graph.endpoints(edge);
        for other in state.next() {
            if other == edge {
                continue;
            }
            let other_edge = self.graph.edge(other);
            let required_nodes = other_edge.required_nodes();
            if state.is_visited(destination) || !required_nodes.contains(&destination) {
                continue;
            }
            let newly_unblocked = required_nodes
                .iter()
                .all(|&n| n == destination || state.is_visited(n));
            if !newly_unblocked {
                continue;
            }
            for (key, count) in other_edge.required_keys().iter() {
                if self.graph.key(key).kind() != KeyKind::Consumable {
                    continue;
                }
                let quantity = self.graph.key(key).quantity();
                let held = state.keys().count(key);
                let deficit = (count * quantity).saturating_sub(held);
                if deficit == 0 {
                    continue;
                }
                let extra_placements = (deficit + quantity - 1) / quantity;
                match requirements.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, n)) => *n += extra_placements,
                    None => requirements.push((key, extra_placements)),
                }
            }
        }
    }

    /// Greedily assigns each required `(key, count)` pair to zone-
    /// compatible spare items (`item.group & key.group == key.group`),
    /// drawing slots from a
    /// shuffled, stably-ordered pool of the current segment's spare
    /// items. Returns `None` if the pool runs out before every requirement
    /// is met.
    fn assign_slots(&mut self, state: &State, requirements: &[(KeyId, u32)]) -> Option<Vec<(NodeId, KeyId)>> {
        let mut spare: Vec<NodeId> = state.spare_items().sorted().collect();
        shuffle(&mut self.rng, &mut spare);

        let mut used: HashSet<NodeId> = HashSet::new();
        let mut assignments = Vec::new();

        for &(key, count) in requirements {
            let key_group = self.graph.key(key).group();
            for _ in 0..count {
                let slot = spare
                    .iter()
                    .find(|&&n| !used.contains(&n) && (self.graph.node(n).group() & key_group) == key_group)
                    .copied()?;
                used.insert(slot);
                assignments.push((slot, key));
            }
        }
        Some(assignments)
    }

    /// Once an attempt appears to close out a segment (`next` and
    /// `one_way` both empty), validates it against the route solver
    /// before accepting it. A flagged attempt is rejected and the
    /// caller tries the next attempt instead.
    fn validate(&self, state: &State) -> bool {
        solver::solve(&self.graph, state.item_to_key()) == RouteSolverResult::OK
    }

    fn update_best(best: &mut Option<State>, candidate: State) {
        let better = match best {
            None => true,
            Some(current) => candidate.item_to_key().len() > current.item_to_key().len(),
        };
        if better {
            *best = Some(candidate);
        }
    }

    /// Once `next` is fully drained, walks any pending
    /// `NoReturn` edges into fresh, non-rejoining segments, one after
    /// another, threading the resulting state through.
    fn drain_no_returns(&mut self, state: State, depth: usize) -> Result<State, Error> {
        let mut no_returns: Vec<EdgeId> = state
            .one_way_edges()
            .filter(|&e| self.graph.edge(e).kind() == EdgeKind::NoReturn)
            .sorted()
            .collect();
        shuffle(&mut self.rng, &mut no_returns);

        let mut state = state;
        for edge in no_returns {
            let (_, destination) = self.graph.endpoints(edge);
            state = state.remove_one_way(edge);
            debug!("entering no-return segment at {:?} (via {:?})", destination, edge);
            state = self.do_subgraph(state, destination, false, depth + 1)?;
        }
        Ok(state)
    }
}
