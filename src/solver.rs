// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The route solver: an independent validator, wholly separate
//! from the driver's own bookkeeping, that re-derives reachability from
//! scratch given only the graph and a completed (or speculative) set of
//! key placements. It simulates a pessimistic player who may pick up
//! satisfied edges in *any* order, and flags [`RouteSolverResult::POTENTIAL_SOFTLOCK`]
//! if any such ordering runs out of satisfiable edges while nodes remain
//! unvisited.
//!
//! Exhaustively enumerating orderings is exponential in the branching
//! factor of simultaneously-satisfied edges, so this is a bounded
//! approximation, capped by [`MAX_EXPLORED_BRANCHES`].

use crate::expand::{apply, is_satisfied};
use crate::graph::{EdgeId, Graph};
use crate::state::{Placements, State};
use std::ops::{BitAnd, BitOr};
use std::rc::Rc;

/// How many simulated branch points the solver is willing to explore
/// before giving up and reporting `Ok` for the remaining, unexplored
/// orderings. A bound, not a guarantee of completeness — see module docs.
const MAX_EXPLORED_BRANCHES: u32 = 4_096;

/// A bitmask result from [`solve`]. Hand-rolled rather than pulled from
/// the `bitflags` crate, since the mask only ever needs a couple of bits
/// and no consumer of this crate's corpus reaches for `bitflags` either.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RouteSolverResult(u32);

impl RouteSolverResult {
    /// No problems found.
    pub const OK: RouteSolverResult = RouteSolverResult(0);
    /// Some ordering of pickups and unlocks leads to a dead end with
    /// unvisited nodes remaining.
    pub const POTENTIAL_SOFTLOCK: RouteSolverResult = RouteSolverResult(1 << 0);

    /// True iff no bit is set.
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// True iff every bit in `other` is set in `self`.
    pub fn contains(self, other: RouteSolverResult) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RouteSolverResult {
    type Output = RouteSolverResult;
    fn bitor(self, rhs: Self) -> Self {
        RouteSolverResult(self.0 | rhs.0)
    }
}

impl BitAnd for RouteSolverResult {
    type Output = RouteSolverResult;
    fn bitand(self, rhs: Self) -> Self {
        RouteSolverResult(self.0 & rhs.0)
    }
}

/// Runs the pessimistic-player validation against
/// `placements`, re-deriving reachability from an empty start state
/// rather than trusting the driver's own bookkeeping.
pub fn solve(graph: &Rc<Graph>, placements: &Placements) -> RouteSolverResult {
    let start = State::new(Rc::clone(graph))
        .visit_node(graph.start())
        .expect("start is always visitable from an empty state");
    let start = seed_placements(start, placements);

    let mut budget = MAX_EXPLORED_BRANCHES;
    if simulate(graph, start, &mut budget) {
        RouteSolverResult::POTENTIAL_SOFTLOCK
    } else {
        RouteSolverResult::OK
    }
}

/// Registers every `(item, key)` pair in `placements` into a fresh
/// solver state's `item_to_key` ledger. `visit_node` already knows how to
/// fold a pre-assigned item's keys into `keys` the moment it's reached
/// (the same path the driver's own state takes); we only need
/// `item_to_key` populated up front, bypassing `place_key`'s spare-item
/// precondition, which doesn't apply here since nothing has been visited
/// yet.
fn seed_placements(mut state: State, placements: &Placements) -> State {
    for (&item, keys) in placements {
        for &key in keys {
            state = state.seed_placement(item, key);
        }
    }
    state
}

/// `simulate` returns `true` the moment it finds *any* branch that gets
/// stuck (no satisfiable edge) while nodes remain unvisited.
///
/// Unlike [`crate::expand::expand`], which greedily takes every
/// simultaneously-satisfiable edge in one deterministic pass, this walks
/// the same `is_satisfied`/`apply` primitives one edge at a time and
/// branches over *which* currently-satisfied edge a pessimistic player
/// serves first — the only point at which order can matter, since a
/// player who serves a consumable-hungry edge first may starve a later
/// edge that needed the same tokens.
fn simulate(graph: &Graph, state: State, budget: &mut u32) -> bool {
    if all_nodes_visited(graph, &state) {
        return false;
    }

    let satisfied: Vec<EdgeId> = state
        .next()
        .filter(|&e| is_satisfied(graph, &state, e))
        .collect();

    if satisfied.is_empty() {
        let pending_one_way: Vec<EdgeId> = state.one_way_edges().collect();
        if pending_one_way.is_empty() {
            // Nothing left to try and nodes remain unvisited: a witness.
            return true;
        }
        // Try descending into each pending fork; a softlock inside any of
        // them still counts.
        for edge in pending_one_way {
            if *budget == 0 {
                return false;
            }
            *budget -= 1;
            let (_, destination) = graph.endpoints(edge);
            let forked = state.fork([], [], []);
            let forked = match forked.visit_node(destination) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if simulate(graph, forked, budget) {
                return true;
            }
        }
        return false;
    }

    for edge in satisfied {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;
        let next_state = apply(graph, state.clone(), edge);
        if simulate(graph, next_state, budget) {
            return true;
        }
    }
    false
}

/// Spans the whole parent chain, not just the current segment: a
/// pending fork leaves its ancestor's `visited` set un-merged until a
/// rejoin happens, so checking only the current segment would wrongly
/// flag a valid multi-segment route as stuck with nodes unvisited.
fn all_nodes_visited(graph: &Graph, state: &State) -> bool {
    graph.nodes().all(|n| state.is_visited_anywhere(n))
}
