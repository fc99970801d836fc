// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backtracking key/route placement engine for locked item-and-key graphs.
//!
//! `routefinder` takes an immutable directed graph of rooms, locked
//! edges, and item slots, and places a set of keys into those slots so
//! that every reachable node can be visited without softlock. The output
//! is a concrete [`Route`]: an assignment of keys to item slots plus the
//! traversal order it implies, validated by an independent pessimistic-
//! player solver.
//!
//! # Optional features
//!
//! * `proptest1`: property-based tests (behind `#[cfg(test)]`) exercising
//!   the quantified invariants — zone compatibility, no-premature-keys,
//!   solvability agreement, determinism — over randomly generated graphs.
//!
//! # Examples
//!
//! ```
//! use routefinder::{EdgeKind, GraphBuilder, RouteFinder, RouteFinderOptions};
//!
//! let mut builder = GraphBuilder::new();
//! let start = builder.and_gate("start");
//! let item = builder.item(0, "item");
//! builder.door(start, item, "start-item");
//! let key = builder.reusable_key(0, 1, "key");
//! let gated = builder.and_gate("gated");
//! builder.add_edge(start, gated, EdgeKind::TwoWay, [(key, 1)], [start]);
//!
//! let graph = builder.build().unwrap();
//! let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(0));
//! let route = finder.find().unwrap();
//!
//! assert!(route.all_nodes_visited());
//! assert_eq!(route.get_item_contents(item), Some(key));
//! ```

#![warn(missing_docs)]

mod debug_ignore;
mod driver;
pub mod errors;
mod expand;
pub mod graph;
mod multiset;
pub mod options;
mod requirement;
mod rng;
pub mod route;
mod sorted_set;
pub mod solver;
mod state;

pub use driver::RouteFinder;
pub use errors::Error;
pub use graph::{EdgeId, EdgeKind, Graph, GraphBuilder, KeyId, KeyKind, NodeId, NodeKind};
pub use options::{CancellationToken, RouteFinderOptions};
pub use route::Route;
pub use solver::RouteSolverResult;
