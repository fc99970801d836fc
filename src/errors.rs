// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors this crate's methods can return.
//! Hand-rolled rather than pulled from `thiserror`/`anyhow` — a flat enum
//! with a manual `Display`/`source` is all a library-shaped error type
//! needs here.

use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors this crate can return.
///
/// Ordinary unsolvability is *not* an error: it's reported through
/// `Route::all_nodes_visited`. These variants are for conditions that
/// abort a search outright.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The [`GraphBuilder`](crate::graph::GraphBuilder) could not produce
    /// a graph — currently the only cause is a missing start node.
    GraphConstructError(String),
    /// Speculative recursion exceeded
    /// [`RouteFinderOptions::debug_depth_limit`](crate::options::RouteFinderOptions::debug_depth_limit).
    DepthLimitReached {
        /// The recursion depth at which the limit was hit.
        depth: usize,
    },
    /// The cooperative cancellation token was tripped.
    Cancelled,
    /// An internal invariant was violated. Indicates a bug in this crate,
    /// not a property of the input graph.
    InvariantViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphConstructError(msg) => write!(f, "error while constructing graph: {}", msg),
            DepthLimitReached { depth } => {
                write!(f, "depth limit reached at recursion depth {}", depth)
            }
            Cancelled => write!(f, "search was cancelled"),
            InvariantViolation(msg) => write!(f, "internal invariant violated: {}", msg),
        }
    }
}

impl error::Error for Error {}
