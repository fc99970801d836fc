// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run configuration: everything that varies a search without
//! varying the graph itself — the seed, the depth guard, the cooperative
//! cancellation signal, and the advisory dead-end callback.

use crate::debug_ignore::DebugIgnore;
use crate::state::State;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation signal, checked at the top of every
/// `fulfill` call. Cloning shares the same underlying flag, so a
/// caller can hold one end and trip it from another thread while the
/// search itself stays single-threaded and synchronous.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token; every clone observes `is_cancelled() == true` from
    /// this point on.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options governing a single [`crate::driver::RouteFinder`] run.
///
/// `seed` is the sole source of non-determinism: two runs over the
/// same graph with the same seed and options produce byte-identical
/// routes.
pub struct RouteFinderOptions {
    seed: u64,
    debug_depth_limit: usize,
    cancellation: CancellationToken,
    debug_dead_end_callback: DebugIgnore<Option<Box<dyn FnMut(&State)>>>,
}

impl RouteFinderOptions {
    /// Default recursion depth guard: effectively unbounded.
    pub const DEFAULT_DEPTH_LIMIT: usize = usize::MAX;

    /// Creates options seeded for deterministic output, with the default
    /// depth limit and no cancellation token or dead-end callback.
    pub fn new(seed: u64) -> Self {
        RouteFinderOptions {
            seed,
            debug_depth_limit: Self::DEFAULT_DEPTH_LIMIT,
            cancellation: CancellationToken::new(),
            debug_dead_end_callback: DebugIgnore(None),
        }
    }

    /// Overrides the recursion depth guard.
    pub fn with_debug_depth_limit(mut self, limit: usize) -> Self {
        self.debug_depth_limit = limit;
        self
    }

    /// Attaches a cancellation token the caller can trip mid-search.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attaches a callback invoked once per terminal unsolvable
    /// subproblem. Advisory only — it cannot
    /// affect the search's outcome.
    pub fn with_dead_end_callback(mut self, callback: impl FnMut(&State) + 'static) -> Self {
        self.debug_dead_end_callback = DebugIgnore(Some(Box::new(callback)));
        self
    }

    pub(crate) fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn debug_depth_limit(&self) -> usize {
        self.debug_depth_limit
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub(crate) fn notify_dead_end(&mut self, state: &State) {
        if let Some(callback) = self.debug_dead_end_callback.0.as_mut() {
            callback(state);
        }
    }
}

impl std::fmt::Debug for RouteFinderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteFinderOptions")
            .field("seed", &self.seed)
            .field("debug_depth_limit", &self.debug_depth_limit)
            .finish()
    }
}
