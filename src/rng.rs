// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seeded randomness: every shuffle the driver performs goes
//! through a single [`rand::rngs::StdRng`] seeded from
//! [`crate::options::RouteFinderOptions::seed`], so two runs with the same
//! graph, options and seed produce byte-identical routes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Creates the run's single source of randomness from a 64-bit seed.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Shuffles `items` in place using `rng`. A thin wrapper over
/// [`SliceRandom::shuffle`] so call sites read `rng::shuffle(&mut rng, &mut v)`
/// rather than reaching for the trait import themselves.
pub fn shuffle<T>(rng: &mut StdRng, items: &mut [T]) {
    items.shuffle(rng);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_shuffle() {
        let mut a: Vec<u32> = (0..20).collect();
        let mut b = a.clone();
        shuffle(&mut seeded_rng(42), &mut a);
        shuffle(&mut seeded_rng(42), &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_usually_different_shuffle() {
        let mut a: Vec<u32> = (0..20).collect();
        let mut b = a.clone();
        shuffle(&mut seeded_rng(1), &mut a);
        shuffle(&mut seeded_rng(2), &mut b);
        assert_ne!(a, b);
    }
}
