// Copyright (c) Route Finder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Black-box scenario tests, driven entirely through the public
//! `GraphBuilder` + `RouteFinder` surface. One test per named scenario;
//! `CircularSegments` is carried as `#[ignore]` rather than dropped.

use routefinder::{EdgeKind, GraphBuilder, RouteFinder, RouteFinderOptions, RouteSolverResult};

const SEED: u64 = 1729;

/// Wires up `env_logger` so `RUST_LOG=trace cargo test -- --nocapture`
/// surfaces the driver's segment-transition and dead-end logging; a
/// second call from another test in the same process is harmless.
fn init_logging() {
    let _ = env_logger::try_init();
}

#[test]
fn alt_ways_in_same_room() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let r1 = b.and_gate("R1");
    let r2 = b.and_gate("R2");
    b.door(r0, r1, "R0-R1");
    b.door(r0, r2, "R0-R2");
    let r3 = b.or_gate("R3");
    b.door(r1, r3, "R1-R3");
    b.door(r2, r3, "R2-R3");
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
}

#[test]
fn basic() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let i0a = b.item(0, "I0a");
    let i0b = b.item(0, "I0b");
    b.door(r0, i0a, "R0-I0a");
    b.door(r0, i0b, "R0-I0b");

    let k0 = b.reusable_key(0, 1, "K0");
    let k1 = b.reusable_key(0, 1, "K1");

    let r1 = b.and_gate("R1");
    b.add_edge(r0, r1, EdgeKind::TwoWay, [(k0, 1)], [r0]);
    let i1a = b.item(0, "I1a");
    b.door(r1, i1a, "R1-I1a");

    let r2 = b.and_gate("R2");
    b.add_edge(r1, r2, EdgeKind::TwoWay, [(k1, 1)], [r1]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
    assert_eq!(route.solve(), RouteSolverResult::OK);

    let k0_at: Vec<_> = route.get_items_containing_key(k0).collect();
    assert_eq!(k0_at.len(), 1);
    assert!(k0_at[0] == i0a || k0_at[0] == i0b);

    let k1_at: Vec<_> = route.get_items_containing_key(k1).collect();
    assert_eq!(k1_at.len(), 1);
    assert!(k1_at[0] == i0a || k1_at[0] == i0b || k1_at[0] == i1a);
}

#[test]
fn key_order_matters() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let i0a = b.item(0, "I0a");
    b.door(r0, i0a, "R0-I0a");

    let k0 = b.reusable_key(0, 1, "K0");
    let k1 = b.reusable_key(0, 1, "K1");

    // I0b sits behind a door that itself needs K0 — it can't host a key
    // placement until K0 has already been placed somewhere else.
    let i0b = b.item(0, "I0b");
    b.add_edge(r0, i0b, EdgeKind::TwoWay, [(k0, 1)], [r0]);

    let r1 = b.and_gate("R1");
    b.add_edge(r0, r1, EdgeKind::TwoWay, [(k0, 1), (k1, 1)], [r0]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
    assert_eq!(route.get_item_contents(i0a), Some(k0));
    assert_eq!(route.get_item_contents(i0b), Some(k1));
}

#[test]
fn ensure_key_placed_again() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let i0a = b.item(0, "I0a");
    b.door(r0, i0a, "R0-I0a");

    let k0 = b.reusable_key(0, 1, "K0");

    let r1 = b.and_gate("R1");
    b.add_edge(r0, r1, EdgeKind::TwoWay, [(k0, 1)], [r0]);

    let (r2, _) = b.no_return(r0, [], [], 0, "R2");
    let i2a = b.item(0, "I2a");
    b.door(r2, i2a, "R2-I2a");

    let r3 = b.and_gate("R3");
    b.add_edge(r2, r3, EdgeKind::TwoWay, [(k0, 1)], [r2]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
    assert_eq!(route.get_item_contents(i0a), Some(k0));
    assert_eq!(route.get_item_contents(i2a), Some(k0));
    assert_eq!(route.get_items_containing_key(k0).count(), 2);
}

#[test]
fn single_use_key_door_after_door() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let i0 = b.item(0, "I0");
    b.door(r0, i0, "R0-I0");

    let k0 = b.consumable_key(0, 1, "K0");

    let r1 = b.and_gate("R1");
    b.add_edge(r0, r1, EdgeKind::TwoWay, [(k0, 1)], [r0]);
    let i1 = b.item(0, "I1");
    b.door(r1, i1, "R1-I1");

    let r2 = b.and_gate("R2");
    b.add_edge(r1, r2, EdgeKind::TwoWay, [(k0, 1)], [r1]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
    let k0_at: Vec<_> = route.get_items_containing_key(k0).collect();
    assert_eq!(k0_at.len(), 2);
    assert!(k0_at.contains(&i0));
    assert!(k0_at.contains(&i1));
}

#[test]
fn removable_multiple_keys_required() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let k0 = b.removable_key(0, 1, "K0");

    let i0a = b.item(0, "I0a");
    let i0b = b.item(0, "I0b");
    let i0c = b.item(0, "I0c");
    b.door(r0, i0a, "R0-I0a");
    b.door(r0, i0b, "R0-I0b");
    b.door(r0, i0c, "R0-I0c");

    let r1 = b.and_gate("R1");
    b.add_edge(r0, r1, EdgeKind::TwoWay, [(k0, 1)], [r0]);
    let r2 = b.and_gate("R2");
    b.add_edge(r1, r2, EdgeKind::TwoWay, [(k0, 1)], [r1]);
    let r3 = b.and_gate("R3");
    b.add_edge(r2, r3, EdgeKind::TwoWay, [(k0, 1)], [r2]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
    assert_eq!(route.get_items_containing_key(k0).count(), 3);
}

#[test]
fn keys_restricted_to_zones() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");

    let i1 = b.item(1, "I1");
    let i2 = b.item(2, "I2");
    let i3 = b.item(3, "I3");
    let i7 = b.item(7, "I7");
    b.door(r0, i1, "R0-I1");
    b.door(r0, i2, "R0-I2");
    b.door(r0, i3, "R0-I3");
    b.door(r0, i7, "R0-I7");

    let k1 = b.reusable_key(1, 1, "K1");
    let k2 = b.reusable_key(2, 1, "K2");
    let k3 = b.reusable_key(3, 1, "K3");

    let r1 = b.and_gate("R1");
    b.add_edge(r0, r1, EdgeKind::TwoWay, [(k1, 1)], [r0]);
    let r2 = b.and_gate("R2");
    b.add_edge(r0, r2, EdgeKind::TwoWay, [(k2, 1)], [r0]);
    let r3 = b.and_gate("R3");
    b.add_edge(r0, r3, EdgeKind::TwoWay, [(k3, 1)], [r0]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());

    let k1_at: Vec<_> = route.get_items_containing_key(k1).collect();
    assert_eq!(k1_at.len(), 1);
    assert!([i1, i3, i7].contains(&k1_at[0]));

    let k2_at: Vec<_> = route.get_items_containing_key(k2).collect();
    assert_eq!(k2_at.len(), 1);
    assert!([i2, i3, i7].contains(&k2_at[0]));

    let k3_at: Vec<_> = route.get_items_containing_key(k3).collect();
    assert_eq!(k3_at.len(), 1);
    assert!([i3, i7].contains(&k3_at[0]));
}

/// Known failing upstream; retained as a documented skip rather than
/// dropped or silently "fixed" by guessing at the intended behavior.
#[test]
#[ignore = "known failing upstream, intent unclear — see DESIGN.md Open Question decisions"]
fn circular_segments() {
    init_logging();
    let mut b = GraphBuilder::new();
    let r0 = b.and_gate("R0");
    let k0 = b.reusable_key(0, 1, "K0");

    let (r1, _) = b.one_way(r0, [], [], 0, "R1");
    let i1 = b.item(0, "I1");
    b.door(r1, i1, "R1-I1");
    // R1's one-way segment loops back into R0's segment through a
    // locked edge that only K0 (placed inside the loop) can open.
    b.add_edge(r1, r0, EdgeKind::TwoWay, [(k0, 1)], [r1]);
    let graph = b.build().unwrap();

    let mut finder = RouteFinder::new(graph, RouteFinderOptions::new(SEED));
    let route = finder.find().unwrap();

    assert!(route.all_nodes_visited());
}
