use common::init_logger;
use rand::prelude::*;
use tiered_connectivity::graph::Edge;
use tiered_connectivity::sketch::{SampleResult, Sketch, SketchConfig};

mod common;

const N: usize = 64;

fn cfg(seed: u64) -> SketchConfig {
    SketchConfig::configure(N * N, 1.0 / 64.0, seed, N)
}

#[test]
fn test_empty_is_zero() {
    let s = Sketch::new(cfg(7));
    assert_eq!(s.query(), SampleResult::Zero);
}

#[test]
fn test_single_edge_always_recovered() {
    init_logger();
    for seed in 0..20 {
        let mut s = Sketch::new(cfg(seed));
        let e = Edge::new(3, 40);
        s.update(e.id());
        assert_eq!(s.query(), SampleResult::Good(e), "seed {seed}");
    }
}

#[test]
fn test_toggle_cancels() {
    let mut s = Sketch::new(cfg(11));
    let e = Edge::new(1, 2);
    s.update(e.id());
    s.update(e.id());
    assert_eq!(s.query(), SampleResult::Zero);
}

#[test]
fn test_merge_is_self_inverse() {
    let mut a = Sketch::new(cfg(13));
    for v in 1..10 {
        a.update(Edge::new(0, v).id());
    }
    let copy = a.clone();
    a.merge(&copy);
    assert_eq!(a.query(), SampleResult::Zero);
}

#[test]
fn test_merge_cancels_internal_edges() {
    // Sketches of the two endpoints of an edge merge to a sketch without it.
    let c = cfg(17);
    let mut su = Sketch::new(c);
    let mut sv = Sketch::new(c);
    let internal = Edge::new(5, 6);
    let cut = Edge::new(6, 20);
    su.update(internal.id());
    sv.update(internal.id());
    sv.update(cut.id());
    su.merge(&sv);
    assert_eq!(su.query(), SampleResult::Good(cut));
}

#[test]
#[should_panic]
fn test_merge_rejects_mismatched_configs() {
    let mut a = Sketch::new(cfg(1));
    let b = Sketch::new(cfg(2));
    a.merge(&b);
}

#[test]
fn test_sampling_returns_present_edge() {
    init_logger();
    // Whatever Good returns must be an edge actually in the sketch.
    let mut rng = StdRng::seed_from_u64(31337);
    for round in 0..50 {
        let mut s = Sketch::new(cfg(round));
        let mut present = std::collections::BTreeSet::new();
        for _ in 0..rng.gen_range(1..40) {
            let u = rng.gen_range(0..N - 1);
            let v = rng.gen_range(u + 1..N);
            let e = Edge::new(u, v);
            s.update(e.id());
            if !present.insert(e) {
                present.remove(&e);
            }
        }
        match s.query() {
            SampleResult::Good(e) => {
                assert!(present.contains(&e), "round {round}: sampled absent {e}")
            }
            SampleResult::Zero => assert!(present.is_empty(), "round {round}"),
            SampleResult::Fail => assert!(!present.is_empty(), "round {round}"),
        }
    }
}

#[test]
fn test_query_is_deterministic() {
    let mut s = Sketch::new(cfg(23));
    for v in 1..12 {
        s.update(Edge::new(0, v).id());
    }
    let first = s.query();
    for _ in 0..5 {
        assert_eq!(s.query(), first);
    }
}
