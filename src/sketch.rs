//! Randomized linear sketch used to sample an edge leaving a component.
//!
//! A sketch is a bucket matrix over the edge-id universe. Every bucket keeps
//! the XOR of the ids routed into it (`alpha`) and the XOR of their checksums
//! (`gamma`), so inserting and deleting an edge is the same toggle and two
//! sketches combine with a plain XOR. Merging the per-vertex sketches of a
//! component therefore cancels every internal edge and keeps exactly the cut
//! edges, which is what makes replacement-edge sampling work.

use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::graph::Edge;

/// One-shot sampling outcome of [`Sketch::query`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleResult {
    /// A cut edge was recovered.
    Good(Edge),
    /// The sketch is empty: the component has no cut edge.
    Zero,
    /// Buckets exist but none is recoverable right now. Not an error; later
    /// updates may make a bucket one-sparse again.
    Fail,
}

impl SampleResult {
    pub fn good(self) -> Option<Edge> {
        match self {
            SampleResult::Good(e) => Some(e),
            _ => None,
        }
    }
}

/// Geometry and seed shared by every sketch of one tier. Sketches can only
/// merge when they were built from the same config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SketchConfig {
    columns: usize,
    guesses: usize,
    seed: u64,
    /// Vertex count, used to reject checksum collisions when decoding.
    n: usize,
}

impl SketchConfig {
    /// Derive the bucket geometry from the index universe size and the
    /// per-query error bound.
    pub fn configure(len: usize, err: f64, seed: u64, n: usize) -> Self {
        assert!(len > 1 && err > 0.0 && err < 1.0);
        let columns = (1.0 / err).log2().ceil().max(1.0) as usize;
        let guesses = (len.next_power_of_two().trailing_zeros() as usize) + 2;
        Self {
            columns,
            guesses,
            seed,
            n,
        }
    }

    fn mix(&self, tag: u64, id: u64) -> u64 {
        let mut h = FxHasher::default();
        h.write_u64(self.seed);
        h.write_u64(tag);
        h.write_u64(id);
        h.finish()
    }

    /// Geometric bucket depth of an id in a column.
    fn depth(&self, column: usize, id: u64) -> usize {
        (self.mix(column as u64 + 1, id).trailing_zeros() as usize).min(self.guesses - 1)
    }

    fn checksum(&self, id: u64) -> u64 {
        self.mix(0, id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Bucket {
    alpha: u64,
    gamma: u64,
}

impl Bucket {
    fn toggle(&mut self, id: u64, checksum: u64) {
        self.alpha ^= id;
        self.gamma ^= checksum;
    }
    fn is_zero(&self) -> bool {
        self.alpha == 0 && self.gamma == 0
    }
}

/// A mergeable edge sketch. See the module docs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sketch {
    config: SketchConfig,
    /// `columns * guesses` sampling buckets plus one deterministic bucket
    /// receiving every update.
    buckets: Vec<Bucket>,
}

impl Sketch {
    pub fn new(config: SketchConfig) -> Self {
        Self {
            config,
            buckets: vec![Bucket::default(); config.columns * config.guesses + 1],
        }
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Toggle an edge id in or out of the sketch.
    pub fn update(&mut self, id: u64) {
        let chk = self.config.checksum(id);
        let last = self.buckets.len() - 1;
        self.buckets[last].toggle(id, chk);
        for c in 0..self.config.columns {
            let d = self.config.depth(c, id);
            self.buckets[c * self.config.guesses + d].toggle(id, chk);
        }
    }

    /// Combine with another sketch of the same config. Self-inverse: merging
    /// a sketch with a copy of itself yields the zero sketch.
    pub fn merge(&mut self, other: &Sketch) {
        assert_eq!(
            self.config, other.config,
            "sketches with different configs cannot merge"
        );
        for (b, o) in self.buckets.iter_mut().zip(&other.buckets) {
            b.alpha ^= o.alpha;
            b.gamma ^= o.gamma;
        }
    }

    fn recover(&self, b: &Bucket) -> Option<Edge> {
        if b.is_zero() || self.config.checksum(b.alpha) != b.gamma {
            return None;
        }
        Edge::from_id(b.alpha, self.config.n)
    }

    /// Try to sample one edge currently in the sketch.
    pub fn query(&self) -> SampleResult {
        let det = &self.buckets[self.buckets.len() - 1];
        if det.is_zero() {
            return SampleResult::Zero;
        }
        if let Some(e) = self.recover(det) {
            return SampleResult::Good(e);
        }
        for b in &self.buckets[..self.buckets.len() - 1] {
            if let Some(e) = self.recover(b) {
                return SampleResult::Good(e);
            }
        }
        SampleResult::Fail
    }
}
