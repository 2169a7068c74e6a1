//! Union-find connectivity oracle for cross-checking the real structures.

use std::collections::{BTreeMap, BTreeSet};

use tiered_connectivity::graph::{EdgeUpdate, UpdateKind, Vertex};
use tiered_connectivity::ConnectivitySolver;

#[derive(Debug, Clone)]
pub struct Dsu {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl Dsu {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, u: usize) -> usize {
        if self.parent[u] != u {
            let root = self.find(self.parent[u]);
            self.parent[u] = root;
        }
        self.parent[u]
    }

    pub fn union(&mut self, u: usize, v: usize) -> bool {
        let (mut ru, mut rv) = (self.find(u), self.find(v));
        if ru == rv {
            return false;
        }
        if self.size[ru] < self.size[rv] {
            std::mem::swap(&mut ru, &mut rv);
        }
        self.parent[rv] = ru;
        self.size[ru] += self.size[rv];
        true
    }

    pub fn connected(&mut self, u: usize, v: usize) -> bool {
        self.find(u) == self.find(v)
    }

    pub fn components(&mut self) -> Vec<BTreeSet<usize>> {
        let mut by_root: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for u in 0..self.parent.len() {
            let r = self.find(u);
            by_root.entry(r).or_default().insert(u);
        }
        by_root.into_values().collect()
    }
}

/// Dumb solver: keeps the live edge set and rebuilds a union-find per query.
#[derive(Debug)]
pub struct SlowSolver {
    n: usize,
    edges: BTreeSet<(Vertex, Vertex)>,
}

impl SlowSolver {
    fn dsu(&self) -> Dsu {
        let mut dsu = Dsu::new(self.n);
        for &(u, v) in &self.edges {
            dsu.union(u, v);
        }
        dsu
    }
}

impl ConnectivitySolver for SlowSolver {
    fn new(n: usize) -> Self {
        Self {
            n,
            edges: BTreeSet::new(),
        }
    }

    fn update(&mut self, up: EdgeUpdate) {
        let key = up.edge.endpoints();
        match up.kind {
            UpdateKind::Insert => {
                assert!(self.edges.insert(key), "duplicate insert {key:?}");
            }
            UpdateKind::Delete => {
                assert!(self.edges.remove(&key), "delete of missing {key:?}");
            }
        }
    }

    fn connectivity_query(&mut self, u: Vertex, v: Vertex) -> bool {
        self.dsu().connected(u, v)
    }

    fn cc_query(&mut self) -> Vec<BTreeSet<Vertex>> {
        self.dsu().components()
    }

    fn end(&mut self) {}
}
