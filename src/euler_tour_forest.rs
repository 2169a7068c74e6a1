//! A dynamic forest represented as Euler tours over a [`Lists`] structure.
//!
//! Each tree is one list: every vertex contributes a single sentinel entry
//! holding that vertex's sketch (so the list aggregate is the component
//! sketch, each vertex counted exactly once) and every tree edge contributes
//! two boundary entries, one registered in each endpoint's adjacency map.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::graph::{Edge, Vertex};
use crate::lists::{AggregatedData, Idx, Lists};
use crate::sketch::{SampleResult, Sketch};

/// Data of one tour entry.
#[derive(Debug, Clone)]
pub enum TourItem {
    /// The unique sentinel entry of a vertex, owning its sketch.
    Vert { v: Vertex, sketch: Sketch },
    /// One of the two boundary entries of a tree edge.
    Bound { e: Edge },
}

#[derive(Debug, Clone, Default)]
pub struct TourAgg {
    /// Merge of the vertex sketches in range. None is the identity.
    pub sketch: Option<Sketch>,
    /// Number of vertex entries in range.
    pub vertices: usize,
}

impl AggregatedData for TourAgg {
    type Data = TourItem;
    fn from(data: &Self::Data) -> Self {
        match data {
            TourItem::Vert { sketch, .. } => Self {
                sketch: Some(sketch.clone()),
                vertices: 1,
            },
            TourItem::Bound { .. } => Self::default(),
        }
    }
    fn merge(self, right: Self) -> Self {
        let sketch = match (self.sketch, right.sketch) {
            (Some(mut a), Some(b)) => {
                a.merge(&b);
                Some(a)
            }
            (a, b) => a.or(b),
        };
        Self {
            sketch,
            vertices: self.vertices + right.vertices,
        }
    }
    fn reverse(self) -> Self {
        self
    }
}

fn tour_panic() -> ! {
    panic!("EulerTourForest structure incorrect")
}

/// One tier's forest over all n vertices.
pub struct EulerTourForest<L>
where
    L: Lists<TourAgg>,
{
    l: L,
    /// Sentinel tour entry of each vertex.
    verts: Vec<Idx>,
    /// adj[v][w] = the boundary entry of edge (v,w) owned by v.
    adj: Vec<BTreeMap<Vertex, Idx>>,
    /// Boundary entries released by cuts, reused by links.
    free: Vec<Idx>,
}

impl<L: Lists<TourAgg>> Debug for EulerTourForest<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EulerTourForest({} vertices)", self.verts.len())
    }
}

impl<L> EulerTourForest<L>
where
    L: Lists<TourAgg>,
{
    /// Forest of n singleton trees. The sketch factory is called once per
    /// vertex; all sketches of one tier must share a config.
    pub fn new(n: usize, mut make_sketch: impl FnMut(Vertex) -> Sketch) -> Self {
        let mut l = L::new(3 * n);
        let verts = (0..n)
            .map(|v| {
                l.create(TourItem::Vert {
                    v,
                    sketch: make_sketch(v),
                })
            })
            .collect();
        Self {
            l,
            verts,
            adj: vec![BTreeMap::new(); n],
            free: vec![],
        }
    }

    fn alloc(&mut self, data: TourItem) -> Idx {
        if let Some(idx) = self.free.pop() {
            self.l.mutate_data(idx, |d| *d = data);
            idx
        } else {
            self.l.create(data)
        }
    }

    /// Rotate v's tour so v's sentinel entry comes first.
    fn reroot(&mut self, v: Vertex) {
        let e = self.verts[v];
        let k = self.l.order(e);
        if k > 0 {
            let (_, front, back) = self.l.split(e, ..k);
            self.l.concat(back, front);
        }
    }

    pub fn same_tree(&mut self, u: Vertex, v: Vertex) -> bool {
        self.l.on_same_list(self.verts[u], self.verts[v])
    }

    pub fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        self.adj[u].contains_key(&v)
    }

    /// Add the tree edge (u,v). Returns false if u and v already share a
    /// tour, leaving the forest untouched.
    pub fn link(&mut self, u: Vertex, v: Vertex) -> bool {
        if self.same_tree(u, v) {
            return false;
        }
        log::trace!("ETF link {u} {v}");
        self.reroot(u);
        self.reroot(v);
        let e = Edge::new(u, v);
        let eu = self.alloc(TourItem::Bound { e });
        let ev = self.alloc(TourItem::Bound { e });
        self.adj[u].insert(v, eu);
        self.adj[v].insert(u, ev);
        let t = self.l.concat(self.verts[u], eu);
        let t = self.l.concat(t, self.verts[v]);
        self.l.concat(t, ev);
        true
    }

    /// Remove the tree edge (u,v). Returns false if no such tree edge
    /// exists. Both remaining tours keep one sentinel entry per vertex.
    pub fn cut(&mut self, u: Vertex, v: Vertex) -> bool {
        let Some(&eu) = self.adj[u].get(&v) else {
            return false;
        };
        log::trace!("ETF cut {u} {v}");
        let ev = *self.adj[v].get(&u).unwrap_or_else(|| tour_panic());
        self.adj[u].remove(&v);
        self.adj[v].remove(&u);
        let (a, b) = if self.l.order(eu) < self.l.order(ev) {
            (eu, ev)
        } else {
            (ev, eu)
        };
        let ka = self.l.order(a);
        let kb = self.l.order(b);
        let (left, mid, right) = self.l.split(a, ka..=kb);
        let inner_len = self.l.len(mid);
        let (ba, _inner, bb) = self.l.split(mid, 1..inner_len - 1);
        debug_assert_eq!(self.l.len(ba), 1);
        debug_assert_eq!(self.l.len(bb), 1);
        self.l.concat(left, right);
        self.free.push(a);
        self.free.push(b);
        true
    }

    /// Toggle an edge id in v's own sketch, updating the tour aggregate.
    pub fn update_sketch(&mut self, v: Vertex, id: u64) {
        self.l.mutate_data(self.verts[v], |d| match d {
            TourItem::Vert { sketch, .. } => sketch.update(id),
            TourItem::Bound { .. } => tour_panic(),
        });
    }

    /// Length of v's Euler tour sequence. Grows with the component, so equal
    /// sizes across adjacent tiers mean equal components.
    pub fn get_size(&mut self, v: Vertex) -> usize {
        self.l.len(self.verts[v])
    }

    pub fn get_aggregate(&mut self, v: Vertex) -> TourAgg {
        self.l.total_agg(self.verts[v])
    }

    /// Sample a cut edge of v's component.
    pub fn sample(&mut self, v: Vertex) -> SampleResult {
        match self.get_aggregate(v).sketch {
            Some(s) => s.query(),
            None => tour_panic(),
        }
    }

    /// All vertices of v's component, in tour order. O(component size).
    pub fn get_component(&mut self, v: Vertex) -> Vec<Vertex> {
        let entries = self.l.iter_list(self.verts[v]);
        entries
            .into_iter()
            .filter_map(|e| match self.l.data(e) {
                TourItem::Vert { v, .. } => Some(*v),
                TourItem::Bound { .. } => None,
            })
            .collect()
    }

    /// The whole forest as disjoint vertex sets.
    pub fn components(&mut self) -> Vec<Vec<Vertex>> {
        let n = self.verts.len();
        let mut seen = vec![false; n];
        let mut all = vec![];
        for v in 0..n {
            if !seen[v] {
                let comp = self.get_component(v);
                for &w in &comp {
                    seen[w] = true;
                }
                all.push(comp);
            }
        }
        all
    }
}
