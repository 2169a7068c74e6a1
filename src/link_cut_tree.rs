//! Link Cut Tree over weighted forest edges.
//!
//! Every forest edge is materialized as its own item on the preferred-path
//! lists, carrying its admission tier. Rerooting is then plain list reversal
//! and the path aggregate is the maximum over the edge items between two
//! vertices, which is what eviction queries need.

use std::collections::BTreeMap;

use crate::graph::{Edge, Tier, Vertex};
use crate::lists::{AggregatedData, Idx, Lists, ReversibleLists};

/// Data of one auxiliary-list item.
#[derive(Debug, Clone)]
pub enum PathItem {
    Vert,
    /// A forest edge tagged with its admission tier.
    Weighted { e: Edge, tier: Tier },
}

#[derive(Debug, Clone, Default)]
pub struct PathAgg {
    /// Maximum-tier edge in range. Ties go to the smaller edge id, so the
    /// aggregate is deterministic and order-independent.
    pub best: Option<(Tier, Edge)>,
}

fn better(a: (Tier, Edge), b: (Tier, Edge)) -> (Tier, Edge) {
    if a.0 > b.0 || (a.0 == b.0 && a.1.id() <= b.1.id()) {
        a
    } else {
        b
    }
}

impl AggregatedData for PathAgg {
    type Data = PathItem;
    fn from(data: &Self::Data) -> Self {
        match data {
            PathItem::Vert => Self::default(),
            PathItem::Weighted { e, tier } => Self {
                best: Some((*tier, *e)),
            },
        }
    }
    fn merge(self, right: Self) -> Self {
        let best = match (self.best, right.best) {
            (Some(a), Some(b)) => Some(better(a, b)),
            (a, b) => a.or(b),
        };
        Self { best }
    }
    fn reverse(self) -> Self {
        self
    }
}

/// Interface of the global spanning-forest authority.
///
/// Connectivity preconditions are the caller's contract: violating them is a
/// protocol bug and aborts.
pub trait LinkCutTree {
    /// New forest with n vertices and no edges.
    fn new(n: usize) -> Self;
    /// Returns the root of the tree containing u.
    fn find_root(&mut self, u: Vertex) -> Vertex;
    fn connected(&mut self, u: Vertex, v: Vertex) -> bool;
    /// Makes u the root of its current tree.
    fn reroot(&mut self, u: Vertex);
    /// Adds the edge (u,v) at the given admission tier. Panics if u and v
    /// are already connected.
    fn link(&mut self, u: Vertex, v: Vertex, tier: Tier);
    /// Removes the edge (u,v). Panics if no such edge exists.
    fn cut(&mut self, u: Vertex, v: Vertex);
    fn has_edge(&self, u: Vertex, v: Vertex) -> bool;
    fn edge_tier(&self, u: Vertex, v: Vertex) -> Option<Tier>;
    /// The maximum-admission-tier edge on the u..v path. Panics if u and v
    /// are not connected or are equal.
    fn path_aggregate(&mut self, u: Vertex, v: Vertex) -> (Edge, Tier);
}

#[derive(Debug)]
pub struct Lct<L>
where
    L: ReversibleLists<PathAgg>,
{
    l: L,
    // Non-EMPTY iff the item is a root of a preferred path that is not the topmost.
    parent: Vec<Idx>,
    /// Forest edge -> its list item.
    edges: BTreeMap<Edge, Idx>,
    /// Edge items released by cuts, reused by links.
    free: Vec<Idx>,
}

impl<L> Lct<L>
where
    L: ReversibleLists<PathAgg>,
{
    /// Returns the point where the access operation entered the topmost preferred path.
    fn access(&mut self, mut u: Idx) -> Idx {
        let mut prev_topmost = L::EMPTY;
        let mut last_u = u;
        while u != L::EMPTY {
            let order = self.l.order(u);
            let (_, _, after) = self.l.split(u, ..=order);
            debug_assert!(self.l.is_last(u));
            if after != L::EMPTY {
                let fa = self.l.first(after);
                self.parent[fa] = u;
            }
            self.l.concat(u, prev_topmost);
            last_u = u;
            u = self.l.first(u);
            (u, prev_topmost) = (std::mem::replace(&mut self.parent[u], L::EMPTY), u);
        }
        last_u
    }

    fn alloc(&mut self, data: PathItem) -> Idx {
        if let Some(idx) = self.free.pop() {
            self.l.mutate_data(idx, |d| *d = data);
            idx
        } else {
            let idx = self.l.create(data);
            self.parent.push(L::EMPTY);
            idx
        }
    }
}

impl<L> LinkCutTree for Lct<L>
where
    L: ReversibleLists<PathAgg>,
{
    fn new(n: usize) -> Self {
        let mut l = L::new(n);
        for i in 0..n {
            assert_eq!(l.create(PathItem::Vert), i);
        }
        Self {
            l,
            parent: vec![L::EMPTY; n],
            edges: BTreeMap::new(),
            free: vec![],
        }
    }

    fn find_root(&mut self, u: Vertex) -> Vertex {
        self.access(u);
        self.l.first(u)
    }

    fn connected(&mut self, u: Vertex, v: Vertex) -> bool {
        u == v || self.find_root(u) == self.find_root(v)
    }

    fn reroot(&mut self, u: Vertex) {
        self.access(u);
        // u will be the new root
        self.l.reverse(u);
    }

    fn link(&mut self, u: Vertex, v: Vertex, tier: Tier) {
        assert!(
            !self.connected(u, v),
            "LCT link({u}, {v}): endpoints already connected"
        );
        log::trace!("LCT link {u} {v} tier {tier}");
        let e = Edge::new(u, v);
        self.reroot(v);
        let it = self.alloc(PathItem::Weighted { e, tier });
        self.edges.insert(e, it);
        self.parent[it] = u;
        self.parent[v] = it;
    }

    fn cut(&mut self, u: Vertex, v: Vertex) {
        let e = Edge::new(u, v);
        let it = match self.edges.remove(&e) {
            Some(it) => it,
            None => panic!("LCT cut({u}, {v}): no such edge"),
        };
        log::trace!("LCT cut {u} {v}");
        self.reroot(u);
        self.access(v);
        let k = self.l.order(v);
        assert_eq!(k, 2, "LCT cut({u}, {v}): endpoints not adjacent");
        debug_assert_eq!(self.l.first(v), u);
        // Detach v, then strip the edge item off u's side.
        self.l.split(v, ..k);
        let ord = self.l.order(it);
        self.l.split(it, ..ord);
        debug_assert_eq!(self.parent[it], L::EMPTY);
        self.free.push(it);
    }

    fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        self.edges.contains_key(&Edge::new(u, v))
    }

    fn edge_tier(&self, u: Vertex, v: Vertex) -> Option<Tier> {
        let it = *self.edges.get(&Edge::new(u, v))?;
        match self.l.data(it) {
            PathItem::Weighted { tier, .. } => Some(*tier),
            PathItem::Vert => None,
        }
    }

    fn path_aggregate(&mut self, u: Vertex, v: Vertex) -> (Edge, Tier) {
        assert!(u != v, "path_aggregate({u}, {v}): trivial path");
        assert!(
            self.connected(u, v),
            "path_aggregate({u}, {v}): endpoints not connected"
        );
        self.reroot(u);
        self.access(v);
        let agg = self.l.total_agg(v);
        match agg.best {
            Some((tier, e)) => (e, tier),
            None => panic!("path_aggregate({u}, {v}): path without edges"),
        }
    }
}
