use std::fmt::{Debug, Display, Formatter};

use debug_tree::{add_branch_to, AsTree, TreeBuilder};
use derivative::Derivative;

use super::{AggregatedData, Idx, Lists, ReversibleLists};

fn node_fmt(u: &Idx, f: &mut Formatter) -> std::fmt::Result {
    if *u == usize::MAX {
        write!(f, "∅")
    } else {
        write!(f, "{u}")
    }
}
fn node2_fmt([u, v]: &[Idx; 2], f: &mut Formatter) -> std::fmt::Result {
    write!(f, "[")?;
    node_fmt(u, f)?;
    write!(f, ", ")?;
    node_fmt(v, f)?;
    write!(f, "]")
}

/// Used to pretty print a Idx, outputting ∅ if it is EMPTY.
pub struct PrettyIdx(pub Idx);

impl Display for PrettyIdx {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        node_fmt(&self.0, f)
    }
}

impl Debug for PrettyIdx {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
struct Node<Ag: AggregatedData> {
    #[derivative(Debug(format_with = "node_fmt"))]
    parent: Idx,
    /// Left and right child
    #[derivative(Debug(format_with = "node2_fmt"))]
    child: [Idx; 2],
    /// This nodes children and aggregated data should be flipped.
    flip_subtree: bool,
    /// Data for this node
    data: Ag::Data,
    /// Aggregated data for this node's subtree
    ag_data: Ag,
    size: usize,
}

impl<Ag: AggregatedData> Node<Ag> {
    fn new(data: Ag::Data) -> Self {
        Self {
            ag_data: Ag::from(&data),
            data,
            child: [SplayLists::<Ag>::EMPTY; 2],
            parent: SplayLists::<Ag>::EMPTY,
            size: 1,
            flip_subtree: false,
        }
    }
}

/// Splay-tree implementation of [`Lists`]. Every access splays the touched
/// node to the root of its tree (zig, zig-zig, zig-zag), which is what keeps
/// the amortized bound over arbitrary access sequences.
pub struct SplayLists<Ag: AggregatedData = ()> {
    nodes: Vec<Node<Ag>>,
}

impl<Ag: AggregatedData> Debug for SplayLists<Ag> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let builder = TreeBuilder::new();
        let _b = builder.add_branch("SplayLists");
        for u in 0..self.nodes.len() {
            if self.nodes[u].parent == Self::EMPTY {
                self.tree_inorder_dbg(u, &builder);
            }
        }
        writeln!(f, "{}", builder.string())
    }
}

impl<Ag: AggregatedData> SplayLists<Ag> {
    fn tree_inorder_dbg<T: AsTree>(&self, u: Idx, tree: &T) {
        let nu = &self.nodes[u];
        if nu.child[0] != Self::EMPTY {
            add_branch_to!(*tree, "left child of {u}");
            self.tree_inorder_dbg(nu.child[0], tree);
        }
        add_branch_to!(*tree, "[{u}] {nu:?}");
        if nu.child[1] != Self::EMPTY {
            self.tree_inorder_dbg(nu.child[1], tree);
        }
    }
    fn n(&self, u: Idx) -> Option<&Node<Ag>> {
        // Even safer than just self.nodes.get(u)
        if u == Self::EMPTY {
            None
        } else {
            Some(&self.nodes[u])
        }
    }
    fn size(&self, u: Idx) -> usize {
        self.n(u).map_or(0, |n| n.size)
    }
    fn parent_of(&self, u: Idx) -> Idx {
        self.n(u).map_or(Self::EMPTY, |n| n.parent)
    }
    /// Aggregate of u's subtree with any pending flip applied.
    fn agg_of(&self, u: Idx) -> Ag {
        self.n(u).map_or_else(Ag::default, |n| {
            if n.flip_subtree {
                n.ag_data.clone().reverse()
            } else {
                n.ag_data.clone()
            }
        })
    }
    /// Push a pending flip down one level.
    fn unlaze_flip(&mut self, u: Idx) {
        let n = &mut self.nodes[u];
        if n.flip_subtree {
            n.flip_subtree = false;
            n.ag_data = n.ag_data.clone().reverse();
            n.child.swap(0, 1);
            for c in n.child {
                if c != Self::EMPTY {
                    self.nodes[c].flip_subtree ^= true;
                }
            }
        }
    }
    /// Call when children changed. u's own flip must already be pushed.
    fn recalc(&mut self, u: Idx) {
        debug_assert!(!self.nodes[u].flip_subtree);
        let [l, r] = self.nodes[u].child;
        self.nodes[u].size = self.size(l) + 1 + self.size(r);
        self.nodes[u].ag_data = self
            .agg_of(l)
            .merge(Ag::from(&self.nodes[u].data))
            .merge(self.agg_of(r));
    }
    /// Which child of its parent is u. Meaningless for roots.
    fn dir_of(&self, u: Idx) -> usize {
        (self.nodes[self.nodes[u].parent].child[1] == u) as usize
    }
    fn rotate(&mut self, x: Idx) {
        let p = self.nodes[x].parent;
        let g = self.nodes[p].parent;
        self.unlaze_flip(p);
        self.unlaze_flip(x);
        let dx = self.dir_of(x);
        let b = self.nodes[x].child[dx ^ 1];
        self.nodes[p].child[dx] = b;
        if b != Self::EMPTY {
            self.nodes[b].parent = p;
        }
        self.nodes[x].child[dx ^ 1] = p;
        if g != Self::EMPTY {
            let dp = (self.nodes[g].child[1] == p) as usize;
            self.nodes[g].child[dp] = x;
        }
        self.nodes[p].parent = x;
        self.nodes[x].parent = g;
        self.recalc(p);
        self.recalc(x);
    }
    /// Splay u to the root of its tree.
    fn splay(&mut self, u: Idx) {
        let mut path = vec![u];
        let mut cur = u;
        while self.parent_of(cur) != Self::EMPTY {
            cur = self.nodes[cur].parent;
            path.push(cur);
        }
        for &x in path.iter().rev() {
            self.unlaze_flip(x);
        }
        while self.parent_of(u) != Self::EMPTY {
            let p = self.nodes[u].parent;
            let g = self.parent_of(p);
            if g != Self::EMPTY {
                if self.dir_of(u) == self.dir_of(p) {
                    self.rotate(p); // zig-zig
                } else {
                    self.rotate(u); // zig-zag
                }
            }
            self.rotate(u);
        }
    }
    /// K-th node (0-indexed) of the tree rooted at u. u must be a tree root
    /// and k < size. Does not splay.
    fn descend_kth(&mut self, u: Idx, mut k: usize) -> Idx {
        let mut cur = u;
        loop {
            self.unlaze_flip(cur);
            let [l, r] = self.nodes[cur].child;
            let sl = self.size(l);
            if k < sl {
                cur = l;
            } else if k == sl {
                return cur;
            } else {
                k -= sl + 1;
                cur = r;
            }
        }
    }
    /// (First k, rest). u must be a tree root.
    fn split_k(&mut self, u: Idx, k: usize) -> (Idx, Idx) {
        if k == 0 {
            return (Self::EMPTY, u);
        }
        if k >= self.size(u) {
            return (u, Self::EMPTY);
        }
        log::trace!("split_k({u}, {k})");
        let x = self.descend_kth(u, k);
        self.splay(x);
        let l = self.nodes[x].child[0];
        self.nodes[x].child[0] = Self::EMPTY;
        self.nodes[l].parent = Self::EMPTY;
        self.recalc(x);
        (l, x)
    }
}

impl<Ag: AggregatedData> Lists<Ag> for SplayLists<Ag> {
    const EMPTY: Idx = usize::MAX;

    fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    fn create(&mut self, data: Ag::Data) -> Idx {
        let idx = self.nodes.len();
        self.nodes.push(Node::new(data));
        idx
    }

    fn total_size(&self) -> usize {
        self.nodes.len()
    }

    fn data(&self, u: Idx) -> &Ag::Data {
        &self.nodes[u].data
    }

    fn mutate_data(&mut self, u: Idx, f: impl FnOnce(&mut Ag::Data)) {
        self.splay(u);
        f(&mut self.nodes[u].data);
        self.recalc(u);
    }

    fn order(&mut self, u: Idx) -> usize {
        self.splay(u);
        self.size(self.nodes[u].child[0])
    }

    fn find_kth(&mut self, u: Idx, k: usize) -> Idx {
        if u == Self::EMPTY {
            return Self::EMPTY;
        }
        self.splay(u);
        if k >= self.nodes[u].size {
            return Self::EMPTY;
        }
        let x = self.descend_kth(u, k);
        self.splay(x);
        x
    }

    fn len(&mut self, u: Idx) -> usize {
        if u == Self::EMPTY {
            0
        } else {
            self.splay(u);
            self.nodes[u].size
        }
    }

    fn total_agg(&mut self, u: Idx) -> Ag {
        if u == Self::EMPTY {
            return Ag::default();
        }
        self.splay(u);
        // splay pushed u, so the stored aggregate is the true one
        self.nodes[u].ag_data.clone()
    }

    fn concat(&mut self, u: Idx, v: Idx) -> Idx {
        log::trace!("concat({}, {})", PrettyIdx(u), PrettyIdx(v));
        if u == Self::EMPTY {
            return if v == Self::EMPTY {
                Self::EMPTY
            } else {
                self.first(v)
            };
        }
        if v == Self::EMPTY {
            return self.first(u);
        }
        self.splay(u);
        self.splay(v);
        if u == v || self.nodes[u].parent != Self::EMPTY {
            // Already on the same list.
            return self.first(v);
        }
        let lu = self.last(u);
        debug_assert_eq!(self.nodes[lu].child[1], Self::EMPTY);
        self.nodes[lu].child[1] = v;
        self.nodes[v].parent = lu;
        self.recalc(lu);
        self.first(lu)
    }

    fn split_lr(&mut self, u: Idx, l: usize, r: usize) -> (Idx, Idx, Idx) {
        if u == Self::EMPTY {
            return (Self::EMPTY, Self::EMPTY, Self::EMPTY);
        }
        self.splay(u);
        let total = self.nodes[u].size;
        assert!(l <= r && r <= total, "invalid split range {l}..{r}");
        log::trace!("split({u}, {l}..{r})");
        let (a, bc) = self.split_k(u, l);
        let (b, c) = if bc == Self::EMPTY {
            (Self::EMPTY, Self::EMPTY)
        } else {
            self.split_k(bc, r - l)
        };
        (a, b, c)
    }
}

impl<Ag: AggregatedData> ReversibleLists<Ag> for SplayLists<Ag> {
    fn reverse(&mut self, u: Idx) {
        self.splay(u);
        self.nodes[u].flip_subtree ^= true;
    }
}
