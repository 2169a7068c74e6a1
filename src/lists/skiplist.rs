use std::fmt::{Debug, Formatter};

use rand::{rngs, Rng, SeedableRng};

use super::{AggregatedData, Idx, Lists};

/// Tower heights are geometric with ratio 1/2, capped here. Sentinels get
/// the full height so every leftward climb terminates at the list head.
const MAX_HEIGHT: usize = 32;

/// Sentinel indices live in their own arena and are tagged with the top bit
/// so they never collide with item indices handed out by `create`.
const S_BIT: usize = 1 << (usize::BITS - 1);

fn is_sent(x: Idx) -> bool {
    x != usize::MAX && x & S_BIT != 0
}

#[derive(Debug, Clone)]
struct Level<Ag> {
    prev: Idx,
    next: Idx,
    /// Number of items in `[self, next)` at this level.
    span: usize,
    /// Aggregate over the items in `[self, next)` at this level.
    agg: Ag,
}

impl<Ag: AggregatedData> Level<Ag> {
    fn empty() -> Self {
        Self {
            prev: SkipLists::<Ag>::EMPTY,
            next: SkipLists::<Ag>::EMPTY,
            span: 0,
            agg: Ag::default(),
        }
    }
}

type Tower<Ag> = Vec<Level<Ag>>;

struct ItemNode<Ag: AggregatedData> {
    data: Ag::Data,
    tower: Tower<Ag>,
}

/// Skip-list implementation of [`Lists`]: expected O(log n) search, concat
/// and split, with O(1) level-0 neighbour access. Does not support reversal.
pub struct SkipLists<Ag: AggregatedData = ()> {
    items: Vec<ItemNode<Ag>>,
    sents: Vec<Tower<Ag>>,
    free_sents: Vec<usize>,
    rng: rngs::StdRng,
}

impl<Ag: AggregatedData> Debug for SkipLists<Ag> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        writeln!(f, "SkipLists:")?;
        for raw in 0..self.sents.len() {
            if self.free_sents.contains(&raw) {
                continue;
            }
            write!(f, " [")?;
            let mut x = self.sents[raw][0].next;
            while x != Self::EMPTY {
                let n = &self.items[x];
                write!(f, "{}(h{} {:?}) ", x, n.tower.len(), n.data)?;
                x = n.tower[0].next;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

impl<Ag: AggregatedData> SkipLists<Ag> {
    fn level(&self, x: Idx, l: usize) -> &Level<Ag> {
        if is_sent(x) {
            &self.sents[x & !S_BIT][l]
        } else {
            &self.items[x].tower[l]
        }
    }
    fn level_mut(&mut self, x: Idx, l: usize) -> &mut Level<Ag> {
        if is_sent(x) {
            &mut self.sents[x & !S_BIT][l]
        } else {
            &mut self.items[x].tower[l]
        }
    }
    fn height(&self, x: Idx) -> usize {
        if is_sent(x) {
            MAX_HEIGHT
        } else {
            self.items[x].tower.len()
        }
    }
    fn sample_height(&mut self) -> usize {
        (self.rng.gen::<u32>().trailing_ones() as usize + 1).min(MAX_HEIGHT)
    }
    fn alloc_sentinel(&mut self) -> Idx {
        let raw = if let Some(raw) = self.free_sents.pop() {
            for l in 0..MAX_HEIGHT {
                self.sents[raw][l] = Level::empty();
            }
            raw
        } else {
            self.sents.push(vec![Level::empty(); MAX_HEIGHT]);
            self.sents.len() - 1
        };
        raw | S_BIT
    }
    fn free_sentinel(&mut self, s: Idx) {
        self.free_sents.push(s & !S_BIT);
    }
    /// The sentinel heading u's list, reached by climbing left at the top of
    /// each tower along the way.
    fn sentinel_of(&self, u: Idx) -> Idx {
        let mut x = u;
        while !is_sent(x) {
            let h = self.height(x);
            x = self.level(x, h - 1).prev;
        }
        x
    }
    fn first_item(&self, s: Idx) -> Idx {
        self.level(s, 0).next
    }
    /// Recompute span and aggregate of (x, l) from the level below.
    fn recompute_level(&mut self, x: Idx, l: usize) {
        if l == 0 {
            if !is_sent(x) {
                let agg = Ag::from(&self.items[x].data);
                let lv = self.level_mut(x, 0);
                lv.span = 1;
                lv.agg = agg;
            } else {
                let lv = self.level_mut(x, 0);
                lv.span = 0;
                lv.agg = Ag::default();
            }
            return;
        }
        let stop = self.level(x, l).next;
        let mut span = 0;
        let mut agg = Ag::default();
        let mut y = x;
        loop {
            let below = self.level(y, l - 1);
            span += below.span;
            agg = agg.merge(below.agg.clone());
            y = below.next;
            if y == stop || y == Self::EMPTY {
                break;
            }
        }
        let lv = self.level_mut(x, l);
        lv.span = span;
        lv.agg = agg;
    }
    /// Recompute every (node, level) pair whose coverage contains u's
    /// position: u's own tower, then the leftward climbing path.
    fn fix_path(&mut self, u: Idx) {
        let mut x = u;
        let mut lo = 0;
        loop {
            let h = self.height(x);
            for l in lo..h {
                self.recompute_level(x, l);
            }
            if h >= MAX_HEIGHT {
                break;
            }
            lo = h;
            x = self.level(x, h - 1).prev;
        }
    }
    /// Last item of the list headed by sentinel s.
    fn tail_item(&self, s: Idx) -> Idx {
        let mut cur = s;
        for l in (0..MAX_HEIGHT).rev() {
            if l >= self.height(cur) {
                continue;
            }
            while self.level(cur, l).next != Self::EMPTY {
                cur = self.level(cur, l).next;
            }
        }
        debug_assert!(!is_sent(cur));
        cur
    }
    /// Split the list headed by s before its k-th item (k of n items).
    /// Returns the sentinels of the left and right parts.
    fn cut_at(&mut self, s: Idx, k: usize, n: usize) -> (Option<Idx>, Option<Idx>) {
        if k == 0 {
            return (None, Some(s));
        }
        if k >= n {
            return (Some(s), None);
        }
        let x = self.kth_from(s, k);
        debug_assert!(!is_sent(x));
        let sb = self.alloc_sentinel();
        // Covering path of x's position above x's own tower, collected
        // before any rewiring.
        let hx = self.height(x);
        let mut above = vec![];
        {
            let mut lo = hx;
            let mut y = self.level(x, hx - 1).prev;
            while lo < MAX_HEIGHT {
                let hy = self.height(y);
                if hy > lo {
                    above.push((y, lo, hy));
                }
                if hy >= MAX_HEIGHT {
                    break;
                }
                let py = self.level(y, hy - 1).prev;
                lo = lo.max(hy);
                y = py;
            }
        }
        // x's own levels: predecessors keep their coverage, x moves to sb.
        for l in 0..hx {
            let p = self.level(x, l).prev;
            self.level_mut(p, l).next = Self::EMPTY;
            self.level_mut(x, l).prev = sb;
            self.level_mut(sb, l).next = x;
        }
        // Higher levels: links crossing the boundary are rerouted to sb.
        for &(y, lo, hy) in &above {
            for l in lo..hy {
                let z = self.level(y, l).next;
                self.level_mut(y, l).next = Self::EMPTY;
                if z != Self::EMPTY {
                    self.level_mut(z, l).prev = sb;
                    self.level_mut(sb, l).next = z;
                }
            }
        }
        // Left side shrank at the crossing levels; rebuild bottom-up.
        for &(y, lo, hy) in &above {
            for l in lo..hy {
                self.recompute_level(y, l);
            }
        }
        for l in 0..MAX_HEIGHT {
            self.recompute_level(sb, l);
        }
        (Some(s), Some(sb))
    }
    /// K-th item of the list headed by sentinel s, assuming k < list length.
    fn kth_from(&self, s: Idx, mut k: usize) -> Idx {
        let mut cur = s;
        for l in (0..MAX_HEIGHT).rev() {
            if l >= self.height(cur) {
                continue;
            }
            loop {
                let lv = self.level(cur, l);
                if lv.next != Self::EMPTY && lv.span <= k {
                    k -= lv.span;
                    cur = lv.next;
                } else {
                    break;
                }
            }
        }
        if !is_sent(cur) && k == 0 {
            cur
        } else {
            Self::EMPTY
        }
    }
}

impl<Ag: AggregatedData> Lists<Ag> for SkipLists<Ag> {
    const EMPTY: Idx = usize::MAX;

    fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            sents: Vec::with_capacity(capacity),
            free_sents: vec![],
            rng: rand::rngs::StdRng::seed_from_u64(2012),
        }
    }

    fn create(&mut self, data: Ag::Data) -> Idx {
        let idx = self.items.len();
        let h = self.sample_height();
        let s = self.alloc_sentinel();
        let single = Ag::from(&data);
        let tower = (0..h)
            .map(|_| Level {
                prev: s,
                next: Self::EMPTY,
                span: 1,
                agg: single.clone(),
            })
            .collect();
        self.items.push(ItemNode { data, tower });
        for l in 0..MAX_HEIGHT {
            let lv = &mut self.sents[s & !S_BIT][l];
            if l < h {
                lv.next = idx;
            } else {
                lv.span = 1;
                lv.agg = single.clone();
            }
        }
        idx
    }

    fn total_size(&self) -> usize {
        self.items.len()
    }

    fn data(&self, u: Idx) -> &Ag::Data {
        &self.items[u].data
    }

    fn mutate_data(&mut self, u: Idx, f: impl FnOnce(&mut Ag::Data)) {
        f(&mut self.items[u].data);
        self.fix_path(u);
    }

    fn order(&mut self, u: Idx) -> usize {
        let mut ord = 0;
        let mut x = u;
        while !is_sent(x) {
            let h = self.height(x);
            let p = self.level(x, h - 1).prev;
            ord += self.level(p, h - 1).span;
            x = p;
        }
        ord
    }

    fn find_kth(&mut self, u: Idx, k: usize) -> Idx {
        if u == Self::EMPTY {
            return Self::EMPTY;
        }
        self.kth_from(self.sentinel_of(u), k)
    }

    fn first(&mut self, u: Idx) -> Idx {
        self.first_item(self.sentinel_of(u))
    }

    fn last(&mut self, u: Idx) -> Idx {
        self.tail_item(self.sentinel_of(u))
    }

    fn next(&mut self, u: Idx) -> Idx {
        self.neighbor(u, true)
    }

    fn prev(&mut self, u: Idx) -> Idx {
        self.neighbor(u, false)
    }

    fn is_first(&mut self, u: Idx) -> bool {
        is_sent(self.items[u].tower[0].prev)
    }

    fn is_last(&mut self, u: Idx) -> bool {
        self.items[u].tower[0].next == Self::EMPTY
    }

    fn on_same_list(&mut self, u: Idx, v: Idx) -> bool {
        self.sentinel_of(u) == self.sentinel_of(v)
    }

    fn len(&mut self, u: Idx) -> usize {
        if u == Self::EMPTY {
            return 0;
        }
        let s = self.sentinel_of(u);
        let mut len = 0;
        let mut x = s;
        while x != Self::EMPTY {
            let lv = self.level(x, MAX_HEIGHT - 1);
            len += lv.span;
            x = lv.next;
        }
        len
    }

    fn total_agg(&mut self, u: Idx) -> Ag {
        if u == Self::EMPTY {
            return Ag::default();
        }
        let s = self.sentinel_of(u);
        let mut agg = Ag::default();
        let mut x = s;
        while x != Self::EMPTY {
            let lv = self.level(x, MAX_HEIGHT - 1);
            agg = agg.merge(lv.agg.clone());
            x = lv.next;
        }
        agg
    }

    fn iter_list(&mut self, u: Idx) -> Vec<Idx> {
        if u == Self::EMPTY {
            return vec![];
        }
        let mut all = vec![];
        let mut x = self.first_item(self.sentinel_of(u));
        while x != Self::EMPTY {
            all.push(x);
            x = self.items[x].tower[0].next;
        }
        all
    }

    fn concat(&mut self, u: Idx, v: Idx) -> Idx {
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
        let sa = self.sentinel_of(u);
        let sb = self.sentinel_of(v);
        if sa == sb {
            return self.first_item(sa);
        }
        log::trace!("skiplist concat {u} {v}");
        let tail = self.tail_item(sa);
        // Splice level by level along A's right edge.
        let mut x = tail;
        let mut l = 0;
        while l < MAX_HEIGHT {
            let h = self.height(x);
            while l < h {
                let bnext = self.level(sb, l).next;
                if bnext != Self::EMPTY {
                    debug_assert_eq!(self.level(x, l).next, Self::EMPTY);
                    self.level_mut(x, l).next = bnext;
                    self.level_mut(bnext, l).prev = x;
                }
                l += 1;
            }
            if l >= MAX_HEIGHT {
                break;
            }
            x = self.level(x, h - 1).prev;
        }
        self.fix_path(tail);
        self.free_sentinel(sb);
        self.first_item(sa)
    }

    fn split_lr(&mut self, u: Idx, l: usize, r: usize) -> (Idx, Idx, Idx) {
        if u == Self::EMPTY {
            return (Self::EMPTY, Self::EMPTY, Self::EMPTY);
        }
        let s = self.sentinel_of(u);
        let n = self.len(u);
        assert!(l <= r && r <= n, "invalid split range {l}..{r}");
        let (s_ab, s_c) = self.cut_at(s, r, n);
        let (s_a, s_b) = match s_ab {
            None => (None, None),
            Some(sab) => self.cut_at(sab, l, r),
        };
        let part = |me: &mut Self, so: Option<Idx>| match so {
            None => Self::EMPTY,
            Some(so) => {
                let f = me.first_item(so);
                debug_assert_ne!(f, Self::EMPTY);
                f
            }
        };
        (part(self, s_a), part(self, s_b), part(self, s_c))
    }
}

impl<Ag: AggregatedData> SkipLists<Ag> {
    /// O(1) neighbour on level 0; sentinels are invisible to callers.
    pub fn neighbor(&self, u: Idx, to_right: bool) -> Idx {
        let lv = &self.items[u].tower[0];
        let x = if to_right { lv.next } else { lv.prev };
        if is_sent(x) {
            Self::EMPTY
        } else {
            x
        }
    }
}
