//! Per-tier state and the local halves of the refresh protocol.

use crate::euler_tour_forest::{EulerTourForest, TourAgg};
use crate::graph::{Edge, EdgeUpdate, Tier, UpdateKind, Vertex};
use crate::lists::Lists;
use crate::messages::{GreedyRefreshMessage, RefreshEndpoint, UpdateMessage};
use crate::sketch::{SampleResult, Sketch, SketchConfig};

/// Owns one tier's forest. The worker loop in `stream` composes these local
/// operations with the message protocol; everything here is single-threaded
/// and directly testable.
pub struct TierCoordinator<L>
where
    L: Lists<TourAgg>,
{
    tier: Tier,
    forest: EulerTourForest<L>,
}

impl<L> TierCoordinator<L>
where
    L: Lists<TourAgg>,
{
    pub fn new(tier: Tier, n: usize, sketches: SketchConfig) -> Self {
        Self {
            tier,
            forest: EulerTourForest::new(n, |_| Sketch::new(sketches)),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Toggle the update into both endpoint sketches. A deletion also drops
    /// the tree edge wherever this tier carries it; `cut` is silent when the
    /// edge is not in the forest, so no lookup is needed first.
    pub fn apply_update(&mut self, up: EdgeUpdate) {
        let (u, v) = up.edge.endpoints();
        let id = up.edge.id();
        self.forest.update_sketch(u, id);
        self.forest.update_sketch(v, id);
        if up.kind == UpdateKind::Delete {
            self.forest.cut(u, v);
        }
    }

    pub fn size(&mut self, v: Vertex) -> usize {
        self.forest.get_size(v)
    }

    pub fn sample(&mut self, v: Vertex) -> SampleResult {
        self.forest.sample(v)
    }

    pub fn link(&mut self, u: Vertex, v: Vertex) -> bool {
        self.forest.link(u, v)
    }

    pub fn cut(&mut self, u: Vertex, v: Vertex) -> bool {
        self.forest.cut(u, v)
    }

    pub fn components(&mut self) -> Vec<Vec<Vertex>> {
        self.forest.components()
    }

    /// Snapshot of one endpoint, forwarded to the tier above.
    pub fn endpoint_info(&mut self, v: Vertex) -> RefreshEndpoint {
        RefreshEndpoint {
            v,
            prev_tier_size: self.size(v),
            sample: self.sample(v),
        }
    }

    /// Greedy-check isolation test: this tier is isolated for an update when
    /// either endpoint's component is exactly as large as one tier up and
    /// its sketch yields a candidate.
    pub fn greedy_isolated(&mut self, up: EdgeUpdate, above: GreedyRefreshMessage) -> bool {
        let (u, v) = up.edge.endpoints();
        self.endpoint_isolated(u, above.size1) || self.endpoint_isolated(v, above.size2)
    }

    fn endpoint_isolated(&mut self, v: Vertex, size_above: usize) -> bool {
        self.size(v) == size_above && matches!(self.sample(v), SampleResult::Good(_))
    }

    /// Normal-refresh decision: the tier below is isolated under this tier
    /// iff its component stopped growing here and it sampled a candidate.
    pub fn decide(&mut self, ep: &RefreshEndpoint) -> Option<Edge> {
        if self.size(ep.v) != ep.prev_tier_size {
            return None;
        }
        ep.sample.good()
    }

    /// Apply a broadcast link/cut command if it reaches this tier.
    pub fn apply_command(&mut self, cmd: UpdateMessage) {
        match cmd {
            UpdateMessage::Link {
                endpoint1,
                endpoint2,
                start_tier,
            } if self.tier >= start_tier => {
                self.link(endpoint1, endpoint2);
            }
            UpdateMessage::Cut {
                endpoint1,
                endpoint2,
                start_tier,
            } if self.tier >= start_tier => {
                self.cut(endpoint1, endpoint2);
            }
            _ => {}
        }
    }
}
