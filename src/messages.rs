//! Fixed-layout message contracts exchanged between the coordinator rank and
//! the tier ranks.

use crate::graph::{Edge, Tier, UpdateKind, Vertex};
use crate::sketch::SampleResult;

/// Coordinator -> all tiers: stream traffic and drain triggers.
#[derive(Clone, Copy, Debug)]
pub enum StreamMessage {
    Update { edge: Edge, kind: UpdateKind },
    Query,
    CcQuery,
    End,
}

/// Tier <-> tier and tier <-> coordinator commands during refresh.
#[derive(Clone, Copy, Debug)]
pub enum UpdateMessage {
    /// No-op placeholder keeping the broadcast schedule fixed.
    Empty,
    /// Admit (endpoint1, endpoint2) into every tier >= start_tier and into
    /// the global forest at weight start_tier.
    Link {
        endpoint1: Vertex,
        endpoint2: Vertex,
        start_tier: Tier,
    },
    /// Evict (endpoint1, endpoint2) from every tier >= start_tier and from
    /// the global forest.
    Cut {
        endpoint1: Vertex,
        endpoint2: Vertex,
        start_tier: Tier,
    },
    /// Deciding tier -> coordinator: the tier below is isolated and sampled
    /// the attached candidate. Implies a cycle query; answered with an
    /// [`LctResponseMessage`].
    Isolated {
        endpoint1: Vertex,
        endpoint2: Vertex,
        start_tier: Tier,
    },
    /// Deciding tier -> coordinator: nothing to do for this endpoint.
    NotIsolated,
}

/// The cycle query the global-forest holder answers.
#[derive(Clone, Copy, Debug)]
pub struct LctQueryMessage {
    pub endpoint1: Vertex,
    pub endpoint2: Vertex,
}

/// Coordinator -> deciding tier: answer to an [`UpdateMessage::Isolated`].
#[derive(Clone, Copy, Debug)]
pub struct LctResponseMessage {
    pub connected: bool,
    /// Max-tier edge on the cycle the candidate would close, when connected.
    pub cycle_edge: Option<Edge>,
    /// Admission tier of that edge.
    pub weight: Tier,
}

/// Snapshot of one endpoint at a tier, handed to the tier above during
/// normal refresh.
#[derive(Clone, Copy, Debug)]
pub struct RefreshEndpoint {
    pub v: Vertex,
    /// Tour size of v's component at the sending tier.
    pub prev_tier_size: usize,
    /// Sketch sample of v's component at the sending tier.
    pub sample: SampleResult,
}

/// Sequential hand-off between consecutive tiers during normal refresh.
#[derive(Clone, Copy, Debug)]
pub struct RefreshMessage {
    pub endpoints: [RefreshEndpoint; 2],
}

/// Component sizes of one update's endpoints, sent down one tier during the
/// greedy check.
#[derive(Clone, Copy, Debug)]
pub struct GreedyRefreshMessage {
    pub size1: usize,
    pub size2: usize,
}

/// Everything that can travel between ranks.
#[derive(Clone, Debug)]
pub enum Message {
    Stream(StreamMessage),
    Update(UpdateMessage),
    LctResponse(LctResponseMessage),
    Refresh(RefreshMessage),
    Greedy(GreedyRefreshMessage),
    /// All-gather contribution: each rank's first isolated update index.
    Gather(Option<usize>),
    /// Top tier -> coordinator: the component partition for a CcQuery.
    Components(Vec<Vec<Vertex>>),
}
