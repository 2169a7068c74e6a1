//! Stream coordination: batching, the two-phase refresh protocol and the
//! public query API.
//!
//! Rank 0 runs on the caller's thread and owns the stream buffer and the
//! global link-cut tree. Rank t+1 is a worker thread owning tier t. All
//! coordination is message passing over the [`comm`](crate::comm) mesh; the
//! per-update receive schedules are fixed, so the protocol cannot deadlock.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::JoinHandle;

use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::comm::Mailbox;
use crate::euler_tour_forest::TourAgg;
use crate::graph::{Edge, EdgeUpdate, UpdateKind, Vertex};
use crate::link_cut_tree::{Lct, LinkCutTree, PathAgg};
use crate::lists::{splay::SplayLists, Lists};
use crate::messages::{
    GreedyRefreshMessage, LctQueryMessage, LctResponseMessage, Message, RefreshEndpoint,
    RefreshMessage, StreamMessage, UpdateMessage,
};
use crate::metrics::{Counter, MetricsSink, NopMetrics};
use crate::sketch::{SampleResult, SketchConfig};
use crate::tier::TierCoordinator;

/// Configuration errors abort before any worker starts.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("world size {actual} does not match the {required} ranks required for {tiers} tiers")]
    WorldSize {
        required: usize,
        actual: usize,
        tiers: usize,
    },
    #[error("batch size must be positive")]
    ZeroBatch,
    #[error("at least two vertices are required, got {0}")]
    TooFewVertices(usize),
}

#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Updates buffered before a batch is dispatched.
    pub batch_size: usize,
    /// Per-query sketch error bound; controls the column count.
    pub sketch_err: f64,
    /// Seed for all per-tier sketch randomness.
    pub seed: u64,
    /// Tier count override; derived from n when absent.
    pub tiers: Option<usize>,
    /// Expected world size (ranks). Checked against tiers + 1 when present.
    pub world_size: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            sketch_err: 1.0 / 64.0,
            seed: 2012,
            tiers: None,
            world_size: None,
        }
    }
}

/// Tiers grow by a factor of 3/2, so this many of them always suffice.
pub fn required_tiers(n: usize) -> usize {
    let t = ((n as f64).ln() / 1.5f64.ln()).ceil() as usize;
    t.max(2)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Buffering,
    GreedyCheck,
    NormalRefresh,
    Ended,
}

/// Public interface of a dynamic connectivity solver.
pub trait ConnectivitySolver {
    /// New instance for an empty graph on n nodes.
    fn new(n: usize) -> Self
    where
        Self: Sized;
    /// Feed one stream update. May dispatch a full batch.
    fn update(&mut self, up: EdgeUpdate);
    /// Are u and v connected? Drains all pending updates first.
    fn connectivity_query(&mut self, u: Vertex, v: Vertex) -> bool;
    /// The full component partition. Drains all pending updates first.
    fn cc_query(&mut self) -> Vec<BTreeSet<Vertex>>;
    /// Drain and shut every worker down. Nothing may be called afterwards.
    fn end(&mut self);
}

/// The batched, tiered solver. `L` is the sequence structure backing the
/// tier forests; the link-cut tree always runs on splay lists since it needs
/// reversal.
pub struct StreamSolver<L = SplayLists<TourAgg>>
where
    L: Lists<TourAgg> + Send + 'static,
{
    mailbox: Mailbox,
    lct: Lct<SplayLists<PathAgg>>,
    buffer: Vec<EdgeUpdate>,
    batch_size: usize,
    tiers: usize,
    n: usize,
    phase: Phase,
    workers: Vec<JoinHandle<()>>,
    metrics: Arc<dyn MetricsSink>,
    _lists: PhantomData<L>,
}

impl<L> Debug for StreamSolver<L>
where
    L: Lists<TourAgg> + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StreamSolver(n={}, tiers={}, phase={:?}, buffered={})",
            self.n,
            self.tiers,
            self.phase,
            self.buffer.len()
        )
    }
}

impl<L> StreamSolver<L>
where
    L: Lists<TourAgg> + Send + 'static,
{
    pub fn with_config(n: usize, config: SolverConfig) -> Result<Self, SolverError> {
        Self::with_metrics(n, config, Arc::new(NopMetrics))
    }

    pub fn with_metrics(
        n: usize,
        config: SolverConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, SolverError> {
        if n < 2 {
            return Err(SolverError::TooFewVertices(n));
        }
        if config.batch_size == 0 {
            return Err(SolverError::ZeroBatch);
        }
        let tiers = config.tiers.unwrap_or_else(|| required_tiers(n));
        let required = tiers + 1;
        if let Some(actual) = config.world_size {
            if actual != required {
                return Err(SolverError::WorldSize {
                    required,
                    actual,
                    tiers,
                });
            }
        }
        log::debug!("starting solver: n={n} tiers={tiers} batch={}", config.batch_size);
        let mut boxes = Mailbox::mesh(required).into_iter();
        let mailbox = boxes.next().expect("mesh is never empty");
        let mut seed_rng = rand::rngs::StdRng::seed_from_u64(config.seed);
        let mut workers = vec![];
        for (t, mb) in boxes.enumerate() {
            let sketches = SketchConfig::configure(n * n, config.sketch_err, seed_rng.gen(), n);
            let batch_size = config.batch_size;
            let handle = std::thread::Builder::new()
                .name(format!("tier-{t}"))
                .spawn(move || {
                    let tc = TierCoordinator::<L>::new(t, n, sketches);
                    tier_worker(mb, tc, tiers, batch_size);
                })
                .expect("failed to spawn tier worker");
            workers.push(handle);
        }
        Ok(Self {
            mailbox,
            lct: Lct::new(n),
            buffer: vec![],
            batch_size: config.batch_size,
            tiers,
            n,
            phase: Phase::Buffering,
            workers,
            metrics,
            _lists: PhantomData,
        })
    }

    fn set_phase(&mut self, phase: Phase) {
        log::debug!("coordinator phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Dispatch the buffered batch: greedy check, then normal refresh when
    /// any tier reported isolation.
    fn dispatch(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.set_phase(Phase::GreedyCheck);
        self.metrics.incr(Counter::BatchesDispatched);
        self.metrics.incr(Counter::GreedyPasses);
        let batch = std::mem::take(&mut self.buffer);
        // The coordinator's share of the batch: deletions of admitted edges
        // leave the global forest right away.
        for up in &batch {
            let (u, v) = up.edge.endpoints();
            if up.kind == UpdateKind::Delete && self.lct.has_edge(u, v) {
                self.lct.cut(u, v);
            }
        }
        let gathered = self.mailbox.all_gather(None);
        let first = gathered.into_iter().flatten().min();
        if let Some(first) = first {
            self.set_phase(Phase::NormalRefresh);
            self.metrics.incr(Counter::NormalRefreshes);
            log::debug!("normal refresh from update {first} of {}", batch.len());
            for up in &batch[first..] {
                self.refresh_update(up.edge);
            }
        }
        self.set_phase(Phase::Buffering);
    }

    /// Coordinator side of one replayed update: kick off the tier chain,
    /// then serve each deciding tier in rank order.
    fn refresh_update(&mut self, edge: Edge) {
        let (u, v) = edge.endpoints();
        let blank = |v| RefreshEndpoint {
            v,
            // Never matches a real tour size, so tier 0 always forwards.
            prev_tier_size: 0,
            sample: SampleResult::Fail,
        };
        self.mailbox.send(
            1,
            Message::Refresh(RefreshMessage {
                endpoints: [blank(u), blank(v)],
            }),
        );
        for step in 0..self.tiers {
            let decider = step + 1;
            for _ in 0..2 {
                match self.mailbox.recv_update(decider) {
                    UpdateMessage::NotIsolated => {
                        self.mailbox.broadcast(Message::Update(UpdateMessage::Empty));
                        self.mailbox.broadcast(Message::Update(UpdateMessage::Empty));
                    }
                    UpdateMessage::Isolated {
                        endpoint1,
                        endpoint2,
                        ..
                    } => {
                        let resp = self.answer_cycle_query(LctQueryMessage {
                            endpoint1,
                            endpoint2,
                        });
                        self.mailbox.send(decider, Message::LctResponse(resp));
                        for _ in 0..2 {
                            let cmd = self.mailbox.recv_update(decider);
                            self.apply_lct_command(cmd);
                            self.mailbox.broadcast(Message::Update(cmd));
                        }
                    }
                    other => panic!("coordinator: unexpected decision {other:?}"),
                }
            }
        }
    }

    /// Would the candidate close a cycle, and which edge would it evict?
    fn answer_cycle_query(&mut self, q: LctQueryMessage) -> LctResponseMessage {
        if self.lct.connected(q.endpoint1, q.endpoint2) {
            let (ce, w) = self.lct.path_aggregate(q.endpoint1, q.endpoint2);
            LctResponseMessage {
                connected: true,
                cycle_edge: Some(ce),
                weight: w,
            }
        } else {
            LctResponseMessage {
                connected: false,
                cycle_edge: None,
                weight: 0,
            }
        }
    }

    fn apply_lct_command(&mut self, cmd: UpdateMessage) {
        match cmd {
            UpdateMessage::Empty => {}
            UpdateMessage::Cut {
                endpoint1,
                endpoint2,
                ..
            } => {
                self.lct.cut(endpoint1, endpoint2);
                self.metrics.incr(Counter::Evictions);
            }
            UpdateMessage::Link {
                endpoint1,
                endpoint2,
                start_tier,
            } => {
                self.lct.link(endpoint1, endpoint2, start_tier);
                self.metrics.incr(Counter::Admissions);
            }
            other => panic!("coordinator: {other:?} is not a forest command"),
        }
    }

    fn assert_live(&self) {
        assert!(
            self.phase != Phase::Ended,
            "solver used after end()"
        );
    }

    fn check_vertex(&self, v: Vertex) {
        assert!(v < self.n, "vertex {v} out of range 0..{}", self.n);
    }
}

impl<L> ConnectivitySolver for StreamSolver<L>
where
    L: Lists<TourAgg> + Send + 'static,
{
    fn new(n: usize) -> Self {
        Self::with_config(n, SolverConfig::default()).expect("default config is valid")
    }

    fn update(&mut self, up: EdgeUpdate) {
        self.assert_live();
        let (u, v) = up.edge.endpoints();
        self.check_vertex(u);
        self.check_vertex(v);
        self.metrics.incr(Counter::UpdatesBuffered);
        self.mailbox.broadcast(Message::Stream(StreamMessage::Update {
            edge: up.edge,
            kind: up.kind,
        }));
        self.buffer.push(up);
        if self.buffer.len() == self.batch_size {
            self.dispatch();
        }
    }

    fn connectivity_query(&mut self, u: Vertex, v: Vertex) -> bool {
        self.assert_live();
        self.check_vertex(u);
        self.check_vertex(v);
        self.metrics.incr(Counter::ConnectivityQueries);
        if !self.buffer.is_empty() {
            self.mailbox.broadcast(Message::Stream(StreamMessage::Query));
            self.dispatch();
        }
        self.lct.connected(u, v)
    }

    fn cc_query(&mut self) -> Vec<BTreeSet<Vertex>> {
        self.assert_live();
        self.metrics.incr(Counter::ComponentQueries);
        self.mailbox
            .broadcast(Message::Stream(StreamMessage::CcQuery));
        self.dispatch();
        let comps = self.mailbox.recv_components(self.tiers);
        comps
            .into_iter()
            .map(|c| c.into_iter().collect())
            .collect()
    }

    fn end(&mut self) {
        self.assert_live();
        self.mailbox.broadcast(Message::Stream(StreamMessage::End));
        self.dispatch();
        self.set_phase(Phase::Ended);
        for w in self.workers.drain(..) {
            if w.join().is_err() {
                panic!("tier worker crashed");
            }
        }
    }
}

impl<L> Drop for StreamSolver<L>
where
    L: Lists<TourAgg> + Send + 'static,
{
    fn drop(&mut self) {
        if self.phase != Phase::Ended && !std::thread::panicking() {
            self.end();
        }
    }
}

/// Main loop of the rank owning one tier.
fn tier_worker<L>(mb: Mailbox, mut tc: TierCoordinator<L>, tiers: usize, batch_size: usize)
where
    L: Lists<TourAgg>,
{
    let mut buffer: Vec<EdgeUpdate> = vec![];
    loop {
        match mb.recv_stream(0) {
            StreamMessage::Update { edge, kind } => {
                buffer.push(EdgeUpdate { edge, kind });
                if buffer.len() == batch_size {
                    drain(&mb, &mut tc, &mut buffer, tiers);
                }
            }
            StreamMessage::Query => {
                drain(&mb, &mut tc, &mut buffer, tiers);
            }
            StreamMessage::CcQuery => {
                drain(&mb, &mut tc, &mut buffer, tiers);
                if tc.tier() == tiers - 1 {
                    let comps = tc.components();
                    mb.send(0, Message::Components(comps));
                }
            }
            StreamMessage::End => {
                drain(&mb, &mut tc, &mut buffer, tiers);
                break;
            }
        }
    }
}

/// Tier side of one batch: apply everything, exchange sizes downward, join
/// the isolation reduction, then follow the replay chain if needed.
fn drain<L>(mb: &Mailbox, tc: &mut TierCoordinator<L>, buffer: &mut Vec<EdgeUpdate>, tiers: usize)
where
    L: Lists<TourAgg>,
{
    if buffer.is_empty() {
        return;
    }
    let batch = std::mem::take(buffer);
    let t = tc.tier();
    let me = t + 1;
    log::debug!("tier {t}: greedy check over {} updates", batch.len());
    for up in &batch {
        tc.apply_update(*up);
    }
    if t > 0 {
        for up in &batch {
            let (u, v) = up.edge.endpoints();
            let sizes = GreedyRefreshMessage {
                size1: tc.size(u),
                size2: tc.size(v),
            };
            mb.send(me - 1, Message::Greedy(sizes));
        }
    }
    let mut first_isolated = None;
    if t + 1 < tiers {
        for (i, up) in batch.iter().enumerate() {
            let above = mb.recv_greedy(me + 1);
            if first_isolated.is_none() && tc.greedy_isolated(*up, above) {
                first_isolated = Some(i);
            }
        }
    }
    let first = mb.all_gather(first_isolated).into_iter().flatten().min();
    if let Some(first) = first {
        log::debug!("tier {t}: normal refresh from update {first}");
        for _ in first..batch.len() {
            refresh_step(mb, tc, tiers);
        }
    }
}

/// Tier side of one replayed update. Every rank walks the same fixed
/// schedule: each deciding step produces one decision message per endpoint
/// toward the coordinator and exactly two command broadcasts back.
fn refresh_step<L>(mb: &Mailbox, tc: &mut TierCoordinator<L>, tiers: usize)
where
    L: Lists<TourAgg>,
{
    let t = tc.tier();
    let me = t + 1;
    for step in 0..tiers {
        if step != t {
            for _ in 0..4 {
                let cmd = mb.recv_update(0);
                tc.apply_command(cmd);
            }
            continue;
        }
        let rm = mb.recv_refresh(me - 1);
        for ep in &rm.endpoints {
            match tc.decide(ep) {
                Some(candidate) => {
                    let (a, b) = candidate.endpoints();
                    log::debug!("tier {t}: endpoint {} isolated, candidate {candidate}", ep.v);
                    mb.send(
                        0,
                        Message::Update(UpdateMessage::Isolated {
                            endpoint1: a,
                            endpoint2: b,
                            start_tier: t,
                        }),
                    );
                    let resp = mb.recv_lct_response(0);
                    let cut_cmd = match (resp.connected, resp.cycle_edge) {
                        (true, Some(ce)) => {
                            let (c1, c2) = ce.endpoints();
                            UpdateMessage::Cut {
                                endpoint1: c1,
                                endpoint2: c2,
                                start_tier: resp.weight,
                            }
                        }
                        (false, None) => UpdateMessage::Empty,
                        _ => panic!("tier {t}: malformed LCT response"),
                    };
                    let link_cmd = UpdateMessage::Link {
                        endpoint1: a,
                        endpoint2: b,
                        start_tier: t,
                    };
                    mb.send(0, Message::Update(cut_cmd));
                    mb.send(0, Message::Update(link_cmd));
                }
                None => {
                    mb.send(0, Message::Update(UpdateMessage::NotIsolated));
                }
            }
            // Commands take effect here, via the same broadcast every
            // other rank sees.
            for _ in 0..2 {
                let cmd = mb.recv_update(0);
                tc.apply_command(cmd);
            }
        }
        if t + 1 < tiers {
            let endpoints = [
                tc.endpoint_info(rm.endpoints[0].v),
                tc.endpoint_info(rm.endpoints[1].v),
            ];
            mb.send(me + 1, Message::Refresh(RefreshMessage { endpoints }));
        }
    }
}
