//! Optional counters injected into the coordinator instead of process-wide
//! state. The default sink drops everything.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    UpdatesBuffered,
    BatchesDispatched,
    GreedyPasses,
    NormalRefreshes,
    Evictions,
    Admissions,
    ConnectivityQueries,
    ComponentQueries,
}

pub trait MetricsSink: Send + Sync {
    fn incr(&self, counter: Counter);
}

/// Discards every count.
#[derive(Debug, Default)]
pub struct NopMetrics;

impl MetricsSink for NopMetrics {
    fn incr(&self, _: Counter) {}
}
