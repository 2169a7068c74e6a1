pub mod comm;
pub mod euler_tour_forest;
pub mod graph;
pub mod link_cut_tree;
pub mod lists;
pub mod messages;
pub mod metrics;
pub mod sketch;
pub mod stream;
pub mod tier;
pub use stream::{ConnectivitySolver, SolverConfig, SolverError, StreamSolver};

use euler_tour_forest::TourAgg;
use lists::skiplist::SkipLists;
use lists::splay::SplayLists;

/// The fastest implemented solver configuration on this crate.
pub type FastConnectivitySolver = StreamSolver<SplayLists<TourAgg>>;

/// The same protocol with skip-list tour sequences.
pub type SkipConnectivitySolver = StreamSolver<SkipLists<TourAgg>>;
