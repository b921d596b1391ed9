// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod engine;
pub mod metrics;
pub mod normalize;
pub mod scorer;
pub mod signal;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::SignalAggregator;
pub use crate::api::{create_router, AppState};
pub use crate::config::{AggregationConfig, Credentials};
pub use crate::signal::{AggregatedSignal, SignalAction};
