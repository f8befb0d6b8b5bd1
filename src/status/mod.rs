//! Component status tracking.
//!
//! Sub-components publish [`ComponentState`] changes, a job's
//! [`StatusAggregator`] folds them into one overall state, and the
//! [`StatusManager`] turns that into the [`WorkerStatus`] reported externally.

pub mod aggregator;
pub mod component_state;
pub mod manager;
pub mod publisher;
pub mod worker_status;

pub use aggregator::{AggregationPolicy, DefaultAggregationPolicy, StatusAggregator, Whenever};
pub use component_state::{ComponentState, ErrorKind, ErrorScope};
pub use manager::StatusManager;
pub use publisher::StatusPublisher;
pub use worker_status::{BusyStatus, HealthStatus, OverallHealth, WorkerStatus};
