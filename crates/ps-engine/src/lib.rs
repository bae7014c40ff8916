//! ps-engine: Aggregation and merge engine
//!
//! ```text
//! DescriptorSource ──fetch──▶ AllowListFilter ──▶ reconcile ──▶ cache["all"]
//!                                                                   │
//!                    cache["available"] ◀── dedup ◀── gate ◀── Prober
//! ```
//!
//! The [`Scheduler`] drives the two halves on independent cadences; the
//! [`DescriptorUpdater`] owns the merge logic and the cache writes.

pub mod error;
pub mod filter;
pub mod merge;
pub mod prober;
pub mod scheduler;
pub mod updater;

pub use error::{EngineError, Result};
pub use filter::AllowListFilter;
pub use prober::{Prober, TcpProber};
pub use scheduler::{refresh_signal, RefreshSignal, Scheduler, SchedulerConfig, SchedulerHandle};
pub use updater::{DescriptorUpdater, PublishReport, RefreshReport, UpdaterSettings};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        AllowListFilter, DescriptorUpdater, Prober, Scheduler, SchedulerConfig, TcpProber,
        UpdaterSettings,
    };
}
