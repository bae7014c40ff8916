//! Descriptor updater
//!
//! Owns the two operations the scheduler drives:
//!
//! - [`DescriptorUpdater::refresh_from_source`]: fetch, filter, reconcile
//!   with the cached "all" list by fine identity, store "all".
//! - [`DescriptorUpdater::retest_and_publish`]: probe "all", carry the new
//!   scores back into "all", gate and dedup, store "available".
//!
//! Both read-modify-write steps run under one merge lock so that a retest
//! never writes back a list a concurrent refresh has already replaced.
//! Network work (fetching, probing) happens outside the lock.

use crate::error::Result;
use crate::filter::AllowListFilter;
use crate::merge::{apply_scores, publishable, reconcile};
use crate::prober::Prober;
use ps_cache::{CacheKey, DescriptorStore};
use ps_core::{Descriptor, Thresholds};
use ps_source::DescriptorSource;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default fan-out handed to the prober
pub const DEFAULT_PROBE_CONCURRENCY: usize = 40;

/// Tunables for the updater
#[derive(Debug, Clone, Copy)]
pub struct UpdaterSettings {
    pub thresholds: Thresholds,
    pub probe_concurrency: usize,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }
}

/// Outcome of a refresh run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub fetched: usize,
    pub allowed: usize,
    pub total: usize,
}

/// Outcome of a retest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub probed: usize,
    pub available: usize,
}

pub struct DescriptorUpdater {
    store: Arc<dyn DescriptorStore>,
    filter: Arc<AllowListFilter>,
    source: Arc<dyn DescriptorSource>,
    prober: Arc<dyn Prober>,
    settings: UpdaterSettings,
    merge_lock: Mutex<()>,
}

impl DescriptorUpdater {
    pub fn new(
        store: Arc<dyn DescriptorStore>,
        filter: Arc<AllowListFilter>,
        source: Arc<dyn DescriptorSource>,
        prober: Arc<dyn Prober>,
        settings: UpdaterSettings,
    ) -> Self {
        Self {
            store,
            filter,
            source,
            prober,
            settings,
            merge_lock: Mutex::new(()),
        }
    }

    /// Keep only descriptors that can be connected to and pass the filter
    fn filter_allowed(&self, fetched: Vec<Descriptor>) -> Vec<Descriptor> {
        fetched
            .into_iter()
            .filter(|descriptor| match self.filter.is_available(descriptor) {
                Ok(allowed) => allowed,
                Err(e) => {
                    debug!("Dropping descriptor: {}", e);
                    false
                }
            })
            .collect()
    }

    /// Pull descriptors from the source and merge them into "all".
    ///
    /// On a source error nothing in the cache is touched.
    pub async fn refresh_from_source(&self) -> Result<RefreshReport> {
        let start = Instant::now();

        let fetched = self.source.fetch().await?;
        let fetched_count = fetched.len();
        let allowed = self.filter_allowed(fetched);
        let allowed_count = allowed.len();

        let total = {
            let _guard = self.merge_lock.lock().await;
            let merged = match self.store.get(CacheKey::All).await {
                Some(cached) => reconcile(&cached, allowed),
                // First run: nothing to reconcile against
                None => allowed,
            };
            let total = merged.len();
            self.store.set(CacheKey::All, merged).await;
            total
        };

        let report = RefreshReport {
            fetched: fetched_count,
            allowed: allowed_count,
            total,
        };
        info!(
            "Refresh from {} source: {} fetched, {} allowed, {} known (took {:?})",
            self.source.name(),
            report.fetched,
            report.allowed,
            report.total,
            start.elapsed()
        );
        Ok(report)
    }

    /// Probe everything in "all" and publish what qualifies to "available".
    pub async fn retest_and_publish(&self) -> Result<PublishReport> {
        let cached = match self.store.get(CacheKey::All).await {
            Some(cached) => cached,
            None => {
                self.refresh_from_source().await?;
                self.store.get(CacheKey::All).await.unwrap_or_default()
            }
        };

        let start = Instant::now();
        let mut probed: Vec<Descriptor> = cached.to_vec();
        self.prober
            .probe(&mut probed, self.settings.probe_concurrency)
            .await;
        info!("Retest of {} descriptors took {:?}", probed.len(), start.elapsed());

        let available = publishable(&probed, &self.settings.thresholds);
        let report = PublishReport {
            probed: probed.len(),
            available: available.len(),
        };

        {
            let _guard = self.merge_lock.lock().await;
            if let Some(current) = self.store.get(CacheKey::All).await {
                let (scored, updated) = apply_scores(&current, &probed);
                debug!("Carried {} scores back into '{}'", updated, CacheKey::All);
                self.store.set(CacheKey::All, scored).await;
            }
            self.store.set(CacheKey::Available, available).await;
        }

        info!(
            "Published {} of {} descriptors",
            report.available, report.probed
        );
        Ok(report)
    }
}
