//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ps_cache::MemoryCache;
use ps_core::{Descriptor, Thresholds};
use ps_engine::{AllowListFilter, DescriptorUpdater, Prober, UpdaterSettings};
use ps_source::parse::parse_descriptors;
use ps_source::{DescriptorSource, SourceError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ALLOWED_PREFIXES: &[&str] = &["1.1.1", "1.2.3"];
pub const ALLOWED_NAMES: &[&str] = &["a.ru"];

/// Source serving a mutable list of lines
#[derive(Default)]
pub struct StaticSource {
    lines: Mutex<Vec<String>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
    delay: Mutex<Duration>,
}

impl StaticSource {
    pub fn new(lines: &[&str]) -> Arc<Self> {
        let source = Self::default();
        source.set_lines(lines);
        Arc::new(source)
    }

    pub fn set_lines(&self, lines: &[&str]) {
        *self.lines.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every following fetch take `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DescriptorSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> ps_source::Result<Vec<Descriptor>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::AllSourcesFailed(1));
        }
        let lines = self.lines.lock().unwrap().clone();
        Ok(parse_descriptors(lines.iter().map(String::as_str)))
    }

    async fn fetch_allowed_prefixes(&self) -> ps_source::Result<HashSet<String>> {
        Ok(ALLOWED_PREFIXES.iter().map(|s| s.to_string()).collect())
    }

    async fn fetch_allowed_names(&self) -> ps_source::Result<HashSet<String>> {
        Ok(ALLOWED_NAMES.iter().map(|s| s.to_string()).collect())
    }
}

/// Prober assigning fixed scores by fine identity; unknown descriptors
/// score zero, like a failed probe.
#[derive(Default)]
pub struct ScriptedProber {
    scores: Mutex<HashMap<String, f64>>,
    calls: AtomicUsize,
    hang: AtomicBool,
}

impl ScriptedProber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hanging() -> Arc<Self> {
        let prober = Self::default();
        prober.hang.store(true, Ordering::SeqCst);
        Arc::new(prober)
    }

    pub fn score(&self, fine_identity: &str, score: f64) {
        self.scores
            .lock()
            .unwrap()
            .insert(fine_identity.to_string(), score);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, descriptors: &mut [Descriptor], _concurrency: usize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let scores = self.scores.lock().unwrap().clone();
        for descriptor in descriptors.iter_mut() {
            let key = descriptor
                .fine_identity()
                .map(|k| k.to_string())
                .unwrap_or_default();
            descriptor.set_score(scores.get(&key).copied().unwrap_or(0.0));
        }
    }
}

pub struct Harness {
    pub cache: Arc<MemoryCache>,
    pub source: Arc<StaticSource>,
    pub prober: Arc<ScriptedProber>,
    pub updater: Arc<DescriptorUpdater>,
}

pub async fn harness(lines: &[&str]) -> Harness {
    harness_with(lines, ScriptedProber::new()).await
}

pub async fn harness_with(lines: &[&str], prober: Arc<ScriptedProber>) -> Harness {
    let cache = Arc::new(MemoryCache::new());
    let source = StaticSource::new(lines);
    let filter = AllowListFilter::from_source(&*source).await.unwrap();
    let settings = UpdaterSettings {
        thresholds: Thresholds::new(5.0, 50.0),
        probe_concurrency: 4,
    };
    let updater = Arc::new(DescriptorUpdater::new(
        cache.clone(),
        Arc::new(filter),
        source.clone(),
        prober.clone(),
        settings,
    ));

    Harness {
        cache,
        source,
        prober,
        updater,
    }
}

pub fn fine_keys(list: &[Descriptor]) -> Vec<String> {
    let mut keys: Vec<String> = list
        .iter()
        .filter_map(|d| d.fine_identity().map(|k| k.to_string()))
        .collect();
    keys.sort();
    keys
}
