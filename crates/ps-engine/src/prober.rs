//! Reliability probing
//!
//! A prober takes a batch of descriptors and rewrites each one's score in
//! place. How many probes run at once is up to the prober; the engine only
//! passes a concurrency hint.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ps_core::{Descriptor, ScorePolicy};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Default connect timeout for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe every descriptor and update its score.
    async fn probe(&self, descriptors: &mut [Descriptor], concurrency: usize);
}

/// Checks that a descriptor's `host:port` accepts TCP connections.
///
/// This is a reachability check only; the proxy protocol is never spoken.
pub struct TcpProber {
    timeout: Duration,
    policy: ScorePolicy,
}

impl TcpProber {
    pub fn new(timeout: Duration, policy: ScorePolicy) -> Self {
        Self { timeout, policy }
    }

    async fn reachable(&self, descriptor: &Descriptor) -> bool {
        let Ok(params) = descriptor.connection() else {
            return false;
        };
        let addr = params.socket_addr();

        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Probe of {} failed: {}", addr, e);
                false
            }
            Err(_) => {
                debug!("Probe of {} timed out", addr);
                false
            }
        }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT, ScorePolicy::default())
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, descriptors: &mut [Descriptor], concurrency: usize) {
        let start = Instant::now();
        let total = descriptors.len();

        let probes: Vec<_> = descriptors
            .iter_mut()
            .map(|descriptor| async move {
                let ok = self.reachable(descriptor).await;
                descriptor.set_score(self.policy.apply(descriptor.score(), ok));
                usize::from(ok)
            })
            .collect();

        let reachable: usize = stream::iter(probes)
            .buffer_unordered(concurrency.max(1))
            .fold(0, |acc, ok| async move { acc + ok })
            .await;

        info!(
            "Probed {} descriptors ({} reachable) in {:?}",
            total,
            reachable,
            start.elapsed()
        );
    }
}
