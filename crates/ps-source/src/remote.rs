//! Remote URL source
//!
//! Descriptor lists are pulled from every configured location on each
//! fetch. A location that fails (connect error, non-success status,
//! unreadable body) is logged and skipped; the others still contribute.

use crate::error::{Result, SourceError};
use crate::parse::{parse_descriptors, parse_names, parse_prefixes};
use crate::DescriptorSource;
use async_trait::async_trait;
use ps_core::Descriptor;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct UrlSource {
    descriptor_urls: Vec<String>,
    prefixes_url: String,
    names_url: String,
    http_client: reqwest::Client,
}

impl UrlSource {
    pub fn new(
        descriptor_urls: Vec<String>,
        prefixes_url: impl Into<String>,
        names_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("proxysieve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SourceError::Client)?;

        Ok(Self {
            descriptor_urls,
            prefixes_url: prefixes_url.into(),
            names_url: names_url.into(),
            http_client,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let to_err = |source| SourceError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?;

        response.text().await.map_err(to_err)
    }
}

#[async_trait]
impl DescriptorSource for UrlSource {
    fn name(&self) -> &str {
        "url"
    }

    async fn fetch(&self) -> Result<Vec<Descriptor>> {
        if self.descriptor_urls.is_empty() {
            return Err(SourceError::NoSources);
        }

        let mut bodies = Vec::with_capacity(self.descriptor_urls.len());
        for url in &self.descriptor_urls {
            match self.get_text(url).await {
                Ok(body) => {
                    debug!("Fetched {} bytes from {}", body.len(), url);
                    bodies.push(body);
                }
                Err(e) => error!("Skipping descriptor source: {}", e),
            }
        }

        if bodies.is_empty() {
            return Err(SourceError::AllSourcesFailed(self.descriptor_urls.len()));
        }

        let descriptors = parse_descriptors(bodies.iter().flat_map(|body| body.lines()));
        info!(
            "Fetched {} descriptors from {} of {} sources",
            descriptors.len(),
            bodies.len(),
            self.descriptor_urls.len()
        );
        Ok(descriptors)
    }

    async fn fetch_allowed_prefixes(&self) -> Result<HashSet<String>> {
        Ok(parse_prefixes(&self.get_text(&self.prefixes_url).await?))
    }

    async fn fetch_allowed_names(&self) -> Result<HashSet<String>> {
        Ok(parse_names(&self.get_text(&self.names_url).await?))
    }
}
