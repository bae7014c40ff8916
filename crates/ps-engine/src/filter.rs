//! Allow-list filter
//!
//! A descriptor passes only if its address prefix and its server name are
//! both allow-listed. The lists are snapshotted once at startup and never
//! change afterwards, so the filter is shared across tasks without locking.

use crate::error::Result;
use ps_core::{network_prefix, Descriptor};
use ps_source::DescriptorSource;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct AllowListFilter {
    prefixes: HashSet<String>,
    names: HashSet<String>,
}

impl AllowListFilter {
    pub fn new(prefixes: HashSet<String>, names: HashSet<String>) -> Self {
        Self { prefixes, names }
    }

    /// Snapshot both allow-lists from a source.
    ///
    /// Any failure is returned as-is: running with an incomplete filter is
    /// not an option.
    pub async fn from_source(source: &dyn DescriptorSource) -> Result<Self> {
        let prefixes = source.fetch_allowed_prefixes().await?;
        let names = source.fetch_allowed_names().await?;
        info!(
            "Allow-list loaded from {} source: {} network prefixes, {} server names",
            source.name(),
            prefixes.len(),
            names.len()
        );
        Ok(Self::new(prefixes, names))
    }

    /// Check a descriptor against both allow-lists.
    ///
    /// Errors if the descriptor lacks the attributes needed to check it.
    pub fn is_available(&self, descriptor: &Descriptor) -> ps_core::Result<bool> {
        let params = descriptor.connection()?;

        if !self.prefixes.contains(network_prefix(&params.host)) {
            return Ok(false);
        }

        Ok(params
            .server_name
            .as_deref()
            .is_some_and(|name| self.names.contains(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> AllowListFilter {
        AllowListFilter::new(
            ["1.2.3".to_string()].into_iter().collect(),
            ["good.ru".to_string()].into_iter().collect(),
        )
    }

    fn d(s: &str) -> Descriptor {
        Descriptor::parse(s).unwrap()
    }

    #[test]
    fn test_both_lists_required() {
        let filter = filter();
        assert!(filter
            .is_available(&d("vless://u@1.2.3.4:443?security=tls&sni=good.ru"))
            .unwrap());
        assert!(!filter
            .is_available(&d("vless://u@1.2.4.4:443?security=tls&sni=good.ru"))
            .unwrap());
        assert!(!filter
            .is_available(&d("vless://u@1.2.3.4:443?security=tls&sni=bad.ru"))
            .unwrap());
    }

    #[test]
    fn test_missing_server_name_rejected() {
        assert!(!filter()
            .is_available(&d("vless://u@1.2.3.4:443?security=tls"))
            .unwrap());
    }

    #[test]
    fn test_prefix_is_string_match() {
        // 1.2.30.x shares the leading characters but not the prefix
        assert!(!filter()
            .is_available(&d("vless://u@1.2.30.4:443?security=tls&sni=good.ru"))
            .unwrap());
    }

    #[test]
    fn test_unusable_descriptor_errors() {
        assert!(filter()
            .is_available(&d("vless://1.2.3.4:443?security=tls&sni=good.ru"))
            .is_err());
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = AllowListFilter::default();
        assert!(!filter
            .is_available(&d("vless://u@1.2.3.4:443?security=tls&sni=good.ru"))
            .unwrap());
    }
}
