//! ps-source: Descriptor and allow-list sources
//!
//! A source produces three things:
//! - candidate connection descriptors (re-fetched periodically)
//! - allow-listed network prefixes (fetched once at startup)
//! - allow-listed server names (fetched once at startup)
//!
//! Two variants share the [`DescriptorSource`] contract: [`FileSource`]
//! reads local files, [`UrlSource`] issues HTTP GETs against a fixed list
//! of locations. Both split their input into lines and go through the same
//! parsing rules in [`parse`].

pub mod error;
pub mod file;
pub mod parse;
pub mod remote;

use async_trait::async_trait;
use ps_core::Descriptor;
use std::collections::HashSet;

pub use error::{Result, SourceError};
pub use file::FileSource;
pub use remote::UrlSource;

#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Fetch candidate descriptors, already deduplicated by fine identity
    /// and stripped of unencrypted entries.
    ///
    /// Individual failing locations are skipped; an error means nothing
    /// could be fetched at all.
    async fn fetch(&self) -> Result<Vec<Descriptor>>;

    /// Fetch allow-listed three-octet network prefixes
    async fn fetch_allowed_prefixes(&self) -> Result<HashSet<String>>;

    /// Fetch allow-listed server names
    async fn fetch_allowed_names(&self) -> Result<HashSet<String>>;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{DescriptorSource, FileSource, SourceError, UrlSource};
}
