//! Local file source

use crate::error::{Result, SourceError};
use crate::parse::{parse_descriptors, parse_names, parse_prefixes};
use crate::DescriptorSource;
use async_trait::async_trait;
use ps_core::Descriptor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads descriptors and allow-lists from files on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    descriptor_paths: Vec<PathBuf>,
    prefixes_path: PathBuf,
    names_path: PathBuf,
}

impl FileSource {
    pub fn new(
        descriptor_paths: Vec<PathBuf>,
        prefixes_path: impl Into<PathBuf>,
        names_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            descriptor_paths,
            prefixes_path: prefixes_path.into(),
            names_path: names_path.into(),
        }
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl DescriptorSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<Vec<Descriptor>> {
        if self.descriptor_paths.is_empty() {
            return Err(SourceError::NoSources);
        }

        let mut contents = Vec::with_capacity(self.descriptor_paths.len());
        for path in &self.descriptor_paths {
            match read(path).await {
                Ok(text) => contents.push(text),
                Err(e) => warn!("Skipping descriptor file: {}", e),
            }
        }

        if contents.is_empty() {
            return Err(SourceError::AllSourcesFailed(self.descriptor_paths.len()));
        }

        let descriptors = parse_descriptors(contents.iter().flat_map(|text| text.lines()));
        info!(
            "Read {} descriptors from {} of {} files",
            descriptors.len(),
            contents.len(),
            self.descriptor_paths.len()
        );
        Ok(descriptors)
    }

    async fn fetch_allowed_prefixes(&self) -> Result<HashSet<String>> {
        Ok(parse_prefixes(&read(&self.prefixes_path).await?))
    }

    async fn fetch_allowed_names(&self) -> Result<HashSet<String>> {
        Ok(parse_names(&read(&self.names_path).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_all_three_lists() {
        let dir = tempfile::tempdir().unwrap();
        let configs = write(
            dir.path(),
            "configs.txt",
            "vless://u@1.2.3.4:443?security=tls&amp;sni=a.ru#A\n\nvless://u@1.2.3.4:80?security=none#B\n",
        );
        let cidrs = write(dir.path(), "cidr.txt", "1.2.3.0/24\n");
        let names = write(dir.path(), "names.txt", "a.ru\n");

        let source = FileSource::new(vec![configs], cidrs, names);

        let descriptors = source.fetch().await.unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(
            descriptors[0].connection().unwrap().server_name.as_deref(),
            Some("a.ru")
        );
        assert!(source.fetch_allowed_prefixes().await.unwrap().contains("1.2.3"));
        assert!(source.fetch_allowed_names().await.unwrap().contains("a.ru"));
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = write(dir.path(), "a.txt", "vless://u@1.2.3.4:443?security=tls#A\n");
        let missing = dir.path().join("missing.txt");

        let source = FileSource::new(vec![missing.clone(), present], "x", "y");
        assert_eq!(source.fetch().await.unwrap().len(), 1);

        let broken = FileSource::new(vec![missing], "x", "y");
        assert!(matches!(
            broken.fetch().await,
            Err(SourceError::AllSourcesFailed(1))
        ));
    }

    #[tokio::test]
    async fn test_missing_allow_list_is_an_error() {
        let source = FileSource::new(vec![], "/nonexistent/cidr.txt", "/nonexistent/names.txt");
        assert!(source.fetch_allowed_prefixes().await.is_err());
        assert!(source.fetch_allowed_names().await.is_err());
        assert!(matches!(source.fetch().await, Err(SourceError::NoSources)));
    }
}
