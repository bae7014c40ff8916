//! Line parsing shared by every source variant

use ps_core::{network_prefix, Descriptor, FineIdentity};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Parse descriptor lines in source order.
///
/// Blank lines, lines that do not parse as a URI and lines without a
/// transport security setting are dropped. Lines sharing a fine identity
/// collapse into one entry: the position of the first occurrence is kept,
/// the content (fragment included) of the last one wins.
pub fn parse_descriptors<'a, I>(lines: I) -> Vec<Descriptor>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result: Vec<Descriptor> = Vec::new();
    let mut positions: HashMap<FineIdentity, usize> = HashMap::new();
    let mut dropped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let descriptor = match Descriptor::parse(line) {
            Ok(d) => d,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };

        if !descriptor.is_secure() {
            dropped += 1;
            continue;
        }

        let Some(key) = descriptor.fine_identity() else {
            dropped += 1;
            continue;
        };

        match positions.get(&key) {
            Some(&idx) => result[idx] = descriptor,
            None => {
                positions.insert(key, result.len());
                result.push(descriptor);
            }
        }
    }

    if dropped > 0 {
        debug!("Dropped {} unusable descriptor lines", dropped);
    }

    result
}

/// Reduce allow-listed address lines to their three-octet prefixes
pub fn parse_prefixes(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| network_prefix(line).to_string())
        .collect()
}

/// Collect allow-listed server names, one per line
pub fn parse_names(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
