//! Merge, gate and dedup steps
//!
//! Pure functions over descriptor lists. The updater decides when they run
//! and where the results are stored.

use ps_core::{CoarseIdentity, Descriptor, FineIdentity, Thresholds};
use std::collections::HashMap;

/// Reconcile freshly fetched descriptors with the cached ones.
///
/// Keyed by fine identity: a fetched descriptor replaces a cached one with
/// the same key in place, otherwise it is appended. Descriptors without a
/// usable identity are left out.
pub fn reconcile(cached: &[Descriptor], fresh: Vec<Descriptor>) -> Vec<Descriptor> {
    let mut result: Vec<Descriptor> = Vec::with_capacity(cached.len() + fresh.len());
    let mut positions: HashMap<FineIdentity, usize> = HashMap::with_capacity(result.capacity());

    for descriptor in cached.iter().cloned().chain(fresh) {
        let Some(key) = descriptor.fine_identity() else {
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

    result
}

/// Keep descriptors at or above the accept threshold, marking those at or
/// above the stable threshold.
///
/// One forward pass; each survivor is marked as it is appended, so the
/// output keeps the input order.
pub fn stability_gate(descriptors: &[Descriptor], thresholds: &Thresholds) -> Vec<Descriptor> {
    let mut result = Vec::new();

    for descriptor in descriptors {
        if !thresholds.accepts(descriptor.score()) {
            continue;
        }
        let mut survivor = descriptor.clone();
        if thresholds.is_stable(survivor.score()) {
            survivor.mark_stable();
        }
        result.push(survivor);
    }

    result
}

/// Keep the best-scoring descriptor per coarse identity.
///
/// Groups appear in the order of their first member. On equal scores the
/// later descriptor wins.
pub fn dedup_coarse(descriptors: Vec<Descriptor>) -> Vec<Descriptor> {
    let mut result: Vec<Descriptor> = Vec::new();
    let mut positions: HashMap<CoarseIdentity, usize> = HashMap::new();

    for descriptor in descriptors {
        let Some(key) = descriptor.coarse_identity() else {
            continue;
        };
        match positions.get(&key) {
            Some(&idx) => {
                if descriptor.score() >= result[idx].score() {
                    result[idx] = descriptor;
                }
            }
            None => {
                positions.insert(key, result.len());
                result.push(descriptor);
            }
        }
    }

    result
}

/// Build the published list from a probed set
pub fn publishable(probed: &[Descriptor], thresholds: &Thresholds) -> Vec<Descriptor> {
    dedup_coarse(stability_gate(probed, thresholds))
}

/// Copy probe scores onto the current list.
///
/// Only descriptors that are still exactly what was probed get the new
/// score; anything a refresh replaced in the meantime is left alone.
/// Returns the updated list and how many scores were carried over.
pub fn apply_scores(current: &[Descriptor], probed: &[Descriptor]) -> (Vec<Descriptor>, usize) {
    let by_key: HashMap<FineIdentity, &Descriptor> = probed
        .iter()
        .filter_map(|d| d.fine_identity().map(|key| (key, d)))
        .collect();

    let mut updated = 0;
    let result = current
        .iter()
        .map(|descriptor| {
            let mut descriptor = descriptor.clone();
            let probed = descriptor
                .fine_identity()
                .and_then(|key| by_key.get(&key).copied());
            if let Some(probed) = probed {
                if probed.link() == descriptor.link() && probed.label() == descriptor.label() {
                    descriptor.set_score(probed.score());
                    updated += 1;
                }
            }
            descriptor
        })
        .collect();

    (result, updated)
}
