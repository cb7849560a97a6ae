//! Merging a freshly fetched work with its cached copy
//!
//! The fresh fetch knows which units currently exist; the cache knows what was
//! already fetched and downloaded. Reconciliation keeps both: every unit seen
//! by either side survives, and for units seen by both the cached subtree is
//! kept so finished items are never downloaded again.

use crate::tree::{Unit, Work};
use serde::Deserialize;
use std::collections::BTreeMap;

/// How a unit present in both the fresh fetch and the cache is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The cached unit replaces the fresh one wholesale
    #[default]
    CachedWins,

    /// Cached items are kept, but url and title come from the fresh unit when
    /// it has them
    RefreshUnitMetadata,
}

/// Merges `cached` into `fresh` in place
///
/// 1. The fresh title wins; the cached title is a fallback.
/// 2. Units with the same `num` take the cached subtree (see [`MergePolicy`]).
/// 3. Cached units the fresh fetch did not surface are appended.
/// 4. Units are sorted by `num`.
/// 5. Every back-reference is pointed at `fresh`.
///
/// Cached units sharing a `num` are collapsed, the first one winning.
pub fn reconcile(fresh: &mut Work, cached: Work, policy: MergePolicy) {
    if fresh.title.is_none() {
        fresh.title = cached.title;
    }

    let mut cached_units: BTreeMap<u32, Unit> = BTreeMap::new();
    for unit in cached.units {
        if cached_units.contains_key(&unit.num) {
            tracing::warn!(
                "Cache of {} lists unit {} more than once; keeping the first",
                fresh.url,
                unit.num
            );
            continue;
        }
        cached_units.insert(unit.num, unit);
    }

    let mut matched = 0usize;
    for unit in &mut fresh.units {
        if let Some(cached_unit) = cached_units.remove(&unit.num) {
            merge_unit(unit, cached_unit, policy);
            matched += 1;
        }
    }

    let appended = cached_units.len();
    fresh.units.extend(cached_units.into_values());
    fresh.units.sort_by_key(|u| u.num);
    fresh.units.dedup_by_key(|u| u.num);
    fresh.relink();

    tracing::debug!(
        "Reconciled {}: {} units matched cache, {} appended from cache, {} total",
        fresh.url,
        matched,
        appended,
        fresh.units.len()
    );
}

fn merge_unit(fresh: &mut Unit, cached: Unit, policy: MergePolicy) {
    match policy {
        MergePolicy::CachedWins => {
            fresh.url = cached.url;
            fresh.title = cached.title;
        }
        MergePolicy::RefreshUnitMetadata => {
            if fresh.url.is_empty() {
                fresh.url = cached.url;
            }
            if fresh.title.is_none() {
                fresh.title = cached.title;
            }
        }
    }
    fresh.items = cached.items;
}
