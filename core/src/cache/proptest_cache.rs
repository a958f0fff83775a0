//! Property-based tests for the detection cache bounds and aging rules.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use super::config::{CacheConfiguration, EvictionPolicy};
use super::store::DetectionCache;
use crate::clock::ManualClock;
use crate::detection::{BoundingBox, DetectedObjectRecord, ObjectCategory};

const NOW_MS: u64 = 10_000;

#[derive(Debug, Clone)]
struct Insert {
    id: u8,
    category: usize,
    confidence: f32,
    timestamp_ms: u64,
    corner: Option<(f32, f32)>,
}

impl Insert {
    fn to_record(&self) -> DetectedObjectRecord {
        let record = DetectedObjectRecord::new(
            format!("obj-{}", self.id),
            ObjectCategory::ALL[self.category],
            self.confidence,
            self.timestamp_ms,
        )
        .unwrap();
        match self.corner {
            Some((x, y)) => record.with_bounds(BoundingBox::new(x, y, x + 0.2, y + 0.2).unwrap()),
            None => record,
        }
    }
}

fn insert_strategy() -> impl Strategy<Value = Insert> {
    (
        0u8..32,
        0..3usize,
        0.0f32..=1.0,
        0u64..=NOW_MS,
        prop::option::of((0.0f32..0.8, 0.0f32..0.8)),
    )
        .prop_map(|(id, category, confidence, timestamp_ms, corner)| Insert {
            id,
            category,
            confidence,
            timestamp_ms,
            corner,
        })
}

fn policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![
        Just(EvictionPolicy::LowestConfidenceFirst),
        Just(EvictionPolicy::OldestFirst),
    ]
}

fn build_cache(
    capacity: usize,
    threshold: f32,
    max_age_ms: u64,
    dedup: bool,
    policy: EvictionPolicy,
) -> DetectionCache {
    let config = CacheConfiguration::new(capacity, threshold)
        .unwrap()
        .with_max_age_ms(max_age_ms)
        .with_dedup(dedup)
        .with_eviction(policy);
    DetectionCache::with_clock(config, Arc::new(ManualClock::new(NOW_MS)))
}

proptest! {
    /// Property: no sequence of upserts grows the cache beyond capacity.
    #[test]
    fn prop_size_never_exceeds_capacity(
        capacity in 1usize..8,
        threshold in 0.0f32..=1.0,
        max_age_ms in 0u64..=NOW_MS,
        dedup in any::<bool>(),
        policy in policy_strategy(),
        inserts in prop::collection::vec(insert_strategy(), 0..64),
    ) {
        let cache = build_cache(capacity, threshold, max_age_ms, dedup, policy);
        for insert in &inserts {
            cache.upsert(insert.to_record());
            prop_assert!(cache.len() <= capacity);
        }
    }

    /// Property: a record under the threshold never increases the size.
    #[test]
    fn prop_below_threshold_never_grows(
        threshold in 0.05f32..=1.0,
        inserts in prop::collection::vec(insert_strategy(), 0..32),
        candidate in insert_strategy(),
    ) {
        let cache = build_cache(16, threshold, NOW_MS, true, EvictionPolicy::default());
        for insert in &inserts {
            cache.upsert(insert.to_record());
        }
        let before = cache.snapshot();
        let mut low = candidate.clone();
        low.confidence = threshold * 0.5;
        cache.upsert(low.to_record());
        prop_assert_eq!(cache.len(), before.len());
        prop_assert_eq!(cache.snapshot(), before);
    }

    /// Property: query_recent honours both the limit and the age bound.
    #[test]
    fn prop_query_recent_respects_limit_and_age(
        inserts in prop::collection::vec(insert_strategy(), 0..48),
        max_age_ms in 0u64..=NOW_MS,
        limit in 0usize..12,
    ) {
        let cache = build_cache(64, 0.0, NOW_MS, false, EvictionPolicy::default());
        for insert in &inserts {
            cache.upsert(insert.to_record());
        }
        let recent = cache.query_recent(max_age_ms, limit);
        prop_assert!(recent.len() <= limit);
        for record in &recent {
            prop_assert!(NOW_MS - record.last_updated_ms() <= max_age_ms);
        }
        for pair in recent.windows(2) {
            prop_assert!(pair[0].last_updated_ms() >= pair[1].last_updated_ms());
        }
    }

    /// Property: evict_expired removes exactly the aged-out records.
    #[test]
    fn prop_evict_expired_is_exact(
        inserts in prop::collection::vec(insert_strategy(), 0..48),
        max_age_ms in 0u64..=NOW_MS,
    ) {
        let cache = build_cache(64, 0.0, NOW_MS, false, EvictionPolicy::default());
        for insert in &inserts {
            cache.upsert(insert.to_record());
        }
        let before = cache.snapshot();
        let expected_gone: HashSet<String> = before
            .iter()
            .filter(|r| NOW_MS - r.last_updated_ms() > max_age_ms)
            .map(|r| r.id().to_string())
            .collect();

        let removed = cache.evict_expired(max_age_ms);
        prop_assert_eq!(removed, expected_gone.len());

        let after: HashSet<String> = cache.snapshot().iter().map(|r| r.id().to_string()).collect();
        for record in &before {
            let gone = !after.contains(record.id());
            prop_assert_eq!(gone, expected_gone.contains(record.id()));
        }
    }
}
