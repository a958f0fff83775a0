use crate::cache::config::{CacheConfiguration, EvictionPolicy};
use crate::cache::stats::CacheStatistics;
use crate::clock::{Clock, SystemClock};
use crate::detection::{DetectedObjectRecord, ObjectCategory};
use crate::telemetry::{CacheEvent, LogManager, MetricsRecorder};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type RecordMap = HashMap<String, DetectedObjectRecord>;

/// What `upsert` did with a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// Stored as a new record. A full cache first sweeps `expired` aged-out
    /// records, then evicts one more by policy if it is still full.
    Inserted {
        evicted: Option<String>,
        expired: usize,
    },
    /// Replaced the record with the same id.
    Updated,
    /// Folded into an overlapping record of the same category.
    Merged { into: String },
    /// Below the confidence threshold; dropped.
    Rejected,
}

impl UpsertOutcome {
    pub fn is_stored(&self) -> bool {
        !matches!(self, UpsertOutcome::Rejected)
    }
}

/// Bounded, deduplicating store of recent detections.
///
/// One writer (the capture loop) and any number of readers may share an
/// instance through `Arc`. Mutations run under the write lock for their whole
/// duration; reads return owned snapshots.
///
/// Ages are measured against the cache's clock, so records must be stamped
/// from the same time base.
pub struct DetectionCache {
    config: CacheConfiguration,
    records: RwLock<RecordMap>,
    clock: Arc<dyn Clock>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl DetectionCache {
    pub fn new(config: CacheConfiguration) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfiguration, clock: Arc<dyn Clock>) -> Self {
        let capacity = config.max_records();
        Self {
            config,
            records: RwLock::new(HashMap::with_capacity(capacity)),
            clock,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("measurecore::cache"),
        }
    }

    pub fn config(&self) -> &CacheConfiguration {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // Mutations never leave the map half-updated, so a poisoned lock still
    // guards a consistent map.
    fn read_records(&self) -> RwLockReadGuard<'_, RecordMap> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, RecordMap> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn upsert(&self, record: DetectedObjectRecord) -> UpsertOutcome {
        if record.confidence() < self.config.confidence_threshold() {
            self.metrics.record(CacheEvent::Rejected);
            self.logger.detail(&format!(
                "rejected {} ({:.3} < {:.3})",
                record.id(),
                record.confidence(),
                self.config.confidence_threshold()
            ));
            return UpsertOutcome::Rejected;
        }

        let now = self.clock.now_ms();
        let mut records = self.write_records();

        if let Some(existing) = records.get_mut(record.id()) {
            existing.apply_update(record);
            self.metrics.record(CacheEvent::Updated);
            return UpsertOutcome::Updated;
        }

        if self.config.dedup() {
            if let Some(target) =
                find_duplicate(&records, &record, self.config.dedup_iou_threshold())
            {
                if let Some(existing) = records.get_mut(&target) {
                    self.logger
                        .detail(&format!("merged {} into {}", record.id(), target));
                    existing.apply_update(record);
                }
                self.metrics.record(CacheEvent::Merged);
                return UpsertOutcome::Merged { into: target };
            }
        }

        let mut evicted = None;
        let mut expired = 0;
        if records.len() >= self.config.max_records() {
            expired = retain_fresh(&mut records, now, self.config.max_age_ms());
            if expired > 0 {
                self.metrics.record_many(CacheEvent::Expired, expired as u64);
                self.logger.record(&format!(
                    "swept {} records older than {} ms to make room for {}",
                    expired,
                    self.config.max_age_ms(),
                    record.id()
                ));
            }

            if records.len() >= self.config.max_records() {
                if let Some(victim) = select_victim(&records, self.config.eviction()) {
                    records.remove(&victim);
                    self.metrics.record(CacheEvent::Evicted);
                    self.logger.detail(&format!(
                        "evicted {} to make room for {}",
                        victim,
                        record.id()
                    ));
                    evicted = Some(victim);
                }
            }
        }

        records.insert(record.id().to_string(), record);
        self.metrics.record(CacheEvent::Inserted);
        UpsertOutcome::Inserted { evicted, expired }
    }

    pub fn get(&self, id: &str) -> Option<DetectedObjectRecord> {
        self.read_records().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<DetectedObjectRecord> {
        let removed = self.write_records().remove(id);
        if removed.is_some() {
            self.metrics.record(CacheEvent::Removed);
        }
        removed
    }

    /// Up to `limit` records updated within `max_age_ms`, most recent first.
    pub fn query_recent(&self, max_age_ms: u64, limit: usize) -> Vec<DetectedObjectRecord> {
        let now = self.clock.now_ms();
        let mut recent: Vec<_> = self
            .read_records()
            .values()
            .filter(|record| record.age_ms(now) <= max_age_ms)
            .cloned()
            .collect();
        sort_most_recent_first(&mut recent);
        recent.truncate(limit);
        recent
    }

    pub fn query_by_category(&self, category: ObjectCategory) -> Vec<DetectedObjectRecord> {
        self.query_where(|record| record.category() == category)
    }

    pub fn query_by_confidence(&self, min_confidence: f32) -> Vec<DetectedObjectRecord> {
        self.query_where(|record| record.confidence() >= min_confidence)
    }

    fn query_where<F>(&self, predicate: F) -> Vec<DetectedObjectRecord>
    where
        F: Fn(&DetectedObjectRecord) -> bool,
    {
        let mut matches: Vec<_> = self
            .read_records()
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect();
        sort_most_recent_first(&mut matches);
        matches
    }

    /// Removes every record older than `max_age_ms`; returns how many.
    pub fn evict_expired(&self, max_age_ms: u64) -> usize {
        let now = self.clock.now_ms();
        let removed = retain_fresh(&mut self.write_records(), now, max_age_ms);
        if removed > 0 {
            self.metrics.record_many(CacheEvent::Expired, removed as u64);
            self.logger.record(&format!(
                "expired {} records older than {} ms",
                removed, max_age_ms
            ));
        }
        removed
    }

    /// `evict_expired` with the configured maximum age.
    pub fn evict_stale(&self) -> usize {
        self.evict_expired(self.config.max_age_ms())
    }

    /// Shrinks to `target_size`, keeping the most confident, then most
    /// recent, records. Returns how many were dropped.
    pub fn compact(&self, target_size: usize) -> usize {
        let mut records = self.write_records();
        if records.len() <= target_size {
            return 0;
        }

        let mut ranked: Vec<&DetectedObjectRecord> = records.values().collect();
        ranked.sort_by(|a, b| {
            b.confidence()
                .total_cmp(&a.confidence())
                .then_with(|| b.last_updated_ms().cmp(&a.last_updated_ms()))
                .then_with(|| a.id().cmp(b.id()))
        });
        let keep: HashSet<String> = ranked
            .into_iter()
            .take(target_size)
            .map(|record| record.id().to_string())
            .collect();

        let before = records.len();
        records.retain(|id, _| keep.contains(id));
        let removed = before - records.len();

        self.metrics.record_many(CacheEvent::Compacted, removed as u64);
        self.logger.record(&format!(
            "compacted {} -> {} records",
            before,
            records.len()
        ));
        removed
    }

    pub fn clear(&self) {
        let mut records = self.write_records();
        let removed = records.len();
        records.clear();
        self.metrics.record_many(CacheEvent::Removed, removed as u64);
    }

    pub fn len(&self) -> usize {
        self.read_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_records().is_empty()
    }

    /// Every record, most recent first.
    pub fn snapshot(&self) -> Vec<DetectedObjectRecord> {
        self.query_where(|_| true)
    }

    pub fn statistics(&self) -> CacheStatistics {
        let now = self.clock.now_ms();
        let records = self.read_records();
        CacheStatistics::from_records(
            records.values(),
            now,
            self.config.max_records(),
            self.metrics.snapshot(),
        )
    }
}

fn sort_most_recent_first(records: &mut [DetectedObjectRecord]) {
    records.sort_by(|a, b| {
        b.last_updated_ms()
            .cmp(&a.last_updated_ms())
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Drops records with `age > max_age_ms`; returns how many went.
fn retain_fresh(records: &mut RecordMap, now_ms: u64, max_age_ms: u64) -> usize {
    let before = records.len();
    records.retain(|_, record| record.age_ms(now_ms) <= max_age_ms);
    before - records.len()
}

fn eviction_rank(
    policy: EvictionPolicy,
    a: &DetectedObjectRecord,
    b: &DetectedObjectRecord,
) -> Ordering {
    let by_confidence = a.confidence().total_cmp(&b.confidence());
    let by_age = a.last_updated_ms().cmp(&b.last_updated_ms());
    let primary = match policy {
        EvictionPolicy::LowestConfidenceFirst => by_confidence.then(by_age),
        EvictionPolicy::OldestFirst => by_age.then(by_confidence),
    };
    primary.then_with(|| a.id().cmp(b.id()))
}

fn select_victim(records: &RecordMap, policy: EvictionPolicy) -> Option<String> {
    records
        .values()
        .min_by(|a, b| eviction_rank(policy, a, b))
        .map(|record| record.id().to_string())
}

/// Best-overlapping record of the same category, if any clears `min_iou`.
fn find_duplicate(
    records: &RecordMap,
    incoming: &DetectedObjectRecord,
    min_iou: f32,
) -> Option<String> {
    let bounds = incoming.bounds()?;
    records
        .values()
        .filter(|candidate| candidate.category() == incoming.category())
        .filter_map(|candidate| {
            candidate
                .bounds()
                .map(|other| (candidate, other.intersection_over_union(bounds)))
        })
        .filter(|(_, iou)| *iou > 0.0 && *iou >= min_iou)
        .max_by(|(a, x), (b, y)| x.total_cmp(y).then_with(|| b.id().cmp(a.id())))
        .map(|(candidate, _)| candidate.id().to_string())
}
