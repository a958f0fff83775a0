use crate::prelude::{check_unit_interval, MeasureError, MeasureResult};
use serde::{Deserialize, Serialize};

/// Which record leaves first when an insert finds the cache full.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest update, then lowest confidence, then id.
    #[default]
    OldestFirst,
    /// Lowest confidence, then oldest update, then id.
    LowestConfidenceFirst,
}

/// Validated cache settings. Construction fails fast on bad values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheConfiguration {
    max_records: usize,
    confidence_threshold: f32,
    max_age_ms: u64,
    dedup: bool,
    dedup_iou_threshold: f32,
    eviction: EvictionPolicy,
}

pub const DEFAULT_MAX_RECORDS: usize = 100;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MAX_AGE_MS: u64 = 30_000;
pub const DEFAULT_DEDUP_IOU: f32 = 0.5;

impl CacheConfiguration {
    pub fn new(max_records: usize, confidence_threshold: f32) -> MeasureResult<Self> {
        if max_records == 0 {
            return Err(MeasureError::InvalidConfiguration(
                "max_records must be greater than zero".into(),
            ));
        }
        check_unit_interval(confidence_threshold, "confidence_threshold")
            .map_err(MeasureError::InvalidConfiguration)?;
        Ok(Self {
            max_records,
            confidence_threshold,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            dedup: true,
            dedup_iou_threshold: DEFAULT_DEDUP_IOU,
            eviction: EvictionPolicy::default(),
        })
    }

    pub fn with_max_age_ms(mut self, max_age_ms: u64) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_dedup_iou_threshold(mut self, threshold: f32) -> MeasureResult<Self> {
        check_unit_interval(threshold, "dedup_iou_threshold")
            .map_err(MeasureError::InvalidConfiguration)?;
        self.dedup_iou_threshold = threshold;
        Ok(self)
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn max_age_ms(&self) -> u64 {
        self.max_age_ms
    }

    pub fn dedup(&self) -> bool {
        self.dedup
    }

    pub fn dedup_iou_threshold(&self) -> f32 {
        self.dedup_iou_threshold
    }

    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }
}

impl Default for CacheConfiguration {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            dedup: true,
            dedup_iou_threshold: DEFAULT_DEDUP_IOU,
            eviction: EvictionPolicy::default(),
        }
    }
}
