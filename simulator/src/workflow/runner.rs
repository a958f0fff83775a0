use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use measurecore::cache::CacheStatistics;
use measurecore::clock::{Clock, ManualClock, SystemClock};
use measurecore::prelude::DetectionSource;
use measurecore::{DetectedObjectRecord, DetectionCache, UpsertOutcome};
use serde::Serialize;
use std::sync::Arc;

/// How upserts in a run were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub inserted: usize,
    pub updated: usize,
    pub merged: usize,
    pub rejected: usize,
    pub evictions: usize,
    pub swept: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted { evicted, expired } => {
                self.inserted += 1;
                self.swept += expired;
                if evicted.is_some() {
                    self.evictions += 1;
                }
            }
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Merged { .. } => self.merged += 1,
            UpsertOutcome::Rejected => self.rejected += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeTally) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.merged += other.merged;
        self.rejected += other.rejected;
        self.evictions += other.evictions;
        self.swept += other.swept;
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.merged + self.rejected
    }
}

pub struct WorkflowResult {
    pub frames: usize,
    pub tally: OutcomeTally,
    pub expired: usize,
    pub compacted: usize,
    pub statistics: CacheStatistics,
    pub recent: Vec<DetectedObjectRecord>,
}

/// Time base for a run: offline runs step a manual clock per frame.
#[derive(Clone)]
enum Pacing {
    Stepped(Arc<ManualClock>),
    Live,
}

/// Owns the cache for a capture session and drives sources into it.
#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    cache: Arc<DetectionCache>,
    pacing: Pacing,
}

impl Runner {
    /// Deterministic run: the clock advances `frame_interval_ms` per frame.
    pub fn offline(config: WorkflowConfig) -> anyhow::Result<Self> {
        let clock = Arc::new(ManualClock::new(0));
        let cache_config = config.cache.to_cache_config()?;
        let cache = DetectionCache::with_clock(cache_config, clock.clone());
        Ok(Self {
            config,
            cache: Arc::new(cache),
            pacing: Pacing::Stepped(clock),
        })
    }

    /// Wall-clock run for the serve loop.
    pub fn live(config: WorkflowConfig) -> anyhow::Result<Self> {
        let cache_config = config.cache.to_cache_config()?;
        let cache = DetectionCache::with_clock(cache_config, Arc::new(SystemClock));
        Ok(Self {
            config,
            cache: Arc::new(cache),
            pacing: Pacing::Live,
        })
    }

    pub fn cache(&self) -> Arc<DetectionCache> {
        self.cache.clone()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn tick(&self) -> u64 {
        match &self.pacing {
            Pacing::Stepped(clock) => clock.advance(self.config.frame_interval_ms),
            Pacing::Live => SystemClock.now_ms(),
        }
    }

    /// Pulls one batch from `source` into the cache and sweeps stale records.
    pub fn run_frame(&self, source: &mut dyn DetectionSource) -> anyhow::Result<OutcomeTally> {
        let now = self.tick();
        let batch = source
            .next_batch(now)
            .with_context(|| format!("reading batch from {} source", source.name()))?;
        let mut tally = OutcomeTally::default();
        for record in batch {
            tally.record(&self.cache.upsert(record));
        }
        Ok(tally)
    }

    pub fn execute(&self, source: &mut dyn DetectionSource) -> anyhow::Result<WorkflowResult> {
        let mut tally = OutcomeTally::default();
        let mut expired = 0;
        for frame in 0..self.config.frames {
            let frame_tally = self
                .run_frame(source)
                .with_context(|| format!("running frame {}", frame))?;
            tally.merge(&frame_tally);
            expired += self.cache.evict_stale();
        }

        let compacted = self
            .config
            .compact_target
            .map(|target| self.cache.compact(target))
            .unwrap_or(0);

        info!(
            "workflow finished: {} frames, {} detections, {} cached",
            self.config.frames,
            tally.total(),
            self.cache.len()
        );

        Ok(WorkflowResult {
            frames: self.config.frames,
            tally,
            expired,
            compacted,
            statistics: self.cache.statistics(),
            recent: self
                .cache
                .query_recent(self.config.recent_window_ms, self.config.recent_limit),
        })
    }
}
