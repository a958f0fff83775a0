use crate::generator::GeneratorConfig;
use anyhow::Context;
use measurecore::cache::config::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DEDUP_IOU, DEFAULT_MAX_AGE_MS, DEFAULT_MAX_RECORDS,
};
use measurecore::{CacheConfiguration, EvictionPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Raw cache settings as written in the workflow file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_records: usize,
    pub confidence_threshold: f32,
    pub max_age_ms: u64,
    pub dedup: bool,
    pub dedup_iou_threshold: f32,
    pub eviction: EvictionPolicy,
}

impl Default for CacheSettings {
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

impl CacheSettings {
    pub fn to_cache_config(&self) -> anyhow::Result<CacheConfiguration> {
        let config = CacheConfiguration::new(self.max_records, self.confidence_threshold)
            .context("validating cache settings")?
            .with_max_age_ms(self.max_age_ms)
            .with_dedup(self.dedup)
            .with_eviction(self.eviction)
            .with_dedup_iou_threshold(self.dedup_iou_threshold)
            .context("validating dedup settings")?;
        Ok(config)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub cache: CacheSettings,
    pub generator: GeneratorConfig,
    pub frames: usize,
    pub frame_interval_ms: u64,
    pub compact_target: Option<usize>,
    pub recent_window_ms: u64,
    pub recent_limit: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            generator: GeneratorConfig::default(),
            frames: 60,
            frame_interval_ms: 33,
            compact_target: None,
            recent_window_ms: 1_000,
            recent_limit: 10,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        max_records: usize,
        confidence_threshold: f32,
        max_age_ms: u64,
        frames: usize,
        seed: u64,
    ) -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheSettings {
                max_records,
                confidence_threshold,
                max_age_ms,
                ..defaults.cache
            },
            generator: GeneratorConfig {
                seed,
                ..defaults.generator
            },
            frames,
            ..defaults
        }
    }
}
