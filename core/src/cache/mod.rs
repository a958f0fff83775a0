pub mod config;
pub mod stats;
pub mod store;

#[cfg(test)]
mod proptest_cache;

pub use config::{CacheConfiguration, EvictionPolicy};
pub use stats::CacheStatistics;
pub use store::{DetectionCache, UpsertOutcome};
