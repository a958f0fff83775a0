use crate::detection::{DetectedObjectRecord, ObjectCategory};
use crate::math::StatsHelper;
use crate::telemetry::CacheCounters;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Point-in-time summary of a cache, for display and the query bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub total_records: usize,
    pub capacity: usize,
    pub by_category: BTreeMap<ObjectCategory, usize>,
    pub average_confidence: f32,
    pub min_confidence: Option<f32>,
    pub max_confidence: Option<f32>,
    pub oldest_age_ms: Option<u64>,
    pub newest_age_ms: Option<u64>,
    pub with_measurements: usize,
    pub counters: CacheCounters,
}

impl CacheStatistics {
    pub fn from_records<'a, I>(
        records: I,
        now_ms: u64,
        capacity: usize,
        counters: CacheCounters,
    ) -> Self
    where
        I: IntoIterator<Item = &'a DetectedObjectRecord>,
    {
        let mut by_category = BTreeMap::new();
        let mut confidences = Vec::new();
        let mut ages = Vec::new();
        let mut with_measurements = 0;

        for record in records {
            *by_category.entry(record.category()).or_insert(0) += 1;
            confidences.push(record.confidence());
            ages.push(record.age_ms(now_ms));
            if record.measurements().is_some_and(|set| !set.is_empty()) {
                with_measurements += 1;
            }
        }

        // Map order is arbitrary; sort so the mean is reproducible.
        confidences.sort_by(f32::total_cmp);
        let range = StatsHelper::min_max(&confidences);
        Self {
            total_records: confidences.len(),
            capacity,
            by_category,
            average_confidence: StatsHelper::mean(&confidences),
            min_confidence: range.map(|(lo, _)| lo),
            max_confidence: range.map(|(_, hi)| hi),
            oldest_age_ms: ages.iter().copied().max(),
            newest_age_ms: ages.iter().copied().min(),
            with_measurements,
            counters,
        }
    }

    /// Fill ratio in `[0, 1]`.
    pub fn utilization(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.total_records as f32 / self.capacity as f32
        }
    }
}

impl fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "records {}/{} ({:.0}% full), {} with measurements",
            self.total_records,
            self.capacity,
            self.utilization() * 100.0,
            self.with_measurements
        )?;
        match (self.min_confidence, self.max_confidence) {
            (Some(lo), Some(hi)) => writeln!(
                f,
                "confidence avg {:.3} min {:.3} max {:.3}",
                self.average_confidence, lo, hi
            )?,
            _ => writeln!(f, "confidence n/a")?,
        }
        if let (Some(newest), Some(oldest)) = (self.newest_age_ms, self.oldest_age_ms) {
            writeln!(f, "age newest {} ms oldest {} ms", newest, oldest)?;
        }
        for (category, count) in &self.by_category {
            writeln!(f, "  {:<8} {}", category, count)?;
        }
        let c = &self.counters;
        write!(
            f,
            "inserted {} updated {} merged {} rejected {} evicted {} expired {} compacted {} removed {}",
            c.inserted, c.updated, c.merged, c.rejected, c.evicted, c.expired, c.compacted, c.removed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{MeasurementSet, MeasurementUnit, MeasurementValue};

    fn sample() -> Vec<DetectedObjectRecord> {
        let height = MeasurementValue::new(1.75, MeasurementUnit::Meter, 0.8).unwrap();
        vec![
            DetectedObjectRecord::new("p1", ObjectCategory::Person, 0.9, 100)
                .unwrap()
                .with_measurements(MeasurementSet::new().with_height(height).unwrap()),
            DetectedObjectRecord::new("p2", ObjectCategory::Person, 0.5, 400).unwrap(),
            DetectedObjectRecord::new("c1", ObjectCategory::Cup, 0.7, 250).unwrap(),
        ]
    }

    #[test]
    fn statistics_summarize_records() {
        let records = sample();
        let stats = CacheStatistics::from_records(&records, 500, 10, CacheCounters::default());
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.by_category[&ObjectCategory::Person], 2);
        assert_eq!(stats.by_category[&ObjectCategory::Cup], 1);
        assert!((stats.average_confidence - 0.7).abs() < 1e-6);
        assert_eq!(stats.min_confidence, Some(0.5));
        assert_eq!(stats.max_confidence, Some(0.9));
        assert_eq!(stats.oldest_age_ms, Some(400));
        assert_eq!(stats.newest_age_ms, Some(100));
        assert_eq!(stats.with_measurements, 1);
        assert!((stats.utilization() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn empty_statistics_report_na() {
        let stats = CacheStatistics::from_records(
            std::iter::empty(),
            0,
            4,
            CacheCounters::default(),
        );
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.min_confidence, None);
        assert!(stats.to_string().contains("confidence n/a"));
    }

    #[test]
    fn statistics_serialize_categories_by_name() {
        let records = sample();
        let stats = CacheStatistics::from_records(&records, 500, 10, CacheCounters::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_category"]["person"], 2);
        assert_eq!(json["counters"]["inserted"], 0);
    }
}
