use measurecore::cache::CacheStatistics;
use measurecore::prelude::MeasureResult;
use measurecore::{
    BoundingBox, DetectedObjectRecord, MeasurementSet, MeasurementUnit, MeasurementValue,
    ObjectCategory, Position3D,
};
use serde::{Deserialize, Serialize};

/// What display clients poll: cache summary plus the freshest records.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayModel {
    pub statistics: CacheStatistics,
    pub recent: Vec<DetectedObjectRecord>,
}

/// Detection pushed over HTTP; validated into a record on ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    pub id: String,
    pub category: ObjectCategory,
    pub confidence: f32,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    #[serde(default)]
    pub position: Option<Position3D>,
    /// `[left, top, right, bottom]`, normalized.
    #[serde(default)]
    pub bounds: Option<[f32; 4]>,
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

impl RecordRequest {
    /// Client timestamps ahead of `now_ms` are clamped to it.
    pub fn into_record(self, now_ms: u64) -> MeasureResult<DetectedObjectRecord> {
        let timestamp = self.timestamp_ms.map_or(now_ms, |ts| ts.min(now_ms));
        let mut record =
            DetectedObjectRecord::new(self.id, self.category, self.confidence, timestamp)?;
        if let Some(position) = self.position {
            record = record.with_position(position);
        }
        if let Some([left, top, right, bottom]) = self.bounds {
            record = record.with_bounds(BoundingBox::new(left, top, right, bottom)?);
        }

        let mut measurements = MeasurementSet::new();
        if let Some(height) = self.height_m {
            measurements = measurements.with_height(MeasurementValue::new(
                height,
                MeasurementUnit::Meter,
                self.confidence,
            )?)?;
        }
        if let Some(weight) = self.weight_kg {
            measurements = measurements.with_weight(MeasurementValue::new(
                weight,
                MeasurementUnit::Kilogram,
                self.confidence,
            )?)?;
        }
        if let Some(position) = self.position {
            measurements = measurements.with_distance(MeasurementValue::new(
                f64::from(position.distance_from_origin()),
                MeasurementUnit::Meter,
                self.confidence,
            )?)?;
        }
        if !measurements.is_empty() {
            record = record.with_measurements(measurements);
        }
        Ok(record)
    }
}
