use crate::detection::geometry::{BoundingBox, Position3D};
use crate::measurement::MeasurementSet;
use crate::prelude::{check_unit_interval, MeasureError, MeasureResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Object classes the detector reports.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Person,
    Phone,
    Bottle,
    Cup,
    Chair,
    Laptop,
    Book,
    Car,
    Unknown,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 9] = [
        ObjectCategory::Person,
        ObjectCategory::Phone,
        ObjectCategory::Bottle,
        ObjectCategory::Cup,
        ObjectCategory::Chair,
        ObjectCategory::Laptop,
        ObjectCategory::Book,
        ObjectCategory::Car,
        ObjectCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectCategory::Person => "person",
            ObjectCategory::Phone => "phone",
            ObjectCategory::Bottle => "bottle",
            ObjectCategory::Cup => "cup",
            ObjectCategory::Chair => "chair",
            ObjectCategory::Laptop => "laptop",
            ObjectCategory::Book => "book",
            ObjectCategory::Car => "car",
            ObjectCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ObjectCategory {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ObjectCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == needle)
            .ok_or_else(|| MeasureError::InvalidRecord(format!("unknown category '{s}'")))
    }
}

/// One detected object as held by the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObjectRecord {
    id: String,
    category: ObjectCategory,
    confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    measurements: Option<MeasurementSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position3D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundingBox>,
    created_at_ms: u64,
    last_updated_ms: u64,
}

impl DetectedObjectRecord {
    pub fn new(
        id: impl Into<String>,
        category: ObjectCategory,
        confidence: f32,
        timestamp_ms: u64,
    ) -> MeasureResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MeasureError::InvalidRecord("record id is empty".into()));
        }
        check_unit_interval(confidence, "confidence").map_err(MeasureError::InvalidRecord)?;
        Ok(Self {
            id,
            category,
            confidence,
            measurements: None,
            position: None,
            bounds: None,
            created_at_ms: timestamp_ms,
            last_updated_ms: timestamp_ms,
        })
    }

    pub fn with_measurements(mut self, measurements: MeasurementSet) -> Self {
        self.measurements = Some(measurements);
        self
    }

    pub fn with_position(mut self, position: Position3D) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> ObjectCategory {
        self.category
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn measurements(&self) -> Option<&MeasurementSet> {
        self.measurements.as_ref()
    }

    pub fn position(&self) -> Option<&Position3D> {
        self.position.as_ref()
    }

    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn last_updated_ms(&self) -> u64 {
        self.last_updated_ms
    }

    /// Milliseconds since the last update; future timestamps count as fresh.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_updated_ms)
    }

    /// Tracking update: take the incoming observation, keep identity and
    /// creation time, never move `last_updated_ms` backwards.
    pub fn apply_update(&mut self, incoming: DetectedObjectRecord) {
        self.category = incoming.category;
        self.confidence = incoming.confidence;
        self.measurements = incoming.measurements;
        self.position = incoming.position;
        self.bounds = incoming.bounds;
        self.last_updated_ms = self.last_updated_ms.max(incoming.last_updated_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_id_and_confidence() {
        assert!(DetectedObjectRecord::new("", ObjectCategory::Cup, 0.5, 0).is_err());
        assert!(DetectedObjectRecord::new("a", ObjectCategory::Cup, 1.2, 0).is_err());
        assert!(DetectedObjectRecord::new("a", ObjectCategory::Cup, f32::NAN, 0).is_err());
        let record = DetectedObjectRecord::new("a", ObjectCategory::Cup, 0.5, 42).unwrap();
        assert_eq!(record.created_at_ms(), 42);
        assert_eq!(record.last_updated_ms(), 42);
    }

    #[test]
    fn apply_update_keeps_creation_and_monotonic_timestamp() {
        let mut record = DetectedObjectRecord::new("a", ObjectCategory::Cup, 0.5, 100).unwrap();
        let stale = DetectedObjectRecord::new("a", ObjectCategory::Bottle, 0.7, 50).unwrap();
        record.apply_update(stale);
        assert_eq!(record.category(), ObjectCategory::Bottle);
        assert_eq!(record.confidence(), 0.7);
        assert_eq!(record.created_at_ms(), 100);
        assert_eq!(record.last_updated_ms(), 100);

        let fresh = DetectedObjectRecord::new("a", ObjectCategory::Bottle, 0.6, 180)
            .unwrap()
            .with_position(Position3D::new(0.0, 0.0, 1.0));
        record.apply_update(fresh);
        assert_eq!(record.created_at_ms(), 100);
        assert_eq!(record.last_updated_ms(), 180);
        assert!(record.position().is_some());
    }

    #[test]
    fn age_saturates_for_future_timestamps() {
        let record = DetectedObjectRecord::new("a", ObjectCategory::Cup, 0.5, 100).unwrap();
        assert_eq!(record.age_ms(40), 0);
        assert_eq!(record.age_ms(160), 60);
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Person".parse::<ObjectCategory>().unwrap(), ObjectCategory::Person);
        assert!("sofa".parse::<ObjectCategory>().is_err());
    }

    #[test]
    fn record_serializes_without_empty_optionals() {
        let record = DetectedObjectRecord::new("r1", ObjectCategory::Phone, 0.9, 5).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["category"], "phone");
        assert!(json.get("position").is_none());
    }
}
