use crate::measurement::unit::UnitCategory;
use crate::measurement::value::MeasurementValue;
use crate::prelude::{MeasureError, MeasureResult};
use serde::Serialize;

/// Measurements attached to a detected object.
///
/// Each slot only accepts values of the matching unit category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementSet {
    height: Option<MeasurementValue>,
    width: Option<MeasurementValue>,
    weight: Option<MeasurementValue>,
    distance: Option<MeasurementValue>,
    angle: Option<MeasurementValue>,
}

fn expect_category(
    slot: &str,
    value: MeasurementValue,
    expected: UnitCategory,
) -> MeasureResult<Option<MeasurementValue>> {
    if value.category() == expected {
        Ok(Some(value))
    } else {
        Err(MeasureError::InvalidRecord(format!(
            "{slot} must be a {expected} measurement, got {}",
            value.category()
        )))
    }
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_height(mut self, value: MeasurementValue) -> MeasureResult<Self> {
        self.height = expect_category("height", value, UnitCategory::Length)?;
        Ok(self)
    }

    pub fn with_width(mut self, value: MeasurementValue) -> MeasureResult<Self> {
        self.width = expect_category("width", value, UnitCategory::Length)?;
        Ok(self)
    }

    pub fn with_weight(mut self, value: MeasurementValue) -> MeasureResult<Self> {
        self.weight = expect_category("weight", value, UnitCategory::Weight)?;
        Ok(self)
    }

    pub fn with_distance(mut self, value: MeasurementValue) -> MeasureResult<Self> {
        self.distance = expect_category("distance", value, UnitCategory::Length)?;
        Ok(self)
    }

    pub fn with_angle(mut self, value: MeasurementValue) -> MeasureResult<Self> {
        self.angle = expect_category("angle", value, UnitCategory::Angle)?;
        Ok(self)
    }

    pub fn height(&self) -> Option<&MeasurementValue> {
        self.height.as_ref()
    }

    pub fn width(&self) -> Option<&MeasurementValue> {
        self.width.as_ref()
    }

    pub fn weight(&self) -> Option<&MeasurementValue> {
        self.weight.as_ref()
    }

    pub fn distance(&self) -> Option<&MeasurementValue> {
        self.distance.as_ref()
    }

    pub fn angle(&self) -> Option<&MeasurementValue> {
        self.angle.as_ref()
    }

    fn values(&self) -> impl Iterator<Item = &MeasurementValue> {
        [
            &self.height,
            &self.width,
            &self.weight,
            &self.distance,
            &self.angle,
        ]
        .into_iter()
        .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.values().next().is_none()
    }

    /// Weakest confidence among the present values.
    pub fn overall_confidence(&self) -> Option<f32> {
        self.values().map(MeasurementValue::confidence).reduce(f32::min)
    }
}
