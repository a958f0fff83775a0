use crate::detection::DetectedObjectRecord;
use crate::measurement::MeasurementUnit;

/// Common error type for record, measurement and cache construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("cannot convert {from} to {to}: unit categories differ")]
    IncompatibleUnits {
        from: MeasurementUnit,
        to: MeasurementUnit,
    },
    #[error("amount {amount} is outside the valid range for {unit}")]
    OutOfRange { amount: f64, unit: MeasurementUnit },
    #[error("invalid arithmetic: {0}")]
    InvalidArithmetic(String),
}

pub type MeasureResult<T> = Result<T, MeasureError>;

/// Producer of detected objects feeding the cache.
///
/// A sensor-backed implementation lives with the capture pipeline; tests and
/// the simulator use a seeded double so runs are reproducible.
pub trait DetectionSource: Send {
    fn name(&self) -> &'static str;
    fn next_batch(&mut self, now_ms: u64) -> MeasureResult<Vec<DetectedObjectRecord>>;
}

/// Rejects NaN and anything outside `[0, 1]`.
pub(crate) fn check_unit_interval(value: f32, what: &str) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{what} {value} must be within [0, 1]"))
    }
}
