//! Detection cache and measurement value core for the AR measurement platform.
//!
//! Detected objects flow from a [`DetectionSource`] into a bounded
//! [`cache::DetectionCache`]; each record may carry unit-checked
//! [`measurement::MeasurementValue`]s for height, weight, distance and angle.

pub mod cache;
pub mod clock;
pub mod detection;
pub mod math;
pub mod measurement;
pub mod prelude;
pub mod telemetry;

pub use cache::{CacheConfiguration, DetectionCache, EvictionPolicy, UpsertOutcome};
pub use detection::{BoundingBox, DetectedObjectRecord, ObjectCategory, Position3D};
pub use measurement::{MeasurementSet, MeasurementUnit, MeasurementValue, UnitCategory};
pub use prelude::{DetectionSource, MeasureError, MeasureResult};
