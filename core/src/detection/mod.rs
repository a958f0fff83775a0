pub mod geometry;
pub mod record;

pub use geometry::{BoundingBox, Position3D};
pub use record::{DetectedObjectRecord, ObjectCategory};
