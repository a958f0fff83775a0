use anyhow::ensure;
use measurecore::prelude::{DetectionSource, MeasureResult};
use measurecore::{
    BoundingBox, DetectedObjectRecord, MeasurementSet, MeasurementUnit, MeasurementValue,
    ObjectCategory, Position3D,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for the synthetic detection stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub batch_size: usize,
    pub max_tracked: usize,
    pub spawn_probability: f64,
    pub min_confidence: f32,
    pub max_confidence: f32,
    pub categories: Vec<ObjectCategory>,
    pub with_measurements: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            batch_size: 4,
            max_tracked: 24,
            spawn_probability: 0.3,
            min_confidence: 0.3,
            max_confidence: 0.99,
            categories: Vec::new(),
            with_measurements: true,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.max_tracked > 0, "max_tracked must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.spawn_probability),
            "spawn_probability {} must be within [0, 1]",
            self.spawn_probability
        );
        ensure!(
            0.0 <= self.min_confidence
                && self.min_confidence <= self.max_confidence
                && self.max_confidence <= 1.0,
            "confidence range [{}, {}] must lie within [0, 1]",
            self.min_confidence,
            self.max_confidence
        );
        Ok(())
    }

    fn category_pool(&self) -> &[ObjectCategory] {
        if self.categories.is_empty() {
            &ObjectCategory::ALL
        } else {
            &self.categories
        }
    }
}

/// Rough real-world `(height m, weight kg)` used to seed mock measurements.
fn typical_size(category: ObjectCategory) -> (f64, f64) {
    match category {
        ObjectCategory::Person => (1.70, 70.0),
        ObjectCategory::Phone => (0.15, 0.19),
        ObjectCategory::Bottle => (0.25, 0.55),
        ObjectCategory::Cup => (0.10, 0.30),
        ObjectCategory::Chair => (0.90, 7.0),
        ObjectCategory::Laptop => (0.02, 1.8),
        ObjectCategory::Book => (0.24, 0.6),
        ObjectCategory::Car => (1.50, 1400.0),
        ObjectCategory::Unknown => (0.50, 2.0),
    }
}

#[derive(Debug, Clone)]
struct TrackedObject {
    id: String,
    category: ObjectCategory,
    center: (f32, f32),
    extent: (f32, f32),
    position: Position3D,
    height_m: f64,
    weight_kg: f64,
}

/// Deterministic stand-in for the camera detector: same seed, same stream.
///
/// Keeps a pool of tracked objects; each batch re-observes some of them
/// (same id, drifted box and anchor) and spawns new ones.
pub struct SeededDetectionSource {
    config: GeneratorConfig,
    rng: StdRng,
    tracked: Vec<TrackedObject>,
    next_id: u64,
}

impl SeededDetectionSource {
    pub fn new(config: GeneratorConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            tracked: Vec::new(),
            next_id: 0,
        })
    }

    #[cfg(test)]
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    fn spawn(&mut self) -> usize {
        let category = *self
            .config
            .category_pool()
            .choose(&mut self.rng)
            .unwrap_or(&ObjectCategory::Unknown);
        let (height, weight) = typical_size(category);
        let scale = self.rng.gen_range(0.8..1.2);
        let object = TrackedObject {
            id: format!("{}-{}", category, self.next_id),
            category,
            center: (self.rng.gen_range(0.1..0.9), self.rng.gen_range(0.1..0.9)),
            extent: (self.rng.gen_range(0.05..0.3), self.rng.gen_range(0.05..0.4)),
            position: Position3D::new(
                self.rng.gen_range(-1.5..1.5),
                self.rng.gen_range(-0.5..0.5),
                self.rng.gen_range(0.3..6.0),
            ),
            height_m: height * scale,
            weight_kg: weight * scale,
        };
        self.next_id += 1;

        if self.tracked.len() >= self.config.max_tracked {
            self.tracked.remove(0);
        }
        self.tracked.push(object);
        self.tracked.len() - 1
    }

    fn drift(&mut self, index: usize) {
        let (dx, dy, dz) = (
            self.rng.gen_range(-0.02..0.02),
            self.rng.gen_range(-0.02..0.02),
            self.rng.gen_range(-0.05..0.05),
        );
        let object = &mut self.tracked[index];
        object.center.0 = (object.center.0 + dx).clamp(0.05, 0.95);
        object.center.1 = (object.center.1 + dy).clamp(0.05, 0.95);
        object.position.x += dx;
        object.position.y += dy;
        object.position.z = (object.position.z + dz).max(0.1);
    }

    fn observe(&mut self, index: usize, now_ms: u64) -> MeasureResult<DetectedObjectRecord> {
        let confidence = self
            .rng
            .gen_range(self.config.min_confidence..=self.config.max_confidence);
        let object = &self.tracked[index];
        let (cx, cy) = object.center;
        let (w, h) = object.extent;
        let bounds = BoundingBox::new(
            (cx - w / 2.0).clamp(0.0, 1.0),
            (cy - h / 2.0).clamp(0.0, 1.0),
            (cx + w / 2.0).clamp(0.0, 1.0),
            (cy + h / 2.0).clamp(0.0, 1.0),
        )?;

        let mut record =
            DetectedObjectRecord::new(object.id.clone(), object.category, confidence, now_ms)?
                .with_position(object.position)
                .with_bounds(bounds);

        if self.config.with_measurements {
            let position = object.position;
            let bearing_deg = f64::from(position.x).atan2(f64::from(position.z)).to_degrees();
            let measurements = MeasurementSet::new()
                .with_height(MeasurementValue::new(
                    object.height_m,
                    MeasurementUnit::Meter,
                    confidence,
                )?)?
                .with_weight(MeasurementValue::new(
                    object.weight_kg,
                    MeasurementUnit::Kilogram,
                    confidence * 0.6,
                )?)?
                .with_distance(MeasurementValue::new(
                    f64::from(position.distance_from_origin()),
                    MeasurementUnit::Meter,
                    confidence,
                )?)?
                .with_angle(MeasurementValue::new(
                    bearing_deg,
                    MeasurementUnit::Degree,
                    confidence,
                )?)?;
            record = record.with_measurements(measurements);
        }
        Ok(record)
    }
}

impl DetectionSource for SeededDetectionSource {
    fn name(&self) -> &'static str {
        "seeded"
    }

    fn next_batch(&mut self, now_ms: u64) -> MeasureResult<Vec<DetectedObjectRecord>> {
        let mut batch = Vec::with_capacity(self.config.batch_size);
        for _ in 0..self.config.batch_size {
            let index = if self.tracked.is_empty()
                || self.rng.gen_bool(self.config.spawn_probability)
            {
                self.spawn()
            } else {
                let index = self.rng.gen_range(0..self.tracked.len());
                self.drift(index);
                index
            };
            batch.push(self.observe(index, now_ms)?);
        }
        Ok(batch)
    }
}
