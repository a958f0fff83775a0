pub mod seeded;

pub use seeded::{GeneratorConfig, SeededDetectionSource};
