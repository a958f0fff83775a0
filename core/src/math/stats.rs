pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f32>() / samples.len() as f32
    }

    /// `(min, max)`, or `None` for an empty slice.
    pub fn min_max(samples: &[f32]) -> Option<(f32, f32)> {
        let (first, rest) = samples.split_first()?;
        Some(
            rest.iter()
                .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }
}
