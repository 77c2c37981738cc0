use log::{debug, info};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::MachineError;
use crate::features::{FeatureVector, FieldRange, TrainingSample};

/// Shape and learning parameters of a self-organizing map.
#[derive(Debug, Clone, PartialEq)]
pub struct SomConfig {
    /// Grid width in units.
    pub width: usize,
    /// Grid height in units.
    pub height: usize,
    /// Passes over the training set. Total iterations = epochs * samples.
    pub epochs: usize,
    /// Learning rate at the first iteration; decays exponentially.
    pub learning_rate: f64,
}

impl Default for SomConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            epochs: 10,
            learning_rate: 0.1,
        }
    }
}

impl SomConfig {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn validate(&self) -> Result<(), MachineError> {
        if self.width == 0 || self.height == 0 {
            return Err(MachineError::InvalidConfig(format!(
                "grid must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.epochs == 0 {
            return Err(MachineError::InvalidConfig("epochs must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(MachineError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Neighborhood radius and learning rate as functions of the iteration.
///
/// Both start at their configured maximum and decay exponentially, so early
/// updates are broad and strong while late updates only touch the BMU.
#[derive(Debug, Clone, Copy)]
pub struct DecaySchedule {
    iterations: usize,
    map_radius: f64,
    time_constant: f64,
    learning_rate: f64,
}

impl DecaySchedule {
    pub fn new(config: &SomConfig, iterations: usize) -> Self {
        let iterations = iterations.max(1);
        let map_radius = config.width.max(config.height) as f64 / 2.0;
        // ln(r) <= 0 for maps of side 1 or 2; fall back to a linear time scale.
        let time_constant = if map_radius > 1.0 {
            iterations as f64 / map_radius.ln()
        } else {
            iterations as f64
        };
        Self {
            iterations,
            map_radius,
            time_constant,
            learning_rate: config.learning_rate,
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn radius(&self, iteration: usize) -> f64 {
        self.map_radius * (-(iteration as f64) / self.time_constant).exp()
    }

    pub fn learning_rate(&self, iteration: usize) -> f64 {
        self.learning_rate * (-(iteration as f64) / self.iterations as f64).exp()
    }
}

/// Distance in steps between two cells of a hexagonal grid.
///
/// Cells use "odd-r" offset coordinates: odd rows are shifted half a cell to
/// the right. The grid does not wrap.
pub fn hex_distance(a: (usize, usize), b: (usize, usize)) -> usize {
    let to_axial = |(x, y): (usize, usize)| {
        let (x, y) = (x as i64, y as i64);
        (x - (y - (y & 1)) / 2, y)
    };
    let (q1, r1) = to_axial(a);
    let (q2, r2) = to_axial(b);
    let dq = q1 - q2;
    let dr = r1 - r2;
    ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as usize
}

/// A hexagonal, non-toroidal self-organizing map.
///
/// Prototypes live in the scaled feature space: every component is the raw
/// slot value mapped through its [`FieldRange`] into [0, 1].
#[derive(Debug, Clone)]
pub struct Som {
    config: SomConfig,
    fields: Vec<FieldRange>,
    /// Flattened `unit_count * dimension` prototype components, row-major by cell.
    prototypes: Vec<f64>,
}

impl Som {
    /// Allocate a grid with uniformly random prototypes.
    pub fn new<R: Rng + ?Sized>(
        config: SomConfig,
        fields: Vec<FieldRange>,
        rng: &mut R,
    ) -> Result<Self, MachineError> {
        config.validate()?;
        if fields.is_empty() {
            return Err(MachineError::InvalidConfig(
                "at least one feature field is required".into(),
            ));
        }

        let len = config.width * config.height * fields.len();
        let prototypes = (0..len).map(|_| rng.gen_range(0.0..1.0)).collect();

        Ok(Self {
            config,
            fields,
            prototypes,
        })
    }

    pub fn config(&self) -> &SomConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn height(&self) -> usize {
        self.config.height
    }

    /// Number of feature slots each prototype has.
    pub fn dimension(&self) -> usize {
        self.fields.len()
    }

    pub fn unit_count(&self) -> usize {
        self.config.width * self.config.height
    }

    pub fn fields(&self) -> &[FieldRange] {
        &self.fields
    }

    /// Flattened cell index `y * width + x`.
    pub fn cell_index(&self, (x, y): (usize, usize)) -> usize {
        y * self.config.width + x
    }

    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.config.width, index / self.config.width)
    }

    /// The scaled prototype of the unit at `index`.
    pub fn prototype(&self, index: usize) -> &[f64] {
        let dim = self.dimension();
        &self.prototypes[index * dim..(index + 1) * dim]
    }

    /// Train the map by competitive learning.
    ///
    /// Each epoch visits every sample once in a freshly shuffled order. Every
    /// visit finds the BMU and pulls it and its hex neighbors within the current
    /// radius toward the sample.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        samples: &[TrainingSample],
        rng: &mut R,
    ) -> Result<(), MachineError> {
        if samples.is_empty() {
            return Err(MachineError::EmptyCorpus);
        }
        let scaled = samples
            .iter()
            .map(|s| self.scale(&s.features))
            .collect::<Result<Vec<_>, _>>()?;

        let schedule = DecaySchedule::new(&self.config, self.config.epochs * samples.len());
        let mut order: Vec<usize> = (0..samples.len()).collect();

        info!(
            "Training {}x{} SOM on {} samples for {} iterations",
            self.config.width,
            self.config.height,
            samples.len(),
            schedule.iterations()
        );

        let mut iteration = 0;
        for epoch in 0..self.config.epochs {
            order.shuffle(rng);

            for &idx in &order {
                let input = &scaled[idx];
                let bmu = self.best_matching_unit(input);
                self.update(bmu, input, &schedule, iteration);
                iteration += 1;
            }

            debug!(
                "Epoch {}/{}: lr={:.4}, radius={:.3}",
                epoch + 1,
                self.config.epochs,
                schedule.learning_rate(iteration),
                schedule.radius(iteration)
            );
        }

        info!("SOM training completed");
        Ok(())
    }

    /// Grid coordinates of the BMU for an arbitrary feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<(usize, usize), MachineError> {
        let input = self.scale(features)?;
        Ok(self.coords(self.best_matching_unit(&input)))
    }

    fn scale(&self, features: &FeatureVector) -> Result<Vec<f64>, MachineError> {
        if features.len() != self.dimension() {
            return Err(MachineError::SchemaMismatch {
                expected: self.dimension(),
                actual: features.len(),
            });
        }
        Ok(features
            .slots()
            .iter()
            .zip(&self.fields)
            .map(|(&v, range)| range.scale(v))
            .collect())
    }

    /// Unit with the smallest Euclidean distance; ties go to the lowest index.
    fn best_matching_unit(&self, input: &[f64]) -> usize {
        let mut best_idx = 0;
        let mut best_dist = f64::MAX;

        for (i, proto) in self.prototypes.chunks_exact(self.dimension()).enumerate() {
            let d: f64 = proto
                .iter()
                .zip(input)
                .map(|(p, x)| (p - x) * (p - x))
                .sum();
            if d < best_dist {
                best_dist = d;
                best_idx = i;
            }
        }

        best_idx
    }

    fn update(&mut self, bmu: usize, input: &[f64], schedule: &DecaySchedule, iteration: usize) {
        let radius = schedule.radius(iteration);
        let lr = schedule.learning_rate(iteration);
        let bmu_coords = self.coords(bmu);
        let dim = self.dimension();
        let width = self.config.width;

        for (i, proto) in self.prototypes.chunks_exact_mut(dim).enumerate() {
            let d = hex_distance(bmu_coords, (i % width, i / width)) as f64;
            if d >= radius {
                continue;
            }
            let influence = lr * (-(d * d) / (2.0 * radius * radius)).exp();
            for (w, x) in proto.iter_mut().zip(input) {
                *w += influence * (x - *w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::color::Palette;

    fn sample(slots: Vec<u32>) -> TrainingSample {
        TrainingSample {
            features: FeatureVector::new(slots),
            metadata: Arc::new(Palette::default()),
        }
    }

    #[test]
    fn hex_distance_on_offset_rows() {
        assert_eq!(hex_distance((0, 0), (0, 0)), 0);
        assert_eq!(hex_distance((0, 0), (1, 0)), 1);
        assert_eq!(hex_distance((0, 0), (0, 1)), 1);
        // Odd rows shift right, so (1,1) is two steps from (0,0).
        assert_eq!(hex_distance((0, 0), (1, 1)), 2);
        assert_eq!(hex_distance((1, 0), (1, 1)), 1);
        assert_eq!(hex_distance((1, 0), (0, 1)), 1);
        assert_eq!(hex_distance((0, 0), (4, 0)), 4);
        assert_eq!(hex_distance((2, 2), (0, 0)), hex_distance((0, 0), (2, 2)));
        assert_eq!(hex_distance((0, 0), (0, 4)), 4);
    }

    #[test]
    fn schedule_decays_monotonically() {
        let config = SomConfig::new(10, 10);
        let schedule = DecaySchedule::new(&config, 500);
        assert!((schedule.radius(0) - 5.0).abs() < 1e-12);
        assert!((schedule.learning_rate(0) - 0.1).abs() < 1e-12);
        for t in 1..500 {
            assert!(schedule.radius(t) < schedule.radius(t - 1));
            assert!(schedule.learning_rate(t) < schedule.learning_rate(t - 1));
        }
        // The radius shrinks to a single cell by the end of training.
        assert!(schedule.radius(499) < 1.01);
    }

    #[test]
    fn schedule_for_tiny_maps_stays_finite() {
        for side in [1, 2] {
            let schedule = DecaySchedule::new(&SomConfig::new(side, side), 10);
            for t in 0..10 {
                assert!(schedule.radius(t).is_finite());
                assert!(schedule.radius(t) > 0.0);
            }
        }
    }

    #[test]
    fn rejects_bad_config() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            Som::new(SomConfig::new(0, 3), vec![FieldRange::COLOR], &mut rng),
            Err(MachineError::InvalidConfig(_))
        ));
        assert!(matches!(
            Som::new(SomConfig::new(3, 3).epochs(0), vec![FieldRange::COLOR], &mut rng),
            Err(MachineError::InvalidConfig(_))
        ));
        assert!(matches!(
            Som::new(SomConfig::new(3, 3).learning_rate(-1.0), vec![FieldRange::COLOR], &mut rng),
            Err(MachineError::InvalidConfig(_))
        ));
        assert!(matches!(
            Som::new(SomConfig::new(3, 3), Vec::new(), &mut rng),
            Err(MachineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn initial_prototypes_are_in_unit_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let som = Som::new(SomConfig::new(4, 3), vec![FieldRange::COLOR; 2], &mut rng).unwrap();
        assert_eq!(som.unit_count(), 12);
        for i in 0..som.unit_count() {
            let p = som.prototype(i);
            assert_eq!(p.len(), 2);
            assert!(p.iter().all(|v| (0.0..1.0).contains(v)));
        }
    }

    #[test]
    fn training_on_nothing_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut som = Som::new(SomConfig::new(2, 2), vec![FieldRange::COLOR], &mut rng).unwrap();
        assert!(matches!(som.train(&[], &mut rng), Err(MachineError::EmptyCorpus)));
    }

    #[test]
    fn schema_mismatch_on_train_and_predict() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut som = Som::new(SomConfig::new(2, 2), vec![FieldRange::COLOR; 2], &mut rng).unwrap();
        assert!(matches!(
            som.train(&[sample(vec![0, 0, 0])], &mut rng),
            Err(MachineError::SchemaMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(matches!(
            som.predict(&FeatureVector::new(vec![0])),
            Err(MachineError::SchemaMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn single_unit_converges_to_single_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut som = Som::new(SomConfig::new(1, 1).epochs(200), vec![FieldRange::COLOR; 2], &mut rng)
            .unwrap();
        let target = vec![0x00FF_0000, 0x0000_00FF];
        som.train(&[sample(target.clone())], &mut rng).unwrap();

        let expected = [FieldRange::COLOR.scale(target[0]), FieldRange::COLOR.scale(target[1])];
        for (p, e) in som.prototype(0).iter().zip(expected) {
            assert!((p - e).abs() < 0.01, "prototype {p} far from {e}");
        }
        assert_eq!(som.predict(&FeatureVector::new(target)).unwrap(), (0, 0));
    }

    #[test]
    fn predict_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut som = Som::new(SomConfig::new(5, 5), vec![FieldRange::COLOR; 3], &mut rng).unwrap();
        let samples: Vec<TrainingSample> = (0..25u32)
            .map(|i| sample(vec![i * 600_000, (25 - i) * 600_000, i * 100]))
            .collect();
        som.train(&samples, &mut rng).unwrap();

        for s in &samples {
            let first = som.predict(&s.features).unwrap();
            let second = som.predict(&s.features).unwrap();
            assert_eq!(first, second);
            assert!(first.0 < 5 && first.1 < 5);
        }
    }

    #[test]
    fn distinct_clusters_land_on_distinct_units() {
        let black = vec![0x0000_0000, 0x0010_1010];
        let white = vec![0x00FF_FFFF, 0x00F0_F0F0];
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut som =
                Som::new(SomConfig::new(3, 3), vec![FieldRange::COLOR; 2], &mut rng).unwrap();
            let samples = vec![
                sample(black.clone()),
                sample(white.clone()),
                sample(black.clone()),
                sample(white.clone()),
            ];
            som.train(&samples, &mut rng).unwrap();
            let b = som.predict(&FeatureVector::new(black.clone())).unwrap();
            let w = som.predict(&FeatureVector::new(white.clone())).unwrap();
            assert_ne!(b, w, "seed {seed}: black and white share a unit");
        }
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut som = Som::new(SomConfig::new(3, 2), vec![FieldRange::COLOR], &mut rng).unwrap();
        som.prototypes.iter_mut().for_each(|p| *p = 0.5);
        assert_eq!(som.predict(&FeatureVector::new(vec![0])).unwrap(), (0, 0));
        assert_eq!(som.cell_index((2, 1)), 5);
        assert_eq!(som.coords(5), (2, 1));
    }
}
