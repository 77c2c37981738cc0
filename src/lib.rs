#![forbid(unsafe_code)]

pub mod color;
pub mod corpus;
pub mod error;
pub mod features;
pub mod generate;
pub mod index;
pub mod normalize;
pub mod render;
pub mod som;
pub mod synth;

pub use color::{Color, Palette, WeightedColor};
pub use error::MachineError;
pub use index::LookupTable;
pub use som::{Som, SomConfig};
pub use synth::{DeficitPolicy, Segment, SynthesizedPalette};

use std::sync::Arc;

use log::info;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use features::TrainingSet;

/// Configuration for training a [`ColorMachine`].
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Upper bound on each grid side. The grid is `min(corpus, max_grid_side)` square.
    pub max_grid_side: usize,
    /// Passes over the corpus during training.
    pub epochs: usize,
    /// Initial SOM learning rate.
    pub learning_rate: f64,
    /// Palettes produced per [`ColorMachine::generate`] call.
    pub palette_count: usize,
    /// How weight repair treats slots that reach 0.
    pub deficit_policy: DeficitPolicy,
    /// RNG seed. If None, seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_grid_side: 20,
            epochs: 10,
            learning_rate: 0.1,
            palette_count: 8,
            deficit_policy: DeficitPolicy::FloorAtZero,
            seed: None,
        }
    }
}

impl MachineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_grid_side(mut self, side: usize) -> Self {
        self.max_grid_side = side;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn palette_count(mut self, count: usize) -> Self {
        self.palette_count = count;
        self
    }

    pub fn deficit_policy(mut self, policy: DeficitPolicy) -> Self {
        self.deficit_policy = policy;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// SOM shape for a corpus of `corpus_len` palettes.
    pub fn som_config(&self, corpus_len: usize) -> SomConfig {
        let side = corpus_len.min(self.max_grid_side);
        SomConfig::new(side, side)
            .epochs(self.epochs)
            .learning_rate(self.learning_rate)
    }
}

/// A trained map plus its lookup table, ready to answer similarity queries
/// and synthesize palettes.
#[derive(Debug)]
pub struct ColorMachine {
    training: TrainingSet,
    som: Som,
    table: LookupTable,
    policy: DeficitPolicy,
    palette_count: usize,
    rng: ChaCha8Rng,
}

impl ColorMachine {
    /// Train a map on `palettes` and index the corpus.
    pub fn train(palettes: &[Palette], config: &MachineConfig) -> Result<Self, MachineError> {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        // 1. Normalize and encode the corpus
        let training = TrainingSet::build(palettes)?;

        // 2. Train the map
        let mut som = Som::new(
            config.som_config(training.len()),
            training.field_ranges(),
            &mut rng,
        )?;
        som.train(training.samples(), &mut rng)?;

        // 3. Index every palette by its BMU
        let table = LookupTable::build(&som, &training)?;

        info!("Trained SOM on {} palettes", training.len());

        Ok(Self {
            training,
            som,
            table,
            policy: config.deficit_policy,
            palette_count: config.palette_count,
            rng,
        })
    }

    pub fn som(&self) -> &Som {
        &self.som
    }

    pub fn lookup_table(&self) -> &LookupTable {
        &self.table
    }

    pub fn training_set(&self) -> &TrainingSet {
        &self.training
    }

    /// Corpus palettes that share a map cell with `palette`.
    pub fn similar(&self, palette: &Palette) -> Result<Vec<Arc<Palette>>, MachineError> {
        Ok(self.table.query(&self.som, palette)?.to_vec())
    }

    /// Corpus palettes that share a map cell with a single-color seed.
    pub fn similar_to_color(&self, color: Color) -> Result<Vec<Arc<Palette>>, MachineError> {
        self.similar(&Palette::single(color))
    }

    /// A uniformly chosen color from anywhere in the corpus.
    pub fn random_seed_color(&mut self) -> Option<Color> {
        let colors: Vec<Color> = self
            .training
            .samples()
            .iter()
            .flat_map(|s| s.metadata.iter().map(|wc| wc.color))
            .collect();
        colors.choose(&mut self.rng).copied()
    }

    pub fn synthesize<P: AsRef<Palette>>(
        &mut self,
        bucket: &[P],
    ) -> Result<SynthesizedPalette, MachineError> {
        synth::synthesize(bucket, self.policy, &mut self.rng)
    }

    pub fn synthesize_many<P: AsRef<Palette>>(
        &mut self,
        bucket: &[P],
        count: usize,
    ) -> Result<Vec<SynthesizedPalette>, MachineError> {
        synth::synthesize_many(bucket, count, self.policy, &mut self.rng)
    }

    /// Look up palettes similar to `seed` and synthesize the configured number
    /// of new ones from them.
    ///
    /// Fails with [`MachineError::EmptyBucket`] when nothing similar was found.
    pub fn generate(&mut self, seed: Color) -> Result<Vec<SynthesizedPalette>, MachineError> {
        let bucket = self.table.query(&self.som, &Palette::single(seed))?;
        info!("Found {} similar palettes", bucket.len());
        synth::synthesize_many(bucket, self.palette_count, self.policy, &mut self.rng)
    }
}
