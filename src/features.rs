use std::sync::Arc;

use crate::color::{MAX_FEATURE, MIN_FEATURE, Palette, color_to_int};
use crate::error::MachineError;
use crate::normalize::{normalize_palette, sort_palette};

/// Value range of one feature slot, used to scale raw values into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRange {
    pub min: u32,
    pub max: u32,
}

impl FieldRange {
    /// The full range of packed 8-bit colors.
    pub const COLOR: Self = Self {
        min: MIN_FEATURE,
        max: MAX_FEATURE,
    };

    pub fn scale(&self, value: u32) -> f64 {
        let span = self.max.saturating_sub(self.min);
        if span == 0 {
            return 0.0;
        }
        (value.clamp(self.min, self.max) - self.min) as f64 / span as f64
    }
}

/// Fixed-width encoding of a normalized palette: slot `i` holds the packed
/// color of entry `i`. Weights are not part of the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    slots: Vec<u32>,
}

impl FeatureVector {
    pub fn new(slots: Vec<u32>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot names in schema order (`c0`, `c1`, ...).
    pub fn field_names(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.slots.len()).map(|i| format!("c{i}"))
    }
}

/// Encode a normalized palette slot by slot.
pub fn encode(normalized: &Palette) -> FeatureVector {
    FeatureVector::new(normalized.iter().map(|wc| color_to_int(wc.color)).collect())
}

/// A feature vector paired with the weight-sorted, unpadded source palette.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub metadata: Arc<Palette>,
}

/// All samples of one corpus, encoded to a common width.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    width: usize,
    samples: Vec<TrainingSample>,
}

impl TrainingSet {
    /// Validate, normalize, and encode every palette of a corpus.
    ///
    /// The width is the longest palette in the corpus. Fails fast on the
    /// first malformed palette and on an empty corpus.
    pub fn build(palettes: &[Palette]) -> Result<Self, MachineError> {
        if palettes.is_empty() {
            return Err(MachineError::EmptyCorpus);
        }
        for (i, palette) in palettes.iter().enumerate() {
            palette.validate(i)?;
        }

        let width = palettes.iter().map(Palette::len).max().unwrap_or(0);

        let samples = palettes
            .iter()
            .map(|palette| {
                let normalized = normalize_palette(palette, width)?;
                Ok(TrainingSample {
                    features: encode(&normalized),
                    metadata: Arc::new(sort_palette(palette)),
                })
            })
            .collect::<Result<Vec<_>, MachineError>>()?;

        Ok(Self { width, samples })
    }

    /// Number of feature slots per sample.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// One color range per slot, in schema order.
    pub fn field_ranges(&self) -> Vec<FieldRange> {
        vec![FieldRange::COLOR; self.width]
    }

    /// Normalize and encode an arbitrary palette to this set's width.
    pub fn encode_query(&self, palette: &Palette) -> Result<FeatureVector, MachineError> {
        encode_to_width(palette, self.width)
    }
}

pub(crate) fn encode_to_width(palette: &Palette, width: usize) -> Result<FeatureVector, MachineError> {
    Ok(encode(&normalize_palette(palette, width)?))
}
