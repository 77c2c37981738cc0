use std::collections::BTreeMap;
use std::sync::Arc;

use log::info;

use crate::color::Palette;
use crate::error::MachineError;
use crate::features::{TrainingSet, encode_to_width};
use crate::som::Som;

/// Map from flattened grid cell to the palettes whose BMU is that cell.
///
/// Palettes are shared with the training set, not copied. Within a cell they
/// keep training-set order.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    buckets: BTreeMap<usize, Vec<Arc<Palette>>>,
}

impl LookupTable {
    /// Assign every training sample to the cell of its BMU.
    pub fn build(som: &Som, training: &TrainingSet) -> Result<Self, MachineError> {
        let mut buckets: BTreeMap<usize, Vec<Arc<Palette>>> = BTreeMap::new();

        for sample in training.samples() {
            let cell = som.cell_index(som.predict(&sample.features)?);
            buckets
                .entry(cell)
                .or_default()
                .push(Arc::clone(&sample.metadata));
        }

        info!(
            "Indexed {} palettes into {} of {} cells",
            training.len(),
            buckets.len(),
            som.unit_count()
        );

        Ok(Self { buckets })
    }

    /// Palettes assigned to `cell`; empty when none landed there.
    pub fn bucket(&self, cell: usize) -> &[Arc<Palette>] {
        self.buckets.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Palettes that share a cell with `palette`.
    ///
    /// The query is padded to the trained width before prediction. An empty
    /// result means nothing similar was found; errors only come from a query
    /// that cannot be encoded (empty, or wider than the map).
    pub fn query(&self, som: &Som, palette: &Palette) -> Result<&[Arc<Palette>], MachineError> {
        let features = encode_to_width(palette, som.dimension())?;
        let cell = som.cell_index(som.predict(&features)?);
        Ok(self.bucket(cell))
    }

    /// Cells that hold at least one palette, in ascending order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.keys().copied()
    }

    /// Total number of indexed palettes.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
