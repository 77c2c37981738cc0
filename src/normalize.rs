use crate::color::{Palette, WeightedColor};
use crate::error::MachineError;

/// Order palette entries by weight, heaviest first.
///
/// Missing weights sort as 0. The sort is stable, so entries with equal
/// weight keep their input order.
pub fn sort_palette(palette: &Palette) -> Palette {
    let mut entries = palette.entries().to_vec();
    sort_entries(&mut entries);
    Palette::new(entries)
}

fn sort_entries(entries: &mut [WeightedColor]) {
    entries.sort_by(|a, b| {
        b.weight_or_zero()
            .partial_cmp(&a.weight_or_zero())
            .unwrap_or(core::cmp::Ordering::Equal)
    });
}

/// Pad a palette with zero-weight white entries up to `target_len`, then sort
/// it by weight.
///
/// Fails with [`MachineError::EmptyPalette`] for an empty palette, with
/// [`MachineError::InvalidEntry`] for a weight outside [0, 1], and with
/// [`MachineError::SchemaMismatch`] when the palette is longer than
/// `target_len`; palettes are never truncated.
pub fn normalize_palette(palette: &Palette, target_len: usize) -> Result<Palette, MachineError> {
    if palette.is_empty() {
        return Err(MachineError::EmptyPalette);
    }
    if palette.len() > target_len {
        return Err(MachineError::SchemaMismatch {
            expected: target_len,
            actual: palette.len(),
        });
    }
    palette.check()?;

    let mut entries = Vec::with_capacity(target_len);
    entries.extend_from_slice(palette.entries());
    entries.resize(target_len, WeightedColor::padding());
    sort_entries(&mut entries);

    Ok(Palette::new(entries))
}
