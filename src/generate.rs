use rand::Rng;
use rand::seq::SliceRandom;

use crate::color::{Color, Palette, WeightedColor};

/// Palette lengths the generator picks from.
pub const SIZES: [usize; 4] = [3, 4, 5, 6];

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color {
        r: rng.gen_range(0..=255),
        g: rng.gen_range(0..=255),
        b: rng.gen_range(0..=255),
    }
}

/// A palette of 3 to 6 uniformly random colors with weights summing to 1.
///
/// Each weight but the last is drawn from what is left of a shrinking budget
/// that reserves one point per slot; the last slot takes the remainder.
/// Weights are whole percentages stored as fractions.
pub fn random_palette<R: Rng + ?Sized>(rng: &mut R) -> Palette {
    let size = *SIZES.choose(rng).unwrap_or(&3);

    let mut remaining = 100 - size as u32;
    let mut percents = Vec::with_capacity(size);
    for _ in 0..size - 1 {
        let weight = if remaining > 1 {
            rng.gen_range(1..remaining)
        } else {
            remaining
        };
        remaining -= weight;
        percents.push(weight);
    }
    let assigned: u32 = percents.iter().sum();
    percents.push(100 - assigned);

    percents
        .into_iter()
        .map(|p| WeightedColor::new(random_color(rng), f64::from(p) / 100.0))
        .collect()
}

pub fn random_palettes<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Palette> {
    (0..count).map(|_| random_palette(rng)).collect()
}
