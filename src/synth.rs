use rand::Rng;
use rand::seq::SliceRandom;

use crate::color::{Color, Palette, WeightedColor};
use crate::error::MachineError;

/// Total every synthesized palette's percentages add up to.
pub const FULL: i32 = 100;

/// What the over-100 repair pass does with slots that are already at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeficitPolicy {
    /// Skip slots at 0 and move the cursor on; no percentage goes negative.
    #[default]
    FloorAtZero,
    /// Decrement whatever slot the cursor points at, even below 0.
    Unbounded,
}

/// One colored band of a synthesized palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub color: Color,
    /// Whole percentage points.
    pub percent: i32,
}

/// A generated palette whose percentages sum to exactly 100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedPalette {
    segments: Vec<Segment>,
}

impl SynthesizedPalette {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total(&self) -> i32 {
        self.segments.iter().map(|s| s.percent).sum()
    }

    /// Convert back to fractional weights.
    pub fn to_palette(&self) -> Palette {
        self.segments
            .iter()
            .map(|s| WeightedColor::new(s.color, f64::from(s.percent) / 100.0))
            .collect()
    }
}

/// Round-robin position over `len` slots.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    pos: usize,
    len: usize,
}

impl Cursor {
    fn first(len: usize) -> Self {
        Self { pos: 0, len }
    }

    fn last(len: usize) -> Self {
        Self { pos: len - 1, len }
    }

    fn forward(&mut self) {
        self.pos = if self.pos + 1 >= self.len { 0 } else { self.pos + 1 };
    }

    fn backward(&mut self) {
        self.pos = if self.pos == 0 { self.len - 1 } else { self.pos - 1 };
    }
}

/// Adjust whole percentages so they sum to exactly 100.
///
/// Two passes run in order. While the sum is below 100, one point is added at
/// a cursor that starts on the last slot and walks backward. While the sum is
/// above 100, one point is removed at a cursor that starts on slot 0 and walks
/// forward. An empty slice is left untouched.
pub fn repair_percentages(percents: &mut [i32], policy: DeficitPolicy) {
    if percents.is_empty() {
        return;
    }
    let len = percents.len();
    let mut total: i32 = percents.iter().sum();

    let mut cursor = Cursor::last(len);
    while total < FULL {
        percents[cursor.pos] += 1;
        total += 1;
        cursor.backward();
    }

    let mut cursor = Cursor::first(len);
    while total > FULL {
        let slot = &mut percents[cursor.pos];
        if *slot > 0 || policy == DeficitPolicy::Unbounded {
            *slot -= 1;
            total -= 1;
        }
        cursor.forward();
    }
}

/// Produce one new palette by recombining the colors and weights of `bucket`.
///
/// The slot count is the length of a uniformly chosen bucket entry. For every
/// slot, a color and, independently, a weight are drawn from the entries long
/// enough to have that slot. Weights are rounded to hundredths, taken as whole
/// percentage points, and repaired to sum to 100.
pub fn synthesize<P, R>(
    bucket: &[P],
    policy: DeficitPolicy,
    rng: &mut R,
) -> Result<SynthesizedPalette, MachineError>
where
    P: AsRef<Palette>,
    R: Rng + ?Sized,
{
    let size = bucket
        .choose(rng)
        .ok_or(MachineError::EmptyBucket)?
        .as_ref()
        .len();
    if size == 0 {
        return Err(MachineError::EmptyPalette);
    }

    let mut colors = Vec::with_capacity(size);
    let mut percents = Vec::with_capacity(size);
    let mut candidates: Vec<&WeightedColor> = Vec::with_capacity(bucket.len());

    for slot in 0..size {
        candidates.clear();
        candidates.extend(bucket.iter().filter_map(|p| p.as_ref().get(slot)));

        // The chosen entry has this slot, so there is always a candidate.
        let (Some(color), Some(weight)) = (candidates.choose(rng), candidates.choose(rng)) else {
            return Err(MachineError::EmptyBucket);
        };
        colors.push(color.color);
        percents.push(hundredths(weight.weight_or_zero()));
    }

    repair_percentages(&mut percents, policy);

    Ok(SynthesizedPalette {
        segments: colors
            .into_iter()
            .zip(percents)
            .map(|(color, percent)| Segment { color, percent })
            .collect(),
    })
}

/// Synthesize `count` palettes from the same bucket.
pub fn synthesize_many<P, R>(
    bucket: &[P],
    count: usize,
    policy: DeficitPolicy,
    rng: &mut R,
) -> Result<Vec<SynthesizedPalette>, MachineError>
where
    P: AsRef<Palette>,
    R: Rng + ?Sized,
{
    (0..count).map(|_| synthesize(bucket, policy, rng)).collect()
}

/// A fractional weight rounded to two decimals, as whole percentage points.
///
/// Equal to rounding to two decimals and then taking `floor(w * 100)` in
/// exact arithmetic. Doing it in one step avoids float error such as
/// `0.29 * 100.0` flooring to 28.
fn hundredths(weight: f64) -> i32 {
    (weight * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn palette(entries: &[(u8, f64)]) -> Palette {
        entries
            .iter()
            .map(|&(v, w)| WeightedColor::rgbw(v, v, v, w))
            .collect()
    }

    #[test]
    fn excess_pass_walks_backward_from_last_slot() {
        let mut p = vec![30, 30, 30];
        repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
        // 10 points: slots 2,1,0 three times, then slot 2 once more.
        assert_eq!(p, vec![33, 33, 34]);
    }

    #[test]
    fn deficit_pass_walks_forward_from_first_slot() {
        let mut p = vec![50, 40, 20];
        repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
        // 10 points: slots 0,1,2 three times, then slot 0 once more.
        assert_eq!(p, vec![46, 37, 17]);
    }

    #[test]
    fn exact_total_is_left_alone() {
        let mut p = vec![25, 25, 50];
        repair_percentages(&mut p, DeficitPolicy::Unbounded);
        assert_eq!(p, vec![25, 25, 50]);
    }

    #[test]
    fn cursor_wraps_for_single_slot() {
        let mut p = vec![37];
        repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
        assert_eq!(p, vec![100]);

        let mut p = vec![140];
        repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
        assert_eq!(p, vec![100]);
    }

    #[test]
    fn floor_at_zero_skips_empty_slots() {
        let mut p = vec![100, 0, 5];
        repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
        // Slot 1 is skipped every time the cursor passes it.
        assert_eq!(p, vec![97, 0, 3]);
        assert_eq!(p.iter().sum::<i32>(), 100);

        let mut p = vec![100, 0, 5];
        repair_percentages(&mut p, DeficitPolicy::Unbounded);
        assert_eq!(p, vec![98, -2, 4]);
        assert_eq!(p.iter().sum::<i32>(), 100);
    }

    #[test]
    fn hundredths_are_whole_points() {
        assert_eq!(hundredths(0.29), 29);
        assert_eq!(hundredths(0.57), 57);
        assert_eq!(hundredths(0.3), 30);
        assert_eq!(hundredths(1.0), 100);
        assert_eq!(hundredths(0.0), 0);
        assert_eq!(hundredths(0.344), 34);
    }

    #[test]
    fn floor_at_zero_never_goes_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..500 {
            let len = rng.gen_range(1..8);
            let mut p: Vec<i32> = (0..len).map(|_| rng.gen_range(0..=100)).collect();
            repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
            assert_eq!(p.iter().sum::<i32>(), FULL, "{p:?}");
            assert!(p.iter().all(|&v| (0..=100).contains(&v)), "{p:?}");
        }
    }

    #[test]
    fn empty_slice_is_a_no_op() {
        let mut p: Vec<i32> = Vec::new();
        repair_percentages(&mut p, DeficitPolicy::FloorAtZero);
        assert!(p.is_empty());
    }

    #[test]
    fn single_entry_bucket_reproduces_entry() {
        let bucket = vec![Arc::new(palette(&[(0, 0.34), (5, 0.3), (250, 0.3)]))];
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let out = synthesize(&bucket, DeficitPolicy::FloorAtZero, &mut rng).unwrap();

        let colors: Vec<u8> = out.segments().iter().map(|s| s.color.r).collect();
        let percents: Vec<i32> = out.segments().iter().map(|s| s.percent).collect();
        assert_eq!(colors, vec![0, 5, 250]);
        // 34 + 30 + 30 = 94; six points go to slots 2,1,0,2,1,0.
        assert_eq!(percents, vec![36, 32, 32]);
        assert_eq!(out.total(), 100);
    }

    #[test]
    fn colors_come_from_the_same_slot_of_some_entry() {
        let bucket = vec![
            palette(&[(10, 0.5), (20, 0.3), (30, 0.2)]),
            palette(&[(11, 0.7), (21, 0.3)]),
            palette(&[(12, 0.4), (22, 0.3), (32, 0.2), (42, 0.1)]),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        for _ in 0..300 {
            let out = synthesize(&bucket, DeficitPolicy::FloorAtZero, &mut rng).unwrap();
            assert!([2, 3, 4].contains(&out.len()));
            assert_eq!(out.total(), 100);
            for (slot, seg) in out.segments().iter().enumerate() {
                let allowed = bucket
                    .iter()
                    .filter_map(|p| p.get(slot))
                    .any(|wc| wc.color == seg.color);
                assert!(allowed, "slot {slot} color {:?} not in bucket", seg.color);
                assert!(seg.percent >= 0);
            }
        }
    }

    #[test]
    fn shorter_entries_do_not_contribute_past_their_length() {
        let bucket = vec![
            palette(&[(10, 0.9), (20, 0.1)]),
            palette(&[(50, 1.0)]),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(24);
        for _ in 0..200 {
            let out = synthesize(&bucket, DeficitPolicy::FloorAtZero, &mut rng).unwrap();
            if out.len() == 2 {
                assert_eq!(out.segments()[1].color.r, 20);
            }
        }
    }

    #[test]
    fn empty_bucket_is_an_error() {
        let bucket: Vec<Palette> = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(25);
        assert!(matches!(
            synthesize(&bucket, DeficitPolicy::FloorAtZero, &mut rng),
            Err(MachineError::EmptyBucket)
        ));
    }

    #[test]
    fn batch_produces_requested_count() {
        let bucket = vec![palette(&[(1, 0.5), (2, 0.5)])];
        let mut rng = ChaCha8Rng::seed_from_u64(26);
        let out = synthesize_many(&bucket, 8, DeficitPolicy::FloorAtZero, &mut rng).unwrap();
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|p| p.total() == 100));
    }

    #[test]
    fn to_palette_restores_fractions() {
        let bucket = vec![palette(&[(1, 0.25), (2, 0.75)])];
        let mut rng = ChaCha8Rng::seed_from_u64(27);
        let p = synthesize(&bucket, DeficitPolicy::FloorAtZero, &mut rng)
            .unwrap()
            .to_palette();
        let weights: Vec<f64> = p.iter().map(|wc| wc.weight_or_zero()).collect();
        assert_eq!(weights, vec![0.25, 0.75]);
    }
}
