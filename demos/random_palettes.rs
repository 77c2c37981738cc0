//! Print random weighted palettes as a JSON corpus.
//!
//! Usage:
//!   cargo run --example random_palettes -- [count] [seed] > palettes.json

use colormachine::{corpus, generate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let count: usize = args.get(1).map_or(1, |s| s.parse().expect("count must be an integer"));

    let mut rng = match args.get(2) {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed.parse().expect("seed must be an integer")),
        None => ChaCha8Rng::from_entropy(),
    };

    let palettes = generate::random_palettes(count, &mut rng);
    println!("{}", corpus::to_json(&palettes));
}
