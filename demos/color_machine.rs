//! Train on a palette corpus, pick a random corpus color as the seed, and
//! write the synthesized palettes as stacked strips to a PNG.
//!
//! Usage:
//!   cargo run --example color_machine --release -- <palettes.json> [output.png] [seed]

use colormachine::render::{RenderOptions, render_palettes};
use colormachine::{ColorMachine, MachineConfig, corpus};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let input = args
        .get(1)
        .expect("usage: color_machine <palettes.json> [output.png] [seed]");
    let output = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "color-machine.png".to_string());

    let mut config = MachineConfig::new();
    if let Some(seed) = args.get(3) {
        config = config.seed(seed.parse().expect("seed must be an integer"));
    }

    let text = std::fs::read_to_string(input).unwrap();
    let (palettes, skipped) = corpus::parse_corpus_lenient(&text).unwrap();
    if skipped > 0 {
        eprintln!("Skipped {skipped} malformed palettes.");
    }

    let mut machine = ColorMachine::train(&palettes, &config).unwrap();
    eprintln!("Trained SOM on {} palettes.", palettes.len());

    let seed = machine.random_seed_color().unwrap();
    eprintln!("Using rgb({},{},{}) to generate palettes.", seed.r, seed.g, seed.b);

    let similar = machine.similar_to_color(seed).unwrap();
    eprintln!("Found {} similar palettes.", similar.len());
    if similar.is_empty() {
        eprintln!("Nothing to blend; try another seed.");
        return;
    }

    let generated = machine.synthesize_many(&similar, config.palette_count).unwrap();
    let image = render_palettes(&generated, RenderOptions::default());

    let file = std::fs::File::create(&output).unwrap();
    let buf = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(buf, image.width as u32, image.height as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&image.to_rgba_bytes()).unwrap();
    drop(writer);

    eprintln!("{input} → {output} ({} palettes)", generated.len());
}
