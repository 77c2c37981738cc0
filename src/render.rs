use crate::color::{Color, WHITE};
use crate::synth::SynthesizedPalette;

/// Canvas geometry for [`render_palettes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Strip width in pixels.
    pub width: usize,
    /// Height of each palette's strip in pixels.
    pub row_height: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 300,
            row_height: 30,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn row_height(mut self, height: usize) -> Self {
        self.row_height = height;
        self
    }
}

/// An opaque RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<rgb::RGBA8>,
}

impl RenderedImage {
    pub fn pixel(&self, x: usize, y: usize) -> rgb::RGBA8 {
        self.pixels[y * self.width + x]
    }

    /// Flatten to `[R, G, B, A, R, G, B, A, ...]`.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b, p.a]).collect()
    }
}

/// Draw each palette as a horizontal strip, stacked top to bottom.
///
/// Column `x` shows the first segment whose running percentage reaches
/// `(x + 1) / width * 100`, so each color spans a share of the strip
/// proportional to its percentage.
pub fn render_palettes(palettes: &[SynthesizedPalette], options: RenderOptions) -> RenderedImage {
    let width = options.width;
    let height = options.row_height * palettes.len();
    let mut pixels = Vec::with_capacity(width * height);

    for palette in palettes {
        let row: Vec<rgb::RGBA8> = (0..width).map(|x| column_color(palette, x, width)).collect();
        for _ in 0..options.row_height {
            pixels.extend_from_slice(&row);
        }
    }

    RenderedImage {
        width,
        height,
        pixels,
    }
}

fn column_color(palette: &SynthesizedPalette, x: usize, width: usize) -> rgb::RGBA8 {
    let segments = palette.segments();
    let Some(last) = segments.last() else {
        return opaque(WHITE);
    };

    // cumulative / 100 >= (x + 1) / width, kept in integers.
    let threshold = (x as i64 + 1) * 100;
    let mut cumulative = 0i64;
    let color = segments
        .iter()
        .find(|s| {
            cumulative += i64::from(s.percent);
            cumulative * width as i64 >= threshold
        })
        .unwrap_or(last)
        .color;

    opaque(color)
}

fn opaque(color: Color) -> rgb::RGBA8 {
    rgb::RGBA8::new(color.r, color.g, color.b, 255)
}
