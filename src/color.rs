use crate::error::MachineError;

/// An 8-bit sRGB color.
pub type Color = rgb::RGB8;

/// Color used to pad short palettes up to the trained width.
pub const WHITE: Color = Color {
    r: 255,
    g: 255,
    b: 255,
};

/// Smallest packed feature value (black).
pub const MIN_FEATURE: u32 = color_to_int(Color { r: 0, g: 0, b: 0 });
/// Largest packed feature value (white).
pub const MAX_FEATURE: u32 = color_to_int(WHITE);

/// Pack a color into a single integer as `65536*r + 256*g + b`.
pub const fn color_to_int(color: Color) -> u32 {
    ((color.r as u32) << 16) | ((color.g as u32) << 8) | color.b as u32
}

/// A palette entry: a color and the fraction of the palette it occupies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedColor {
    pub color: Color,
    /// Share of the palette in [0, 1]. `None` sorts as 0.
    pub weight: Option<f64>,
}

impl WeightedColor {
    pub const fn new(color: Color, weight: f64) -> Self {
        Self {
            color,
            weight: Some(weight),
        }
    }

    pub const fn unweighted(color: Color) -> Self {
        Self {
            color,
            weight: None,
        }
    }

    pub const fn rgbw(r: u8, g: u8, b: u8, weight: f64) -> Self {
        Self::new(Color { r, g, b }, weight)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::unweighted(Color { r, g, b })
    }

    /// The zero-weight white entry appended when padding.
    pub(crate) const fn padding() -> Self {
        Self::new(WHITE, 0.0)
    }

    pub fn weight_or_zero(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }

    /// Build an entry from a raw `[r, g, b]` or `[r, g, b, weight]` record.
    ///
    /// Channels must be integral and within 0..=255; the weight must be finite
    /// and within [0, 1]. The error string describes the first violation.
    pub fn from_components(components: &[f64]) -> Result<Self, String> {
        if components.len() != 3 && components.len() != 4 {
            return Err(format!(
                "expected 3 or 4 components, got {}",
                components.len()
            ));
        }

        let mut channels = [0u8; 3];
        for (i, (&value, name)) in components.iter().zip(["red", "green", "blue"]).enumerate() {
            if !value.is_finite() || value.fract() != 0.0 || !(0.0..=255.0).contains(&value) {
                return Err(format!("{name} channel {value} is not an integer in 0..=255"));
            }
            channels[i] = value as u8;
        }

        let weight = match components.get(3) {
            Some(&w) => {
                check_weight(w)?;
                Some(w)
            }
            None => None,
        };

        Ok(Self {
            color: Color {
                r: channels[0],
                g: channels[1],
                b: channels[2],
            },
            weight,
        })
    }
}

fn check_weight(weight: f64) -> Result<(), String> {
    if weight.is_finite() && (0.0..=1.0).contains(&weight) {
        Ok(())
    } else {
        Err(format!("weight {weight} is not within [0, 1]"))
    }
}

/// An ordered sequence of weighted colors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Palette {
    entries: Vec<WeightedColor>,
}

impl Palette {
    pub fn new(entries: Vec<WeightedColor>) -> Self {
        Self { entries }
    }

    /// A palette holding a single unweighted color, as used for seed queries.
    pub fn single(color: Color) -> Self {
        Self::new(vec![WeightedColor::unweighted(color)])
    }

    pub fn entries(&self) -> &[WeightedColor] {
        &self.entries
    }

    pub fn get(&self, slot: usize) -> Option<&WeightedColor> {
        self.entries.get(slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, WeightedColor> {
        self.entries.iter()
    }

    /// Check that the palette is non-empty and every weight lies in [0, 1].
    ///
    /// `position` is the palette's index in its corpus and is only used for
    /// error reporting.
    pub fn validate(&self, position: usize) -> Result<(), MachineError> {
        if self.entries.is_empty() {
            return Err(MachineError::InvalidRecord {
                palette: position,
                entry: 0,
                reason: "palette has no colors".into(),
            });
        }
        self.check_weights()
            .map_err(|(entry, reason)| MachineError::InvalidRecord {
                palette: position,
                entry,
                reason,
            })
    }

    /// Like [`Palette::validate`] for a palette outside any corpus, such as
    /// a query. Bad weights are reported as [`MachineError::InvalidEntry`].
    pub fn check(&self) -> Result<(), MachineError> {
        if self.entries.is_empty() {
            return Err(MachineError::EmptyPalette);
        }
        self.check_weights()
            .map_err(|(entry, reason)| MachineError::InvalidEntry { entry, reason })
    }

    fn check_weights(&self) -> Result<(), (usize, String)> {
        for (entry, wc) in self.entries.iter().enumerate() {
            if let Some(w) = wc.weight {
                check_weight(w).map_err(|reason| (entry, reason))?;
            }
        }
        Ok(())
    }
}

impl AsRef<Palette> for Palette {
    fn as_ref(&self) -> &Palette {
        self
    }
}

impl From<Vec<WeightedColor>> for Palette {
    fn from(entries: Vec<WeightedColor>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<WeightedColor> for Palette {
    fn from_iter<I: IntoIterator<Item = WeightedColor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a WeightedColor;
    type IntoIter = core::slice::Iter<'a, WeightedColor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
