use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::style::Color;
use tracing::{trace, warn};

use crate::domain::CTVError;

// Draws per palette entry before giving up on randomness.
const ATTEMPTS_PER_COLOR: usize = 8;

/// A fixed set of at least two distinct colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Result<Self, CTVError> {
        let mut distinct: Vec<Color> = Vec::with_capacity(colors.len());
        for c in colors {
            if !distinct.contains(&c) {
                distinct.push(c);
            }
        }
        if distinct.len() < 2 {
            return Err(CTVError::PaletteTooSmall {
                len: distinct.len(),
            });
        }
        Ok(Self { colors: distinct })
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Color::Red,
                Color::Green,
                Color::Yellow,
                Color::Blue,
                Color::Magenta,
                Color::Cyan,
                Color::LightRed,
                Color::LightGreen,
                Color::LightYellow,
                Color::LightBlue,
                Color::LightMagenta,
                Color::LightCyan,
            ],
        }
    }
}

/// Source of highlight colors. Implementations keep no memory of what they
/// returned before.
pub trait ColorGenerator {
    fn next_color(&mut self) -> Color;
    fn palette(&self) -> &[Color];
}

pub struct RandomColor {
    palette: Palette,
    rng: StdRng,
}

impl RandomColor {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(palette: Palette, seed: u64) -> Self {
        Self {
            palette,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ColorGenerator for RandomColor {
    fn next_color(&mut self) -> Color {
        let idx = self.rng.random_range(0..self.palette.len());
        self.palette.colors()[idx]
    }

    fn palette(&self) -> &[Color] {
        self.palette.colors()
    }
}

/// Draws from `generator` until the color differs from `current`.
///
/// The number of draws is bounded by the palette size. Once exhausted, the
/// first palette color other than `current` is used. A generator whose palette
/// holds only `current` returns `current`; `Palette` rules that case out.
pub fn next_distinct_color(generator: &mut dyn ColorGenerator, current: Color) -> Color {
    let attempts = generator.palette().len().max(1) * ATTEMPTS_PER_COLOR;
    for attempt in 0..attempts {
        let color = generator.next_color();
        if color != current {
            trace!("Picked color {color:?} after {} draws", attempt + 1);
            return color;
        }
    }
    warn!("No new color after {attempts} draws, falling back to palette order");
    generator
        .palette()
        .iter()
        .copied()
        .find(|&c| c != current)
        .unwrap_or(current)
}
