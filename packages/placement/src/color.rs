//! Per-group color allocation.
//!
//! Each target line gets one color, drawn at random without replacement
//! from a fixed palette the first time the line is seen and memoized for
//! the rest of the load. Interlocutor sectors reuse their target's color.
//! Once the palette runs out, the configured [`ExhaustionPolicy`] decides
//! what later groups receive.

use std::collections::BTreeMap;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use serde::{Deserialize, Serialize};

/// Golden angle in degrees. Successive multiples spread hues evenly.
const GOLDEN_ANGLE_DEG: f64 = 137.507_764;

/// An opaque RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Builds a color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts an HSL color (hue in degrees, saturation and lightness in
    /// `0.0..=1.0`) to RGB.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::many_single_char_names
    )]
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - 2.0f64.mul_add(lightness, -1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = lightness - c / 2.0;

        let (r, g, b) = match h {
            h if h < 1.0 => (c, x, 0.0),
            h if h < 2.0 => (x, c, 0.0),
            h if h < 3.0 => (0.0, c, x),
            h if h < 4.0 => (0.0, x, c),
            h if h < 5.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    /// CSS `rgba()` form, as consumed by map widgets.
    #[must_use]
    pub fn to_css_rgba(self) -> String {
        format!("rgba({}, {}, {}, 1)", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error returned when a color string is not `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #rrggbb")]
pub struct InvalidColorError(pub String);

impl FromStr for Color {
    type Err = InvalidColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| InvalidColorError(s.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| InvalidColorError(s.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Default 25-entry palette of mutually distinguishable colors.
pub const DEFAULT_PALETTE: [Color; 25] = [
    Color::rgb(0xe6, 0x19, 0x4b),
    Color::rgb(0x3c, 0xb4, 0x4b),
    Color::rgb(0x43, 0x63, 0xd8),
    Color::rgb(0xf5, 0x82, 0x31),
    Color::rgb(0x91, 0x1e, 0xb4),
    Color::rgb(0x46, 0xf0, 0xf0),
    Color::rgb(0xf0, 0x32, 0xe6),
    Color::rgb(0xbc, 0xf6, 0x0c),
    Color::rgb(0xfa, 0xbe, 0xbe),
    Color::rgb(0x00, 0x80, 0x80),
    Color::rgb(0xe6, 0xbe, 0xff),
    Color::rgb(0x9a, 0x63, 0x24),
    Color::rgb(0xff, 0xfa, 0xc8),
    Color::rgb(0x80, 0x00, 0x00),
    Color::rgb(0xaa, 0xff, 0xc3),
    Color::rgb(0x80, 0x80, 0x00),
    Color::rgb(0xff, 0xd8, 0xb1),
    Color::rgb(0x00, 0x00, 0x75),
    Color::rgb(0x80, 0x80, 0x80),
    Color::rgb(0xff, 0xe1, 0x19),
    Color::rgb(0x00, 0x00, 0xc1),
    Color::rgb(0x00, 0xc1, 0x00),
    Color::rgb(0xb0, 0x00, 0x00),
    Color::rgb(0xff, 0x00, 0xcd),
    Color::rgb(0x2f, 0x4f, 0x4f),
];

/// What a new group receives once every palette color is taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Every further group shares one color.
    Fallback {
        /// The shared color.
        color: Color,
    },
    /// Every further group gets its own generated color, stepping the hue
    /// by the golden angle.
    HueRotation {
        /// HSL saturation in `0.0..=1.0`.
        saturation: f64,
        /// HSL lightness in `0.0..=1.0`.
        lightness: f64,
    },
}

impl Default for ExhaustionPolicy {
    fn default() -> Self {
        Self::Fallback {
            color: Color::BLACK,
        }
    }
}

/// Memoizing color allocator for one load.
#[derive(Debug)]
pub struct ColorAllocator {
    remaining: Vec<Color>,
    assigned: BTreeMap<String, Color>,
    policy: ExhaustionPolicy,
    overflow: u32,
    rng: StdRng,
}

impl ColorAllocator {
    /// Creates an allocator over `palette`.
    ///
    /// With `seed = None` the draw order comes from OS entropy; pass a seed
    /// for reproducible assignments.
    #[must_use]
    pub fn new(palette: &[Color], policy: ExhaustionPolicy, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut remaining = palette.to_vec();
        remaining.sort_unstable();
        remaining.dedup();

        Self {
            remaining,
            assigned: BTreeMap::new(),
            policy,
            overflow: 0,
            rng,
        }
    }

    /// Returns the color for `group`, drawing a new one on first use.
    pub fn color_for(&mut self, group: &str) -> Color {
        if let Some(color) = self.assigned.get(group) {
            return *color;
        }

        let color = if self.remaining.is_empty() {
            self.exhausted_color()
        } else {
            let idx = self.rng.gen_range(0..self.remaining.len());
            self.remaining.swap_remove(idx)
        };

        log::debug!("Assigned color {color} to group {group}");
        self.assigned.insert(group.to_string(), color);
        color
    }

    /// Returns the color already assigned to `group`, without drawing.
    #[must_use]
    pub fn peek(&self, group: &str) -> Option<Color> {
        self.assigned.get(group).copied()
    }

    /// Number of palette colors not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// All assignments made so far, keyed by group.
    #[must_use]
    pub const fn assignments(&self) -> &BTreeMap<String, Color> {
        &self.assigned
    }

    /// Consumes the allocator, returning its assignments.
    #[must_use]
    pub fn into_assignments(self) -> BTreeMap<String, Color> {
        self.assigned
    }

    fn exhausted_color(&mut self) -> Color {
        match self.policy {
            ExhaustionPolicy::Fallback { color } => {
                if self.overflow == 0 {
                    log::warn!("Color palette exhausted; further groups share {color}");
                }
                self.overflow += 1;
                color
            }
            ExhaustionPolicy::HueRotation {
                saturation,
                lightness,
            } => {
                let hue = f64::from(self.overflow) * GOLDEN_ANGLE_DEG;
                self.overflow += 1;
                Color::from_hsl(hue, saturation, lightness)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn memoizes_per_group() {
        let mut colors = ColorAllocator::new(&DEFAULT_PALETTE, ExhaustionPolicy::default(), Some(7));
        let a = colors.color_for("A");
        assert_eq!(colors.color_for("A"), a);
        assert_eq!(colors.peek("A"), Some(a));
        assert_eq!(colors.remaining(), DEFAULT_PALETTE.len() - 1);
    }

    #[test]
    fn draws_without_replacement_then_falls_back() {
        let mut colors = ColorAllocator::new(&DEFAULT_PALETTE, ExhaustionPolicy::default(), Some(1));
        let drawn: BTreeSet<Color> = (0..25).map(|i| colors.color_for(&format!("g{i}"))).collect();
        assert_eq!(drawn.len(), 25);
        assert_eq!(colors.remaining(), 0);

        assert_eq!(colors.color_for("g25"), Color::BLACK);
        assert_eq!(colors.color_for("g26"), Color::BLACK);
        assert_eq!(colors.color_for("g3"), colors.peek("g3").unwrap());
    }

    #[test]
    fn hue_rotation_keeps_overflow_groups_distinct() {
        let policy = ExhaustionPolicy::HueRotation {
            saturation: 0.65,
            lightness: 0.5,
        };
        let mut colors = ColorAllocator::new(&DEFAULT_PALETTE[..2], policy, Some(3));
        colors.color_for("a");
        colors.color_for("b");
        let extra: BTreeSet<Color> = (0..10).map(|i| colors.color_for(&format!("x{i}"))).collect();
        assert_eq!(extra.len(), 10);
    }

    #[test]
    fn same_seed_same_assignments() {
        let run = || {
            let mut colors =
                ColorAllocator::new(&DEFAULT_PALETTE, ExhaustionPolicy::default(), Some(99));
            for g in ["x", "y", "z"] {
                colors.color_for(g);
            }
            colors.into_assignments()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn duplicate_palette_entries_are_collapsed() {
        let palette = [Color::rgb(1, 2, 3), Color::rgb(1, 2, 3), Color::rgb(4, 5, 6)];
        let colors = ColorAllocator::new(&palette, ExhaustionPolicy::default(), Some(0));
        assert_eq!(colors.remaining(), 2);
    }

    #[test]
    fn parses_and_renders_hex() {
        let color: Color = "#FF00cd".parse().unwrap();
        assert_eq!(color, Color::rgb(255, 0, 205));
        assert_eq!(color.to_string(), "#ff00cd");
        assert_eq!(color.to_css_rgba(), "rgba(255, 0, 205, 1)");
        assert!("ff00cd".parse::<Color>().is_err());
        assert!("#ff00c".parse::<Color>().is_err());
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(Color::from_hsl(0.0, 1.0, 0.5), Color::rgb(255, 0, 0));
        assert_eq!(Color::from_hsl(120.0, 1.0, 0.5), Color::rgb(0, 255, 0));
        assert_eq!(Color::from_hsl(240.0, 1.0, 0.5), Color::rgb(0, 0, 255));
    }
}
