//! Role colors and the palette engine.
//!
//! Colors are 24-bit RGB integers, the representation the platform uses on
//! the wire. Zero means "no color". The palette is a set of visually distinct
//! colors sampled at evenly spaced hues with fixed saturation and lightness.

use std::{collections::HashSet, fmt, str::FromStr};

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// A 24-bit RGB role color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u32);

impl Color {
  pub const UNSET: Color = Color(0);

  /// Build from a raw integer; bits above 24 are masked off.
  pub const fn from_rgb(value: u32) -> Self { Self(value & 0x00ff_ffff) }

  pub const fn value(self) -> u32 { self.0 }

  pub const fn is_unset(self) -> bool { self.0 == 0 }

  /// Lowercase `#rrggbb`.
  pub fn to_hex(self) -> String { format!("#{:06x}", self.0) }

  /// Parse `#RRGGBB` (the leading `#` is optional, surrounding whitespace is
  /// ignored).
  pub fn from_hex(value: &str) -> Result<Self> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(Error::InvalidColor(value.to_owned()));
    }
    u32::from_str_radix(digits, 16)
      .map(Self)
      .map_err(|_| Error::InvalidColor(value.to_owned()))
  }
}

impl fmt::Display for Color {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_hex())
  }
}

impl FromStr for Color {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::from_hex(s) }
}

impl Serialize for Color {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_hex())
  }
}

impl<'de> Deserialize<'de> for Color {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Color::from_hex(&raw).map_err(serde::de::Error::custom)
  }
}

// ─── Palette ─────────────────────────────────────────────────────────────────

/// Shape of the generated palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteSettings {
  /// Number of evenly spaced hue samples.
  pub size:       usize,
  pub saturation: f64,
  pub lightness:  f64,
}

impl Default for PaletteSettings {
  fn default() -> Self {
    Self { size: 250, saturation: 0.65, lightness: 0.5 }
  }
}

/// Sample `settings.size` hues around the color wheel and convert each to an
/// RGB color. Duplicates produced by integer truncation are dropped; order
/// follows the hue.
pub fn build_palette(settings: &PaletteSettings) -> Vec<Color> {
  let mut seen = HashSet::with_capacity(settings.size);
  let mut colors = Vec::with_capacity(settings.size);
  for idx in 0..settings.size {
    let hue = idx as f64 / settings.size as f64;
    let (r, g, b) = hls_to_rgb(hue, settings.lightness, settings.saturation);
    let value = (channel(r) << 16) | (channel(g) << 8) | channel(b);
    let color = Color::from_rgb(value);
    if seen.insert(color) {
      colors.push(color);
    }
  }
  colors
}

/// Palette entries not present in `used`, in palette order.
pub fn available_colors(palette: &[Color], used: &HashSet<Color>) -> Vec<Color> {
  palette.iter().copied().filter(|c| !used.contains(c)).collect()
}

/// Pick uniformly at random from `available`. `None` when exhausted.
pub fn select_random_color<R: Rng + ?Sized>(available: &[Color], rng: &mut R) -> Option<Color> {
  available.choose(rng).copied()
}

fn channel(v: f64) -> u32 { (v.clamp(0.0, 1.0) * 255.0) as u32 }

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRDS: f64 = 2.0 / 3.0;

/// HLS → RGB, all components in `[0, 1]`.
fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
  if s == 0.0 {
    return (l, l, l);
  }
  let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
  let m1 = 2.0 * l - m2;
  (
    hue_component(m1, m2, h + ONE_THIRD),
    hue_component(m1, m2, h),
    hue_component(m1, m2, h - ONE_THIRD),
  )
}

fn hue_component(m1: f64, m2: f64, hue: f64) -> f64 {
  let hue = hue.rem_euclid(1.0);
  if hue < ONE_SIXTH {
    m1 + (m2 - m1) * hue * 6.0
  } else if hue < 0.5 {
    m2
  } else if hue < TWO_THIRDS {
    m1 + (m2 - m1) * (TWO_THIRDS - hue) * 6.0
  } else {
    m1
  }
}
