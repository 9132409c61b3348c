//! Color parsing and the 1×N palette lookup consumed by the field shader.
//!
//! The palette is uploaded as an `Rgba8Unorm` texture sampled with linear
//! filtering. [`Palette::sample`] reproduces that filtering on the CPU so the
//! headless surface and the GPU agree on every stop.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of stops uploaded to the lookup texture.
pub const MAX_PALETTE_STOPS: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaletteError {
    #[error("palette requires at least one color")]
    Empty,
    #[error("unrecognised color '{0}'")]
    InvalidColor(String),
}

/// 8-bit straight-alpha color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels normalised to `[0, 1]`, matching what an `Unorm` texture yields.
    pub fn to_unit(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// `#rrggbb`, or `#rrggbbaa` when the color is not opaque.
    pub fn to_hex(self) -> String {
        if self.a == 0xff {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a CSS named color.
    pub fn parse(input: &str) -> Result<Self, PaletteError> {
        let trimmed = input.trim();
        let invalid = || PaletteError::InvalidColor(input.to_string());
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }
        let lower = trimmed.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = PaletteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("red", Color::rgb(255, 0, 0)),
    ("lime", Color::rgb(0, 255, 0)),
    ("green", Color::rgb(0, 128, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("aqua", Color::rgb(0, 255, 255)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("fuchsia", Color::rgb(255, 0, 255)),
    ("silver", Color::rgb(192, 192, 192)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
    ("maroon", Color::rgb(128, 0, 0)),
    ("olive", Color::rgb(128, 128, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("teal", Color::rgb(0, 128, 128)),
    ("navy", Color::rgb(0, 0, 128)),
    ("orange", Color::rgb(255, 165, 0)),
    ("pink", Color::rgb(255, 192, 203)),
    ("hotpink", Color::rgb(255, 105, 180)),
    ("violet", Color::rgb(238, 130, 238)),
    ("indigo", Color::rgb(75, 0, 130)),
    ("gold", Color::rgb(255, 215, 0)),
    ("coral", Color::rgb(255, 127, 80)),
    ("crimson", Color::rgb(220, 20, 60)),
    ("turquoise", Color::rgb(64, 224, 208)),
    ("lavender", Color::rgb(230, 230, 250)),
    ("orchid", Color::rgb(218, 112, 214)),
    ("plum", Color::rgb(221, 160, 221)),
    ("salmon", Color::rgb(250, 128, 114)),
    ("skyblue", Color::rgb(135, 206, 235)),
    ("slateblue", Color::rgb(106, 90, 205)),
    ("midnightblue", Color::rgb(25, 25, 112)),
    ("rebeccapurple", Color::rgb(102, 51, 153)),
    ("transparent", Color::rgba(0, 0, 0, 0)),
];

/// Parses a list of color strings, stopping at the first bad entry.
pub fn parse_colors<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Color>, PaletteError> {
    inputs.iter().map(|s| Color::parse(s.as_ref())).collect()
}

/// 1×N lookup of palette stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Builds the lookup from an ordered list of stops.
    pub fn new(colors: &[Color]) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }
        let mut colors = colors.to_vec();
        if colors.len() > MAX_PALETTE_STOPS {
            tracing::warn!(
                supplied = colors.len(),
                max = MAX_PALETTE_STOPS,
                "palette truncated"
            );
            colors.truncate(MAX_PALETTE_STOPS);
        }
        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Packed RGBA8 rows ready for a 1×N texture upload.
    pub fn texels(&self) -> Vec<u8> {
        self.colors
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, c.a])
            .collect()
    }

    /// Samples at `t` in `[0, 1]` with linear filtering between texel centres.
    ///
    /// Texel `i` sits at `(i + 0.5) / N`; outside the outer centres the edge
    /// stop is held, which is what clamp-to-edge addressing produces.
    pub fn sample(&self, t: f32) -> [f32; 4] {
        let n = self.colors.len();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let x = (t * n as f32 - 0.5).clamp(0.0, (n - 1) as f32);
        let i0 = x.floor() as usize;
        let i1 = (i0 + 1).min(n - 1);
        let frac = x - i0 as f32;
        let a = self.colors[i0].to_unit();
        let b = self.colors[i1].to_unit();
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
            a[3] + (b[3] - a[3]) * frac,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::parse("#fff").unwrap(), Color::rgb(255, 255, 255));
        assert_eq!(Color::parse("#5227FF").unwrap(), Color::rgb(0x52, 0x27, 0xff));
        assert_eq!(
            Color::parse("#11223344").unwrap(),
            Color::rgba(0x11, 0x22, 0x33, 0x44)
        );
        assert_eq!(Color::parse("#0f08").unwrap(), Color::rgba(0, 255, 0, 0x88));
    }

    #[test]
    fn parses_named_colors_case_insensitively() {
        assert_eq!(Color::parse("Black").unwrap(), Color::rgb(0, 0, 0));
        assert_eq!(Color::parse(" white ").unwrap(), Color::rgb(255, 255, 255));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            Color::parse("#12345"),
            Err(PaletteError::InvalidColor("#12345".into()))
        );
        assert!(Color::parse("not-a-color").is_err());
        assert!(Color::parse("#gggggg").is_err());
    }

    #[test]
    fn empty_palette_is_an_error() {
        assert_eq!(Palette::new(&[]), Err(PaletteError::Empty));
    }

    #[test]
    fn endpoints_match_first_and_last_color() {
        let colors = parse_colors(&["#ff0000", "#00ff00", "#0000ff"]).unwrap();
        let palette = Palette::new(&colors).unwrap();
        assert!(approx(palette.sample(0.0), [1.0, 0.0, 0.0, 1.0]));
        assert!(approx(palette.sample(1.0), [0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn midpoint_interpolates_neighbouring_stops() {
        let palette = Palette::new(&[Color::rgb(0, 0, 0), Color::rgb(255, 255, 255)]).unwrap();
        let mid = palette.sample(0.5);
        assert!(approx(mid, [0.5, 0.5, 0.5, 1.0]));
        let quarter = palette.sample(0.375);
        assert!((quarter[0] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn single_stop_is_constant() {
        let palette = Palette::new(&[Color::rgb(10, 20, 30)]).unwrap();
        assert_eq!(palette.sample(0.0), palette.sample(1.0));
        assert_eq!(palette.sample(f32::NAN), palette.sample(0.7));
    }

    #[test]
    fn texels_are_packed_rgba() {
        let palette = Palette::new(&[Color::rgb(1, 2, 3), Color::rgba(4, 5, 6, 7)]).unwrap();
        assert_eq!(palette.texels(), vec![1, 2, 3, 255, 4, 5, 6, 7]);
    }

    #[test]
    fn oversized_palette_is_truncated() {
        let colors = vec![Color::rgb(0, 0, 0); MAX_PALETTE_STOPS + 10];
        let palette = Palette::new(&colors).unwrap();
        assert_eq!(palette.len(), MAX_PALETTE_STOPS);
    }
}
