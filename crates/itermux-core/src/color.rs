//! Tab color parsing: `#RRGGBB` or a small named palette.
//!
//! Channels are normalized to `0.0..=1.0`. Anything unrecognized becomes
//! neutral gray rather than an error.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TabColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl TabColor {
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Neutral gray used for unknown input.
    pub const FALLBACK: Self = Self::new(0.5, 0.5, 0.5);

    pub fn as_tuple(self) -> (f64, f64, f64) {
        (self.red, self.green, self.blue)
    }

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        )
    }
}

const NAMED_COLORS: &[(&str, TabColor)] = &[
    ("red", TabColor::new(1.0, 0.0, 0.0)),
    ("green", TabColor::new(0.0, 1.0, 0.0)),
    ("blue", TabColor::new(0.0, 0.0, 1.0)),
    ("yellow", TabColor::new(1.0, 1.0, 0.0)),
    ("purple", TabColor::new(0.5, 0.0, 0.5)),
    ("cyan", TabColor::new(0.0, 1.0, 1.0)),
    ("orange", TabColor::new(1.0, 0.5, 0.0)),
    ("pink", TabColor::new(1.0, 0.75, 0.8)),
];

/// Parse a caller-supplied color. Never fails.
pub fn parse_color(input: &str) -> TabColor {
    let trimmed = input.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex).unwrap_or(TabColor::FALLBACK);
    }
    let lower = trimmed.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map_or(TabColor::FALLBACK, |(_, color)| *color)
}

fn parse_hex(hex: &str) -> Option<TabColor> {
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(TabColor::from_bytes(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_red() {
        assert_eq!(parse_color("#FF0000").as_tuple(), (1.0, 0.0, 0.0));
    }

    #[test]
    fn named_red_matches_hex() {
        assert_eq!(parse_color("red"), parse_color("#FF0000"));
    }

    #[test]
    fn unknown_name_falls_back_to_gray() {
        assert_eq!(parse_color("chartreuse").as_tuple(), (0.5, 0.5, 0.5));
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse_color("  Cyan "), TabColor::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn lowercase_hex_is_accepted() {
        let color = parse_color("#00ff80");
        assert_eq!(color.red, 0.0);
        assert_eq!(color.green, 1.0);
        assert!((color.blue - 128.0 / 255.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_hex_falls_back() {
        assert_eq!(parse_color("#FFF"), TabColor::FALLBACK);
        assert_eq!(parse_color("#GG0000"), TabColor::FALLBACK);
        assert_eq!(parse_color("#FF00001"), TabColor::FALLBACK);
    }

    #[test]
    fn every_named_color_is_in_range() {
        for (name, color) in NAMED_COLORS {
            for channel in [color.red, color.green, color.blue] {
                assert!((0.0..=1.0).contains(&channel), "{name} out of range");
            }
        }
    }
}
