//! Per-level console colors.
//!
//! A color is either one of the 16 ANSI names or an explicit
//! hue/saturation/lightness triple. In config files the former is a string
//! (`"yellow"`) and the latter a three-element array (`[40, 100, 50]`).

use crate::Level;
use once_cell::sync::Lazy;
use owo_colors::{AnsiColors, OwoColorize};
use serde::{Deserialize, Serialize};

/// Built-in palette used when no overrides are given
static DEFAULT_PALETTE: Lazy<ColorMap> = Lazy::new(|| ColorMap {
    verbose: LevelColor::Named(NamedColor::BrightBlack),
    info: LevelColor::Named(NamedColor::Green),
    warning: LevelColor::Named(NamedColor::Yellow),
    error: LevelColor::Named(NamedColor::Red),
});

/// The 16 standard terminal colors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    #[serde(alias = "gray", alias = "grey")]
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl From<NamedColor> for AnsiColors {
    fn from(color: NamedColor) -> Self {
        match color {
            NamedColor::Black => AnsiColors::Black,
            NamedColor::Red => AnsiColors::Red,
            NamedColor::Green => AnsiColors::Green,
            NamedColor::Yellow => AnsiColors::Yellow,
            NamedColor::Blue => AnsiColors::Blue,
            NamedColor::Magenta => AnsiColors::Magenta,
            NamedColor::Cyan => AnsiColors::Cyan,
            NamedColor::White => AnsiColors::White,
            NamedColor::BrightBlack => AnsiColors::BrightBlack,
            NamedColor::BrightRed => AnsiColors::BrightRed,
            NamedColor::BrightGreen => AnsiColors::BrightGreen,
            NamedColor::BrightYellow => AnsiColors::BrightYellow,
            NamedColor::BrightBlue => AnsiColors::BrightBlue,
            NamedColor::BrightMagenta => AnsiColors::BrightMagenta,
            NamedColor::BrightCyan => AnsiColors::BrightCyan,
            NamedColor::BrightWhite => AnsiColors::BrightWhite,
        }
    }
}

/// Hue in degrees, saturation and lightness in percent
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    /// Convert to 8-bit RGB, clamping out-of-range components
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);

        if s == 0.0 {
            let v = to_byte(l);
            return (v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        (
            to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
            to_byte(hue_to_channel(p, q, h)),
            to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
        )
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Display color for one level
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelColor {
    Named(NamedColor),
    Hsl(Hsl),
}

impl LevelColor {
    /// Wrap `text` in the ANSI escape sequence for this color
    pub fn paint(&self, text: &str) -> String {
        match *self {
            LevelColor::Named(named) => text.color(AnsiColors::from(named)).to_string(),
            LevelColor::Hsl(hsl) => {
                let (r, g, b) = hsl.to_rgb();
                text.truecolor(r, g, b).to_string()
            }
        }
    }
}

/// Level to color mapping held by each logger
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    pub verbose: LevelColor,
    pub info: LevelColor,
    pub warning: LevelColor,
    pub error: LevelColor,
}

impl Default for ColorMap {
    fn default() -> Self {
        DEFAULT_PALETTE.clone()
    }
}

impl ColorMap {
    pub fn get(&self, level: Level) -> LevelColor {
        match level {
            Level::Verbose => self.verbose,
            Level::Info => self.info,
            Level::Warning => self.warning,
            Level::Error => self.error,
        }
    }

    /// Default palette with the given levels replaced
    pub fn with_overrides(overrides: &ColorOverrides) -> Self {
        let base = Self::default();
        Self {
            verbose: overrides.verbose.unwrap_or(base.verbose),
            info: overrides.info.unwrap_or(base.info),
            warning: overrides.warning.unwrap_or(base.warning),
            error: overrides.error.unwrap_or(base.error),
        }
    }
}

/// Partial color configuration; unset levels keep the default palette
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorOverrides {
    #[serde(default, alias = "debug", skip_serializing_if = "Option::is_none")]
    pub verbose: Option<LevelColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<LevelColor>,
    #[serde(default, alias = "warn", skip_serializing_if = "Option::is_none")]
    pub warning: Option<LevelColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LevelColor>,
}

/// Remove ANSI SGR escape sequences from `text`
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            // Parameters run until the final byte in '@'..='~'
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette() {
        let colors = ColorMap::default();
        assert_eq!(colors.get(Level::Error), LevelColor::Named(NamedColor::Red));
        assert_eq!(colors.get(Level::Warning), LevelColor::Named(NamedColor::Yellow));
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(Hsl::new(0.0, 100.0, 50.0).to_rgb(), (255, 0, 0));
        assert_eq!(Hsl::new(120.0, 100.0, 50.0).to_rgb(), (0, 255, 0));
        assert_eq!(Hsl::new(240.0, 100.0, 50.0).to_rgb(), (0, 0, 255));
        assert_eq!(Hsl::new(0.0, 0.0, 100.0).to_rgb(), (255, 255, 255));
        // Hue wraps, lightness clamps
        assert_eq!(Hsl::new(360.0, 100.0, 150.0).to_rgb(), (255, 255, 255));
    }

    #[test]
    fn test_paint_and_strip() {
        for color in [
            LevelColor::Named(NamedColor::Cyan),
            LevelColor::Hsl(Hsl::new(200.0, 80.0, 40.0)),
        ] {
            let painted = color.paint("hello world");
            assert!(painted.contains('\u{1b}'));
            assert_eq!(strip_ansi(&painted), "hello world");
        }
    }

    #[test]
    fn test_overrides_from_toml() {
        let toml_str = r#"
info = "blue"
warn = "grey"
error = [0, 100, 50]
"#;
        let overrides: ColorOverrides = toml::from_str(toml_str).unwrap();
        let colors = ColorMap::with_overrides(&overrides);

        assert_eq!(colors.info, LevelColor::Named(NamedColor::Blue));
        assert_eq!(colors.warning, LevelColor::Named(NamedColor::BrightBlack));
        assert_eq!(colors.error, LevelColor::Hsl(Hsl::new(0.0, 100.0, 50.0)));
        // Untouched level keeps the default
        assert_eq!(colors.verbose, ColorMap::default().verbose);
    }
}
