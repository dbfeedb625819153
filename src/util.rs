//! Geometry and typography helpers shared by the parser and the reflow engine.
//!
//! Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};

/// An RGB colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Create a colour, clamping each channel into `0.0..=1.0`.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    /// DeviceGray to RGB.
    pub fn from_gray(level: f32) -> Self {
        Self::new(level, level, level)
    }

    /// DeviceCMYK to RGB (naive, no colour profile).
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        let k = clamp_unit(k);
        Self::new(
            (1.0 - clamp_unit(c)) * (1.0 - k),
            (1.0 - clamp_unit(m)) * (1.0 - k),
            (1.0 - clamp_unit(y)) * (1.0 - k),
        )
    }

    /// Parse `#rrggbb`, `rrggbb` or `#rgb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| {
            u8::from_str_radix(expanded.get(i..i + 2)?, 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Format as lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (clamp_unit(v) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// All channels above 0.9.
    pub fn is_near_white(&self) -> bool {
        self.r > 0.9 && self.g > 0.9 && self.b > 0.9
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// PDF points to layout pixels at the given render scale.
pub fn pt_to_px(pt: f32, scale: f32) -> f32 {
    pt * scale
}

/// Layout pixels back to PDF points at the given render scale.
pub fn px_to_pt(px: f32, scale: f32) -> f32 {
    if scale == 0.0 {
        px
    } else {
        px / scale
    }
}

/// Font weight as exposed in block styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Light,
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn is_bold(self) -> bool {
        self == FontWeight::Bold
    }
}

/// Font style as exposed in block styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Size above which a font without any weight marker is reported as bold.
pub const LARGE_FONT_BOLD_THRESHOLD: f32 = 16.0;

/// Whether the font name itself carries a bold marker.
pub fn has_bold_marker(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("bold") || lower.contains("heavy") || lower.contains("black")
}

/// Whether the font name carries a light marker.
pub fn has_light_marker(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("light") || lower.contains("thin")
}

/// Infer the presentational weight of a run.
///
/// Explicit name markers win. Without one, text larger than
/// [`LARGE_FONT_BOLD_THRESHOLD`] is reported as bold. The heading detector
/// does not use this inference; it only trusts [`has_bold_marker`].
pub fn infer_font_weight(font_name: &str, font_size: f32) -> FontWeight {
    if has_bold_marker(font_name) {
        FontWeight::Bold
    } else if has_light_marker(font_name) {
        FontWeight::Light
    } else if font_size > LARGE_FONT_BOLD_THRESHOLD {
        FontWeight::Bold
    } else {
        FontWeight::Normal
    }
}

/// Infer italic/oblique from the font name.
pub fn infer_font_style(font_name: &str) -> FontStyle {
    let lower = font_name.to_lowercase();
    if lower.contains("italic") || lower.contains("oblique") {
        FontStyle::Italic
    } else {
        FontStyle::Normal
    }
}

/// Family name of a PDF base font: subset tag and style suffix removed.
///
/// `ABCDEF+Helvetica-BoldOblique` → `Helvetica`, `TimesNewRomanPS,Bold` → `TimesNewRomanPS`.
pub fn font_family(font_name: &str) -> String {
    let name = match font_name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => font_name,
    };
    let family = name.split(['-', ',']).next().unwrap_or(name);
    family.trim().to_string()
}

/// Format a positive integer as a Roman numeral (lowercase). Zero yields an empty string.
pub fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, symbol) in TABLE {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}

/// Parse a Roman numeral (either case). Returns `None` for anything non-canonical.
pub fn from_roman(s: &str) -> Option<u32> {
    let lower = s.to_ascii_lowercase();
    if lower.is_empty() {
        return None;
    }
    let value = |c: char| match c {
        'i' => Some(1),
        'v' => Some(5),
        'x' => Some(10),
        'l' => Some(50),
        'c' => Some(100),
        'd' => Some(500),
        'm' => Some(1000),
        _ => None,
    };
    let digits: Vec<u32> = lower.chars().map(value).collect::<Option<_>>()?;
    let total = digits
        .iter()
        .enumerate()
        .fold(0i64, |acc, (i, &d)| match digits.get(i + 1) {
            Some(&next) if next > d => acc - d as i64,
            _ => acc + d as i64,
        });
    if total <= 0 {
        return None;
    }
    let total = total as u32;
    (to_roman(total) == lower).then_some(total)
}

/// Format a positive integer as a spreadsheet-style letter sequence: 1 → `a`, 26 → `z`, 27 → `aa`.
pub fn to_alpha(mut n: u32) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}

/// Inverse of [`to_alpha`] (either case).
pub fn from_alpha(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    s.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_lowercase();
        c.is_ascii_lowercase()
            .then(|| acc.checked_mul(26)?.checked_add((c as u8 - b'a' + 1) as u32))
            .flatten()
    })
}
