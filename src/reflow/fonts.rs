//! Standard 14 font selection and text encoding for re-rendered blocks.

use std::fmt;

use crate::util::{FontStyle, FontWeight};

/// The text faces of the PDF Standard 14 set.
///
/// These never need embedded font programs; a reader supplies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn is_monospace(self) -> bool {
        matches!(
            self,
            StandardFont::Courier
                | StandardFont::CourierBold
                | StandardFont::CourierOblique
                | StandardFont::CourierBoldOblique
        )
    }

    /// Average glyph width as a fraction of the font size.
    pub fn char_width_factor(self) -> f32 {
        if self.is_monospace() {
            0.6
        } else {
            0.55
        }
    }
}

impl fmt::Display for StandardFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_font())
    }
}

/// Map a block's font description onto a Standard 14 face.
///
/// Families mentioning mono, courier or code map to Courier, serif or times
/// to Times, everything else to Helvetica.
pub fn select_font(family: &str, weight: FontWeight, style: FontStyle) -> StandardFont {
    let family = family.to_lowercase();
    let bold = weight.is_bold();
    let italic = style == FontStyle::Italic;

    if ["mono", "courier", "code"].iter().any(|k| family.contains(k)) {
        match (bold, italic) {
            (true, true) => StandardFont::CourierBoldOblique,
            (true, false) => StandardFont::CourierBold,
            (false, true) => StandardFont::CourierOblique,
            (false, false) => StandardFont::Courier,
        }
    } else if family.contains("times") || (family.contains("serif") && !family.contains("sans")) {
        match (bold, italic) {
            (true, true) => StandardFont::TimesBoldItalic,
            (true, false) => StandardFont::TimesBold,
            (false, true) => StandardFont::TimesItalic,
            (false, false) => StandardFont::TimesRoman,
        }
    } else {
        match (bold, italic) {
            (true, true) => StandardFont::HelveticaBoldOblique,
            (true, false) => StandardFont::HelveticaBold,
            (false, true) => StandardFont::HelveticaOblique,
            (false, false) => StandardFont::Helvetica,
        }
    }
}

/// Encode text as WinAnsi (CP1252) bytes for a Standard 14 font.
///
/// Characters outside the encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}
