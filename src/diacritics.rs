//! Reference data for Arabic diacritical marks (harakat).
//!
//! The review screen lets a learner tap a mark on the reference glyph to read
//! what it does; this table backs that lookup. The same set of code points is
//! what the letter comparator strips before matching.

use serde::Serialize;

/// One combining mark and its learner-facing description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiacriticInfo {
    pub symbol: char,
    pub name_en: &'static str,
    pub name_ar: &'static str,
    pub explanation: &'static str,
}

/// Kashida, the elongation stroke. Not a mark, but carries no letter identity.
pub const TATWEEL: char = '\u{0640}';

static DIACRITICS: [DiacriticInfo; 9] = [
    DiacriticInfo {
        symbol: '\u{064E}',
        name_en: "Fatha",
        name_ar: "فَتْحَة",
        explanation: "A small diagonal stroke above the letter. Adds a short \"a\" sound.",
    },
    DiacriticInfo {
        symbol: '\u{064F}',
        name_en: "Damma",
        name_ar: "ضَمَّة",
        explanation: "A small waw-shaped curl above the letter. Adds a short \"u\" sound.",
    },
    DiacriticInfo {
        symbol: '\u{0650}',
        name_en: "Kasra",
        name_ar: "كَسْرَة",
        explanation: "A small diagonal stroke below the letter. Adds a short \"i\" sound.",
    },
    DiacriticInfo {
        symbol: '\u{0652}',
        name_en: "Sukun",
        name_ar: "سُكُون",
        explanation: "A small circle above the letter. The letter carries no vowel.",
    },
    DiacriticInfo {
        symbol: '\u{0651}',
        name_en: "Shadda",
        name_ar: "شَدَّة",
        explanation: "A small \"w\" shape above the letter. The consonant is doubled.",
    },
    DiacriticInfo {
        symbol: '\u{064B}',
        name_en: "Fathatan",
        name_ar: "تَنْوِين الفَتْح",
        explanation: "Two fatha strokes. Adds \"an\" at the end of an indefinite word.",
    },
    DiacriticInfo {
        symbol: '\u{064C}',
        name_en: "Dammatan",
        name_ar: "تَنْوِين الضَّم",
        explanation: "Two damma curls. Adds \"un\" at the end of an indefinite word.",
    },
    DiacriticInfo {
        symbol: '\u{064D}',
        name_en: "Kasratan",
        name_ar: "تَنْوِين الكَسْر",
        explanation: "Two kasra strokes. Adds \"in\" at the end of an indefinite word.",
    },
    DiacriticInfo {
        symbol: '\u{0670}',
        name_en: "Superscript Alef",
        name_ar: "أَلِف خَنْجَرِيَّة",
        explanation: "A small vertical stroke above the letter. Marks a long \"aa\" sound.",
    },
];

pub fn all() -> &'static [DiacriticInfo] {
    &DIACRITICS
}

pub fn lookup(symbol: char) -> Option<&'static DiacriticInfo> {
    DIACRITICS.iter().find(|d| d.symbol == symbol)
}

pub fn is_diacritic(ch: char) -> bool {
    lookup(ch).is_some()
}

/// Marks present in `text`, in order of first appearance.
pub fn diacritics_in(text: &str) -> Vec<&'static DiacriticInfo> {
    let mut found: Vec<&'static DiacriticInfo> = Vec::new();
    for ch in text.chars() {
        if let Some(info) = lookup(ch) {
            if !found.iter().any(|d| d.symbol == info.symbol) {
                found.push(info);
            }
        }
    }
    found
}
