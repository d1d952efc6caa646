//! Letter comparison between recognized text and the expected letter.
//!
//! Scoring is tiered rather than edit-distance based: a learner who wrote ش
//! when asked for س attempted the right shape family, which matters more to
//! grading than how many code points differ.

use crate::diacritics::{is_diacritic, TATWEEL};

pub const EXACT_MATCH_SCORE: f32 = 1.0;
pub const BASE_LETTER_SCORE: f32 = 0.9;
pub const CONFUSABLE_SCORE: f32 = 0.7;

/// Letters that share a skeleton and differ only by dots (or are commonly
/// swapped by recognizers).
const CONFUSABLE_GROUPS: &[&[char]] = &[
    &['ب', 'ت', 'ث', 'ن', 'ي'],
    &['ج', 'ح', 'خ'],
    &['د', 'ذ'],
    &['ر', 'ز'],
    &['س', 'ش'],
    &['ص', 'ض'],
    &['ط', 'ظ'],
    &['ع', 'غ'],
    &['ف', 'ق'],
];

// Presentation Forms-B, U+FE80..=U+FEF4: each letter followed by the number
// of contextual forms it occupies (isolated, final, initial, medial).
const PRESENTATION_FORMS: &[(char, u32)] = &[
    ('ء', 1), ('آ', 2), ('أ', 2), ('ؤ', 2), ('إ', 2), ('ئ', 4), ('ا', 2),
    ('ب', 4), ('ة', 2), ('ت', 4), ('ث', 4), ('ج', 4), ('ح', 4), ('خ', 4),
    ('د', 2), ('ذ', 2), ('ر', 2), ('ز', 2), ('س', 4), ('ش', 4), ('ص', 4),
    ('ض', 4), ('ط', 4), ('ظ', 4), ('ع', 4), ('غ', 4), ('ف', 4), ('ق', 4),
    ('ك', 4), ('ل', 4), ('م', 4), ('ن', 4), ('ه', 4), ('و', 2), ('ى', 2),
    ('ي', 4),
];

const PRESENTATION_FORMS_START: u32 = 0xFE80;

/// Remove harakat, tanwin, superscript alef and tatweel.
pub fn strip_diacritics(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_diacritic(c) && c != TATWEEL)
        .collect()
}

/// Map a contextual glyph code point to its nominal letter.
fn fold_presentation_form(ch: char) -> char {
    let cp = ch as u32;
    if cp < PRESENTATION_FORMS_START {
        return ch;
    }
    let mut offset = cp - PRESENTATION_FORMS_START;
    for &(letter, forms) in PRESENTATION_FORMS {
        if offset < forms {
            return letter;
        }
        offset -= forms;
    }
    ch
}

/// Strip diacritics and whitespace, and fold presentation forms.
pub fn normalize_letters(text: &str) -> String {
    strip_diacritics(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(fold_presentation_form)
        .collect()
}

/// Collapse letter-shape variants onto one canonical letter.
pub fn base_letter(ch: char) -> char {
    match ch {
        'آ' | 'أ' | 'إ' | 'ٱ' => 'ا',
        'ى' | 'ئ' => 'ي',
        'ؤ' => 'و',
        'ة' => 'ه',
        other => other,
    }
}

fn base_form(text: &str) -> String {
    text.chars().map(base_letter).collect()
}

fn confusable_group(ch: char) -> Option<usize> {
    CONFUSABLE_GROUPS.iter().position(|group| group.contains(&ch))
}

pub fn are_confusable(a: char, b: char) -> bool {
    match (confusable_group(a), confusable_group(b)) {
        (Some(ga), Some(gb)) => ga == gb,
        _ => false,
    }
}

/// Score how well `recognized` matches `expected`, in `[0, 1]`.
pub fn compare_letters(recognized: Option<&str>, expected: &str) -> f32 {
    let Some(recognized) = recognized else {
        return 0.0;
    };

    let recognized = normalize_letters(recognized);
    let expected = normalize_letters(expected);
    if recognized.is_empty() || expected.is_empty() {
        return 0.0;
    }

    if recognized.contains(expected.as_str()) || expected.contains(recognized.as_str()) {
        return EXACT_MATCH_SCORE;
    }

    let recognized = base_form(&recognized);
    let expected = base_form(&expected);
    if recognized == expected {
        return BASE_LETTER_SCORE;
    }

    if recognized.chars().count() == expected.chars().count()
        && recognized
            .chars()
            .zip(expected.chars())
            .all(|(r, e)| r == e || are_confusable(r, e))
    {
        return CONFUSABLE_SCORE;
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_empty_recognition_scores_zero() {
        assert_eq!(compare_letters(None, "ب"), 0.0);
        assert_eq!(compare_letters(Some(""), "ب"), 0.0);
        assert_eq!(compare_letters(Some("  "), "ب"), 0.0);
        // only marks, nothing left after stripping
        assert_eq!(compare_letters(Some("\u{064E}"), "ب"), 0.0);
        assert_eq!(compare_letters(Some("ب"), ""), 0.0);
    }

    #[test]
    fn test_exact_and_contained_match() {
        assert_eq!(compare_letters(Some("ب"), "ب"), 1.0);
        assert_eq!(compare_letters(Some("بَ"), "ب"), 1.0);
        assert_eq!(compare_letters(Some("ب"), "بِّ"), 1.0);
        assert_eq!(compare_letters(Some("باب"), "ب"), 1.0);
        assert_eq!(compare_letters(Some("ب"), "بـ"), 1.0);
    }

    #[test]
    fn test_presentation_forms_fold_to_letters() {
        // initial beh, medial seen, final yeh
        assert_eq!(compare_letters(Some("\u{FE91}"), "ب"), 1.0);
        assert_eq!(compare_letters(Some("\u{FEB4}"), "س"), 1.0);
        assert_eq!(compare_letters(Some("\u{FEF2}"), "ي"), 1.0);
        assert_eq!(normalize_letters("\u{FE80}\u{FE8D}\u{FEF4}"), "ءاي");
        // lam-alef ligature is outside the folded range
        assert_eq!(normalize_letters("\u{FEFB}"), "\u{FEFB}");
    }

    #[test]
    fn test_base_letter_match() {
        assert_eq!(compare_letters(Some("أ"), "ا"), 0.9);
        assert_eq!(compare_letters(Some("إ"), "آ"), 0.9);
        assert_eq!(compare_letters(Some("ة"), "ه"), 0.9);
        assert_eq!(compare_letters(Some("ى"), "ي"), 0.9);
    }

    #[test]
    fn test_confusable_groups() {
        assert_eq!(compare_letters(Some("س"), "ش"), 0.7);
        assert_eq!(compare_letters(Some("ت"), "ن"), 0.7);
        assert_eq!(compare_letters(Some("خ"), "ج"), 0.7);
        // ئ collapses to ي, which shares the beh skeleton
        assert_eq!(compare_letters(Some("ئ"), "ب"), 0.7);
        assert_eq!(compare_letters(Some("سب"), "شت"), 0.7);
    }

    #[test]
    fn test_unrelated_letters() {
        assert_eq!(compare_letters(Some("س"), "م"), 0.0);
        assert_eq!(compare_letters(Some("د"), "ر"), 0.0);
        assert_eq!(compare_letters(Some("سب"), "ش"), 0.0);
        assert!(!are_confusable('ل', 'ك'));
    }

    #[test]
    fn test_strip_diacritics_idempotent() {
        let plain = "كتاب";
        assert_eq!(strip_diacritics(plain), plain);

        let marked = "كِتَابٌ ـمُّ";
        let once = strip_diacritics(marked);
        assert_eq!(once, "كتاب م");
        assert_eq!(strip_diacritics(&once), once);
    }
}
