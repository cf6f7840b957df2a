use strsim::normalized_levenshtein;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds text to lowercase ASCII so that "Fløyte", "Floyte" and "FLØYTE"
/// compare equal.
pub fn fold_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_ascii() {
            out.push(c.to_ascii_lowercase());
            continue;
        }
        // letters NFKD leaves alone
        let replacement = match c {
            'ø' | 'Ø' => "o",
            'æ' | 'Æ' => "ae",
            'œ' | 'Œ' => "oe",
            'ß' => "ss",
            'đ' | 'Đ' | 'ð' | 'Ð' => "d",
            'ł' | 'Ł' => "l",
            'þ' | 'Þ' => "th",
            'ı' => "i",
            _ => "",
        };
        out.push_str(replacement);
    }
    out
}

/// Similarity in `[0, 1]` between two phrases after folding.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = fold_ascii(a);
    let b = fold_ascii(b);
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_diacritics_and_case() {
        assert_eq!(fold_ascii("Fløyte"), "floyte");
        assert_eq!(fold_ascii("Klarinétt"), "klarinett");
        assert_eq!(fold_ascii("TRÅKKHARPE"), "trakkharpe");
        assert_eq!(fold_ascii("Bassbasún"), "bassbasun");
    }

    #[test]
    fn folded_strings_compare_equal() {
        assert_eq!(text_similarity("Fløyte", "FLOYTE"), 1.0);
    }

    #[test]
    fn one_edit_in_ten_is_exactly_point_nine() {
        assert_eq!(text_similarity("abcdefghij", "abcdefghiX"), 0.9);
    }

    #[test]
    fn empty_never_matches() {
        assert_eq!(text_similarity("", ""), 0.0);
        assert_eq!(text_similarity("horn", ""), 0.0);
    }
}
