//! Name normalization
//!
//! `normalize` folds accents and case so that "André" and "ANDRE" compare
//! equal. `strict_normalize` additionally keeps only `[A-Z0-9]` and is the
//! basis for teacher ids and similarity.

use unicode_normalization::UnicodeNormalization;

/// Combining Diacritical Marks block
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

fn fold_marks(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonical comparison key: NFD, strip combining marks, upper-case, trim
///
/// Total over all strings; empty input yields an empty key. Marks are folded
/// again after upper-casing because some upper-case mappings reintroduce
/// combining characters, which would otherwise break idempotence.
pub fn normalize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let upper = fold_marks(name).to_uppercase();
    fold_marks(&upper).trim().to_string()
}

/// `normalize` followed by dropping every character outside `[A-Z0-9]`
pub fn strict_normalize(name: &str) -> String {
    normalize(name)
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}
