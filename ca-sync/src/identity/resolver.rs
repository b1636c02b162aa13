//! Stable teacher ids and the "same teacher" relation
//!
//! Similarity is raw substring containment on strict keys, so truncated and
//! expanded spellings of one person ("AQUILES SANTOS" vs "AQUILES SANTOS
//! ANTONY SILVA") collapse together. There is no minimum length: a short key
//! that happens to be contained in an unrelated longer name will match too.

use super::normalize::{normalize, strict_normalize};

/// Prefix of every derived teacher id
pub const TEACHER_ID_PREFIX: &str = "t-";

/// `"t-" + strict_normalize(name)`
///
/// Stable across whitespace, case and accent variants of the same name.
pub fn derive_id(name: &str) -> String {
    format!("{}{}", TEACHER_ID_PREFIX, strict_normalize(name))
}

/// Id for a newly minted teacher record
///
/// [`derive_id`] when the name has a strict key. Names with no `[A-Z0-9]`
/// character ("李明", "---") key on their normalized text minus whitespace,
/// so distinct names of that kind never share the bare `t-` id.
pub fn mint_id(name: &str) -> String {
    let key = strict_normalize(name);
    if !key.is_empty() {
        return format!("{}{}", TEACHER_ID_PREFIX, key);
    }
    let fallback: String = normalize(name).chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}{}", TEACHER_ID_PREFIX, fallback)
}

/// Whether two free-text names denote the same teacher
///
/// False when either strict key is empty; otherwise true when the keys are
/// equal or one contains the other.
pub fn similar(name_a: &str, name_b: &str) -> bool {
    let a = strict_normalize(name_a);
    let b = strict_normalize(name_b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}
