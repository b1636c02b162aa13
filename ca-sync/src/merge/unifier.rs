//! Teacher unification
//!
//! Collapses teacher records gathered from several sources into one
//! canonical record per real person, plus a redirect map from every input id
//! to its canonical id.

use crate::identity::{mint_id, normalize, similar};
use ca_common::Teacher;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// old/duplicate teacher id → canonical teacher id
pub type Redirects = HashMap<String, String>;

/// Output of [`unify`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unification {
    /// Deduplicated teachers, sorted by display name
    pub canonical: Vec<Teacher>,
    /// Covers every input id with a non-blank name, self-mappings included
    pub redirect: Redirects,
}

/// Characters of the trimmed name; surrounding whitespace never ranks a record ahead
fn name_len(name: &str) -> usize {
    name.trim().chars().count()
}

/// Longest name first; stable, so equal lengths keep source order
fn longest_first(a: &&Teacher, b: &&Teacher) -> Ordering {
    name_len(&b.name).cmp(&name_len(&a.name))
}

/// Display order: accent/case-insensitive, raw name as tiebreak
pub fn compare_display_names(a: &str, b: &str) -> Ordering {
    normalize(a).cmp(&normalize(b)).then_with(|| a.cmp(b))
}

pub fn sort_by_display_name(teachers: &mut [Teacher]) {
    teachers.sort_by(|a, b| compare_display_names(&a.name, &b.name));
}

/// Deduplicate teacher records, minting derived ids for canonical entries
///
/// Records are visited longest name first; the first of a group of similar
/// names becomes the canonical entry (`id = mint_id(name)`, name upper-cased
/// and trimmed) and every later similar record, or one minting the same id,
/// redirects to it. Records with a blank name are skipped and get no
/// redirect entry.
///
/// Order-sensitive: callers pass sources in priority order.
pub fn unify(records: &[Teacher]) -> Unification {
    let mut ordered: Vec<&Teacher> = records.iter().collect();
    ordered.sort_by(longest_first);

    let mut canonical: Vec<Teacher> = Vec::new();
    let mut redirect = Redirects::new();

    for record in ordered {
        if record.name.trim().is_empty() {
            debug!(teacher_id = %record.id, "Skipping teacher record without a name");
            continue;
        }
        let normalized = normalize(&record.name);
        let id = mint_id(&normalized);

        if let Some(existing) = canonical
            .iter()
            .find(|c| c.id == id || similar(&c.name, &normalized))
        {
            redirect.insert(record.id.clone(), existing.id.clone());
            continue;
        }

        let minted = Teacher::new(id, record.name.to_uppercase().trim());
        redirect.insert(record.id.clone(), minted.id.clone());
        canonical.push(minted);
    }

    sort_by_display_name(&mut canonical);

    debug!(
        input = records.len(),
        canonical = canonical.len(),
        "Teacher unification complete"
    );

    Unification {
        canonical,
        redirect,
    }
}

/// Fold mutually similar teachers together, keeping existing ids
///
/// Used on an already-canonical list that just gained new entries. Longest
/// name wins; the returned redirects cover only the folded-away ids.
pub fn collapse_similar(teachers: Vec<Teacher>) -> (Vec<Teacher>, Redirects) {
    let mut ordered: Vec<&Teacher> = teachers.iter().collect();
    ordered.sort_by(longest_first);

    let mut kept: Vec<Teacher> = Vec::new();
    let mut redirect = Redirects::new();

    for teacher in ordered {
        match kept.iter().find(|k| similar(&k.name, &teacher.name)) {
            Some(survivor) if survivor.id != teacher.id => {
                redirect.insert(teacher.id.clone(), survivor.id.clone());
            }
            Some(_) => {}
            None => kept.push(teacher.clone()),
        }
    }

    sort_by_display_name(&mut kept);
    (kept, redirect)
}
