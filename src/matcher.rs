//! Case and punctuation insensitive label matching.
//!
//! Matching is a plain substring test in either direction on normalized text.
//! There is no scoring: the first candidate that matches wins, so the order of
//! every catalog passed to [`find_matching_label`] is significant.

pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn fuzzy_match(observed: &str, canonical: &str) -> bool {
    let observed = normalize_label(observed);
    let canonical = normalize_label(canonical);

    if observed.is_empty() || canonical.is_empty() {
        return false;
    }

    observed.contains(&canonical) || canonical.contains(&observed)
}

pub fn find_matching_label<'a>(observed: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|candidate| fuzzy_match(observed, candidate))
}

/// True when the normalized label contains any of the normalized fragments.
pub(crate) fn contains_any(label: &str, fragments: &[&str]) -> bool {
    let label = normalize_label(label);
    fragments
        .iter()
        .any(|fragment| label.contains(&normalize_label(fragment)))
}
