// Section key normalization.
//
// Keys: lowercase, runs of non-alphanumerics collapse to a single `_`,
// no leading or trailing separators.

/// Normalize a loosely written section identifier into alias-table form.
///
/// Returns an empty string if the input has no ASCII alphanumerics.
pub fn normalize_key(raw: &str) -> String {
    let lowered: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();

    lowered.split('_').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("_")
}
