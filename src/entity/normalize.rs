//! Name normalization shared by artist identities, track keys and the archive hash.

/// Names that carry no identity. Segments normalizing to one of these are dropped.
const PLACEHOLDER_NAMES: &[&str] = &[
    "unknown artist",
    "unknown",
    "<unknown>",
    "[unknown]",
    "artist unknown",
    "n/a",
    "-",
];

/// Case-fold, trim and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True for blank strings and the well known "no artist" placeholders.
pub fn is_placeholder(name: &str) -> bool {
    let normalized = normalize_name(name);
    normalized.is_empty() || PLACEHOLDER_NAMES.contains(&normalized.as_str())
}

/// Tidy a display name without changing its case.
pub fn clean_display_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_and_whitespace() {
        assert_eq!(normalize_name("  Daft   PUNK "), "daft punk");
        assert_eq!(normalize_name("Björk"), "björk");
    }

    #[test]
    fn test_placeholders() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("   "));
        assert!(is_placeholder("Unknown Artist"));
        assert!(is_placeholder("<unknown>"));
        assert!(!is_placeholder("Unknown Mortal Orchestra"));
    }
}
