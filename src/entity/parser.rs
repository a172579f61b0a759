//! Splits captured artist strings into individual credited names.
//!
//! Players report multi-artist tracks in many shapes:
//!
//! ```text
//! "A & B"                 -> primary [A, B]
//! "A feat. C"             -> primary [A], featured [C]
//! "A, B ft. C & D"        -> primary [A, B], featured [C, D]
//! "A - Song (with C)"     -> featured [C] is pulled out of the bracket
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use super::normalize::{clean_display_name, is_placeholder, normalize_name};

lazy_static! {
    static ref BRACKETED_FEATURE: Regex =
        Regex::new(r"(?i)[\(\[]\s*(?:feat\.?|ft\.?|featuring|with)\s+([^\)\]]+)[\)\]]")
            .expect("Failed to compile bracketed feature regex");
    static ref FEATURE_CONNECTOR: Regex =
        Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring|with)\s+")
            .expect("Failed to compile feature connector regex");
    static ref PRIMARY_SEPARATOR: Regex =
        Regex::new(r"(?i)\s*(?:,|&|;|(?-i:\s+x\s+)|\s+vs\.?\s+)\s*")
            .expect("Failed to compile primary separator regex");
}

/// Display names credited on a track, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCredits {
    pub primary: Vec<String>,
    pub featured: Vec<String>,
}

impl ParsedCredits {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.featured.is_empty()
    }

    /// Primary names first, then featured, in credit order.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.primary.iter().chain(self.featured.iter())
    }
}

/// Parse a raw artist string into primary and featured names.
///
/// Blank and placeholder segments are dropped. A name credited twice keeps its first
/// position, and a primary credit wins over a featured one.
pub fn parse_artist_credits(raw: &str) -> ParsedCredits {
    let mut featured_chunks: Vec<String> = Vec::new();

    let without_brackets = BRACKETED_FEATURE
        .replace_all(raw, |caps: &regex::Captures| {
            featured_chunks.push(caps[1].to_string());
            ""
        })
        .to_string();

    let mut parts = FEATURE_CONNECTOR.splitn(&without_brackets, 2);
    let primary_chunk = parts.next().unwrap_or_default().to_string();
    if let Some(rest) = parts.next() {
        // "A feat. B with C" credits both B and C as featured.
        featured_chunks.insert(0, FEATURE_CONNECTOR.replace_all(rest, ",").to_string());
    }

    let mut seen = HashSet::new();
    let primary = split_names(&primary_chunk, &mut seen);
    let featured = featured_chunks
        .iter()
        .flat_map(|chunk| split_names(chunk, &mut seen))
        .collect();

    ParsedCredits { primary, featured }
}

fn split_names(chunk: &str, seen: &mut HashSet<String>) -> Vec<String> {
    PRIMARY_SEPARATOR
        .split(chunk)
        .map(clean_display_name)
        .filter(|name| !is_placeholder(name))
        .filter(|name| seen.insert(normalize_name(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_artist() {
        let parsed = parse_artist_credits("Radiohead");
        assert_eq!(parsed.primary, names(&["Radiohead"]));
        assert!(parsed.featured.is_empty());
    }

    #[test]
    fn test_duet_with_ampersand_and_comma() {
        let parsed = parse_artist_credits("Simon & Garfunkel, Paul Simon");
        assert_eq!(parsed.primary, names(&["Simon", "Garfunkel", "Paul Simon"]));
    }

    #[test]
    fn test_featured_connectors() {
        let parsed = parse_artist_credits("Calvin Harris feat. Rihanna");
        assert_eq!(parsed.primary, names(&["Calvin Harris"]));
        assert_eq!(parsed.featured, names(&["Rihanna"]));

        let parsed = parse_artist_credits("A, B ft. C & D");
        assert_eq!(parsed.primary, names(&["A", "B"]));
        assert_eq!(parsed.featured, names(&["C", "D"]));

        let parsed = parse_artist_credits("Main Artist with Guest");
        assert_eq!(parsed.primary, names(&["Main Artist"]));
        assert_eq!(parsed.featured, names(&["Guest"]));
    }

    #[test]
    fn test_bracketed_feature() {
        let parsed = parse_artist_credits("Mark Ronson (feat. Bruno Mars)");
        assert_eq!(parsed.primary, names(&["Mark Ronson"]));
        assert_eq!(parsed.featured, names(&["Bruno Mars"]));
    }

    #[test]
    fn test_placeholders_and_blanks_are_dropped() {
        assert!(parse_artist_credits("").is_empty());
        assert!(parse_artist_credits("  Unknown Artist ").is_empty());
        let parsed = parse_artist_credits("Unknown Artist, Moby");
        assert_eq!(parsed.primary, names(&["Moby"]));
    }

    #[test]
    fn test_duplicates_keep_first_credit() {
        let parsed = parse_artist_credits("Drake & drake feat. DRAKE, Future");
        assert_eq!(parsed.primary, names(&["Drake"]));
        assert_eq!(parsed.featured, names(&["Future"]));
    }

    #[test]
    fn test_names_containing_connector_words_survive() {
        let parsed = parse_artist_credits("Florence + The Machine");
        assert_eq!(parsed.primary, names(&["Florence + The Machine"]));

        // Only a lowercase "x" joins collaborators.
        let parsed = parse_artist_credits("Artist X - Topic");
        assert_eq!(parsed.primary, names(&["Artist X - Topic"]));
        let parsed = parse_artist_credits("Skrillex x Diplo");
        assert_eq!(parsed.primary, names(&["Skrillex", "Diplo"]));
    }
}
