use sha2::{Digest, Sha256};

/// Stable key of an (artist, title) pair: SHA-256 hex of `"artist|title"`, both
/// lower-cased and trimmed.
///
/// Persisted as the archive's unique key and the track identity key, so the
/// normalization here must never change.
pub fn track_hash(artist: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(artist.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(title.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(
            track_hash("Daft Punk", "One More Time"),
            "3b875567370c54066fe054436dd7cadbc9facb38cfa93d9a4fcbcfcb8afb1bf2"
        );
    }

    #[test]
    fn test_hash_ignores_case_and_outer_whitespace() {
        assert_eq!(
            track_hash("  DAFT PUNK", "one more time "),
            track_hash("Daft Punk", "One More Time")
        );
        assert_ne!(
            track_hash("Daft Punk", "One More Time"),
            track_hash("Daft Punk", "Aerodynamic")
        );
    }
}
