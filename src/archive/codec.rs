//! Compressed play-timestamp blobs.
//!
//! Layout, version 1:
//!
//! ```text
//! [0x01] zlib( varint count | varint unit | zigzag varint base/unit | varint delta/unit ... )
//! ```
//!
//! Timestamps are sorted before encoding, duplicates are kept. `unit` is 1000 when
//! every timestamp is a whole second, else 1. This layout is persisted and must stay
//! bit-stable; a new layout needs a new version byte.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

pub const BLOB_VERSION: u8 = 1;

const SECOND_UNIT: u64 = 1000;

/// Upper bound on decoded entries, guards against hostile counts.
const MAX_DECODED: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum ArchiveCodecError {
    #[error("Blob is empty")]
    Empty,
    #[error("Unsupported blob version {0}")]
    UnsupportedVersion(u8),
    #[error("Compression failed: {0}")]
    Deflate(#[source] std::io::Error),
    #[error("Decompression failed: {0}")]
    Inflate(#[source] std::io::Error),
    #[error("Truncated varint at byte {0}")]
    TruncatedVarint(usize),
    #[error("Invalid time unit {0}")]
    InvalidUnit(u64),
    #[error("Blob declares {expected} timestamps but holds {actual}")]
    CountMismatch { expected: u64, actual: u64 },
    #[error("{0} trailing bytes after last timestamp")]
    TrailingBytes(usize),
}

pub fn encode(timestamps: &[i64]) -> Result<Vec<u8>, ArchiveCodecError> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let unit = if sorted.iter().all(|t| t % SECOND_UNIT as i64 == 0) {
        SECOND_UNIT
    } else {
        1
    };

    let mut payload = Vec::with_capacity(sorted.len() * 3 + 12);
    write_varint(&mut payload, sorted.len() as u64);
    write_varint(&mut payload, unit);
    if let Some(&base) = sorted.first() {
        write_varint(&mut payload, zigzag(base / unit as i64));
        for pair in sorted.windows(2) {
            // Sorted, so the difference is non-negative and fits in u64.
            let delta = pair[1].wrapping_sub(pair[0]) as u64;
            write_varint(&mut payload, delta / unit);
        }
    }

    let mut encoder = ZlibEncoder::new(vec![BLOB_VERSION], Compression::best());
    encoder
        .write_all(&payload)
        .map_err(ArchiveCodecError::Deflate)?;
    encoder.finish().map_err(ArchiveCodecError::Deflate)
}

/// Exact inverse of [`encode`]: returns the timestamps sorted ascending.
pub fn decode(blob: &[u8]) -> Result<Vec<i64>, ArchiveCodecError> {
    let (&version, compressed) = blob.split_first().ok_or(ArchiveCodecError::Empty)?;
    if version != BLOB_VERSION {
        return Err(ArchiveCodecError::UnsupportedVersion(version));
    }

    let mut payload = Vec::new();
    ZlibDecoder::new(compressed)
        .read_to_end(&mut payload)
        .map_err(ArchiveCodecError::Inflate)?;

    let mut pos = 0;
    let count = read_varint(&payload, &mut pos)?;
    let unit = read_varint(&payload, &mut pos)?;
    if unit != 1 && unit != SECOND_UNIT {
        return Err(ArchiveCodecError::InvalidUnit(unit));
    }
    if count > MAX_DECODED {
        return Err(ArchiveCodecError::CountMismatch {
            expected: count,
            actual: 0,
        });
    }

    let mut timestamps = Vec::with_capacity(count as usize);
    if count > 0 {
        let mut current = unzigzag(read_varint(&payload, &mut pos)?).wrapping_mul(unit as i64);
        timestamps.push(current);
        while pos < payload.len() && (timestamps.len() as u64) < count {
            let delta = read_varint(&payload, &mut pos)?.wrapping_mul(unit);
            current = current.wrapping_add(delta as i64);
            timestamps.push(current);
        }
    }

    if timestamps.len() as u64 != count {
        return Err(ArchiveCodecError::CountMismatch {
            expected: count,
            actual: timestamps.len() as u64,
        });
    }
    if pos != payload.len() {
        return Err(ArchiveCodecError::TrailingBytes(payload.len() - pos));
    }
    Ok(timestamps)
}

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64, ArchiveCodecError> {
    let start = *pos;
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or(ArchiveCodecError::TruncatedVarint(start))?;
        *pos += 1;
        if shift >= 64 {
            return Err(ArchiveCodecError::TruncatedVarint(start));
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plays at second resolution, 0 to 3 days apart, from a fixed-seed generator.
    fn realistic_history(n: usize) -> Vec<i64> {
        let mut state: u64 = 42;
        let mut t: i64 = 1_600_000_000_000;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            t += ((state >> 33) % (3 * 86_400)) as i64 * 1000;
            out.push(t);
        }
        out
    }

    #[test]
    fn test_round_trip_preserves_set_and_bounds() {
        let original = vec![1_700_000_300_123, 1_700_000_000_000, 1_700_000_000_000, 5];
        let decoded = decode(&encode(&original).unwrap()).unwrap();

        let mut expected = original.clone();
        expected.sort();
        assert_eq!(decoded, expected);
        assert_eq!(decoded.first(), Some(&5));
        assert_eq!(decoded.last(), Some(&1_700_000_300_123));
    }

    #[test]
    fn test_round_trip_extremes() {
        for original in [
            vec![0],
            vec![-86_400_000, 0, 86_400_000],
            vec![i64::MIN, i64::MAX],
            vec![i64::MAX - 1, i64::MAX],
        ] {
            assert_eq!(decode(&encode(&original).unwrap()).unwrap(), original);
        }
    }

    #[test]
    fn test_empty_round_trip() {
        assert!(decode(&encode(&[]).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_blob_is_much_smaller_than_raw_timestamps() {
        let history = realistic_history(200);
        let blob = encode(&history).unwrap();
        let raw = history.len() * 8;
        assert!(
            blob.len() * 100 < raw * 45,
            "blob {} bytes vs raw {}",
            blob.len(),
            raw
        );
        assert_eq!(decode(&blob).unwrap(), history);
    }

    #[test]
    fn test_corrupt_blobs_are_rejected() {
        assert!(matches!(decode(&[]), Err(ArchiveCodecError::Empty)));
        assert!(matches!(
            decode(&[9, 1, 2, 3]),
            Err(ArchiveCodecError::UnsupportedVersion(9))
        ));
        assert!(matches!(
            decode(&[BLOB_VERSION, 0xde, 0xad, 0xbe, 0xef]),
            Err(ArchiveCodecError::Inflate(_))
        ));

        // Version byte and zlib header only.
        let mut blob = encode(&[1000, 2000, 3000]).unwrap();
        blob.truncate(3);
        assert!(decode(&blob).is_err());
    }

    #[test]
    fn test_zigzag() {
        for v in [0, 1, -1, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(v)), v);
        }
    }
}
