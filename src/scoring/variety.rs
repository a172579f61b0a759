use serde::Serialize;

pub const MAX_VARIETY_TOP_N: usize = 100;

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct VarietyScore {
    /// 0 (one artist only) to 100 (plays spread evenly).
    pub score: f64,
    /// Shannon entropy in nats.
    pub entropy: f64,
    pub artists_considered: usize,
}

/// Normalized Shannon entropy over the `top_n` largest play counts.
///
/// Entropy is divided by `ln(k)` where `k` is the number of artists actually
/// considered, the maximum entropy for that many categories.
pub fn variety_score(play_counts: &[i64], top_n: usize) -> VarietyScore {
    let top_n = top_n.clamp(1, MAX_VARIETY_TOP_N);
    let mut counts: Vec<i64> = play_counts.iter().copied().filter(|c| *c > 0).collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    counts.truncate(top_n);

    let k = counts.len();
    let total: i64 = counts.iter().sum();
    if k <= 1 || total == 0 {
        return VarietyScore {
            score: 0.0,
            entropy: 0.0,
            artists_considered: k,
        };
    }

    let entropy: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    let score = (entropy / (k as f64).ln() * 100.0).clamp(0.0, 100.0);

    VarietyScore {
        score,
        entropy,
        artists_considered: k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_artist_scores_zero() {
        let v = variety_score(&[250], 100);
        assert_eq!(v.score, 0.0);
        assert_eq!(v.artists_considered, 1);
        assert_eq!(variety_score(&[], 100).score, 0.0);
    }

    #[test]
    fn test_even_spread_scores_hundred() {
        let v = variety_score(&[7; 40], 100);
        assert!((v.score - 100.0).abs() < 1e-9);
        assert_eq!(v.artists_considered, 40);
    }

    #[test]
    fn test_dominant_artist_scores_low() {
        let mut counts = vec![1000];
        counts.extend([1; 9]);
        let v = variety_score(&counts, 100);
        assert!(v.score > 0.0 && v.score < 20.0, "score {}", v.score);
    }

    #[test]
    fn test_only_top_n_considered() {
        let mut counts = vec![10; 5];
        counts.extend([1; 500]);
        let v = variety_score(&counts, 5);
        assert_eq!(v.artists_considered, 5);
        assert!((v.score - 100.0).abs() < 1e-9);

        // top_n is capped
        assert_eq!(variety_score(&counts, 10_000).artists_considered, 100);
    }

    #[test]
    fn test_score_always_in_range() {
        let inputs: [&[i64]; 5] = [&[1, 2], &[0, 0, 3], &[i64::MAX / 4, 1], &[5, 5, 5, 1], &[-3, 4]];
        for counts in inputs {
            let v = variety_score(counts, 100);
            assert!((0.0..=100.0).contains(&v.score), "{:?} -> {}", counts, v.score);
        }
    }
}
