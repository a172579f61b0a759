//! Ranking and paging of aggregate rows.

use serde::{Deserialize, Serialize};

const BLEND_PLAYS_WEIGHT: f64 = 0.6;
const BLEND_TIME_WEIGHT: f64 = 0.4;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Plays,
    Time,
    /// Weighted mix of play count and listening time, each relative to the leader.
    Blended,
}

impl SortBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plays" | "count" => Some(SortBy::Plays),
            "time" | "duration" => Some(SortBy::Time),
            "blended" | "score" => Some(SortBy::Blended),
            _ => None,
        }
    }
}

/// Anything with play totals.
pub trait Rankable {
    fn play_count(&self) -> i64;
    fn total_ms(&self) -> i64;
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    /// 1-based position in the full ranking.
    pub rank: usize,
    pub score: f64,
    #[serde(flatten)]
    pub item: T,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RankedPage<T> {
    pub items: Vec<Ranked<T>>,
    /// Size of the full ranking before paging.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Sort `items` by `sort`, highest first. Ties keep their input order.
pub fn rank<T: Rankable>(items: Vec<T>, sort: SortBy) -> Vec<Ranked<T>> {
    let max_plays = items.iter().map(|i| i.play_count()).max().unwrap_or(0).max(0);
    let max_ms = items.iter().map(|i| i.total_ms()).max().unwrap_or(0).max(0);
    let ratio = |value: i64, max: i64| {
        if max > 0 {
            value.max(0) as f64 / max as f64
        } else {
            0.0
        }
    };

    let mut scored: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| {
            let score = match sort {
                SortBy::Plays => item.play_count() as f64,
                SortBy::Time => item.total_ms() as f64,
                SortBy::Blended => {
                    BLEND_PLAYS_WEIGHT * ratio(item.play_count(), max_plays)
                        + BLEND_TIME_WEIGHT * ratio(item.total_ms(), max_ms)
                }
            };
            (score, item)
        })
        .collect();
    scored.sort_by(|(a, ia), (b, ib)| {
        b.total_cmp(a)
            .then_with(|| ib.play_count().cmp(&ia.play_count()))
            .then_with(|| ib.total_ms().cmp(&ia.total_ms()))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, item))| Ranked {
            rank: i + 1,
            score,
            item,
        })
        .collect()
}

pub fn paginate<T>(ranked: Vec<Ranked<T>>, offset: usize, limit: usize) -> RankedPage<T> {
    let limit = normalize_limit(limit);
    let total = ranked.len();
    let items = ranked.into_iter().skip(offset).take(limit).collect();
    RankedPage {
        items,
        total,
        offset,
        limit,
    }
}

pub fn normalize_limit(limit: usize) -> usize {
    if limit == 0 {
        DEFAULT_PAGE_LIMIT
    } else {
        limit.min(MAX_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(&'static str, i64, i64);

    impl Rankable for Row {
        fn play_count(&self) -> i64 {
            self.1
        }
        fn total_ms(&self) -> i64 {
            self.2
        }
    }

    fn rows() -> Vec<Row> {
        vec![Row("short", 10, 1_000), Row("long", 5, 10_000), Row("mid", 8, 6_000)]
    }

    fn names(ranked: &[Ranked<Row>]) -> Vec<&'static str> {
        ranked.iter().map(|r| r.item.0).collect()
    }

    #[test]
    fn test_sort_by_plays_and_time() {
        assert_eq!(names(&rank(rows(), SortBy::Plays)), vec!["short", "mid", "long"]);
        assert_eq!(names(&rank(rows(), SortBy::Time)), vec!["long", "mid", "short"]);
    }

    #[test]
    fn test_blended_score() {
        let ranked = rank(rows(), SortBy::Blended);
        // mid: 0.6*0.8 + 0.4*0.6 = 0.72, long: 0.3 + 0.4 = 0.70, short: 0.6 + 0.04 = 0.64
        assert_eq!(names(&ranked), vec!["mid", "long", "short"]);
        assert!((ranked[0].score - 0.72).abs() < 1e-9);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_ties_broken_by_plays_then_input_order() {
        let ranked = rank(
            vec![Row("a", 3, 100), Row("b", 7, 100), Row("c", 3, 100)],
            SortBy::Time,
        );
        assert_eq!(names(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_paginate() {
        let page = paginate(rank(rows(), SortBy::Plays), 1, 1);
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].rank, 2);

        let page = paginate(rank(rows(), SortBy::Plays), 5, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_blended_with_no_data() {
        let ranked = rank(vec![Row("silent", 0, 0)], SortBy::Blended);
        assert_eq!(ranked[0].score, 0.0);
    }
}
