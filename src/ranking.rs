// 🏆 Ranker - ordered growth leaderboards with deterministic tie-breaks
//
// - entities with an undefined metric cannot be compared; they are reported
//   in `insufficient_data` instead of being dropped silently
// - equal metrics are ordered by entity id (ascending), whatever the direction
// - a limit above the eligible count returns every eligible entity

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry<K> {
    pub id: K,
    pub metric: Option<f64>,
}

impl<K> RankEntry<K> {
    pub fn new(id: K, metric: Option<f64>) -> Self {
        RankEntry { id, metric }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<K> {
    /// 1-based position
    pub rank: usize,
    pub id: K,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking<K> {
    pub ranked: Vec<Ranked<K>>,
    /// Entities that could not be ranked, in id order
    pub insufficient_data: Vec<K>,
}

impl<K> Ranking<K> {
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

pub fn rank<K: Ord + Clone>(
    entities: &[RankEntry<K>],
    direction: RankDirection,
    limit: usize,
) -> Ranking<K> {
    let mut eligible: Vec<(&K, f64)> = Vec::new();
    let mut insufficient_data: Vec<K> = Vec::new();

    for entity in entities {
        match entity.metric {
            Some(value) if value.is_finite() => eligible.push((&entity.id, value)),
            _ => insufficient_data.push(entity.id.clone()),
        }
    }

    eligible.sort_by(|(id_a, a), (id_b, b)| {
        let by_value = match direction {
            RankDirection::Ascending => a.total_cmp(b),
            RankDirection::Descending => b.total_cmp(a),
        };
        match by_value {
            Ordering::Equal => id_a.cmp(id_b),
            other => other,
        }
    });
    insufficient_data.sort();

    let ranked = eligible
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (id, value))| Ranked {
            rank: i + 1,
            id: id.clone(),
            value,
        })
        .collect();

    Ranking {
        ranked,
        insufficient_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries(rows: &[(&str, Option<f64>)]) -> Vec<RankEntry<String>> {
        rows.iter()
            .map(|(id, metric)| RankEntry::new(id.to_string(), *metric))
            .collect()
    }

    fn ids(ranking: &Ranking<String>) -> Vec<&str> {
        ranking.ranked.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_descending_with_limit() {
        let input = entries(&[("a", Some(5.0)), ("b", Some(20.0)), ("c", Some(-3.0)), ("d", Some(12.0))]);
        let ranking = rank(&input, RankDirection::Descending, 2);

        assert_eq!(ids(&ranking), vec!["b", "d"]);
        assert_eq!(ranking.ranked[0].rank, 1);
        assert_eq!(ranking.ranked[1].value, 12.0);
    }

    #[test]
    fn test_ascending_gives_bottom_n() {
        let input = entries(&[("a", Some(5.0)), ("b", Some(20.0)), ("c", Some(-3.0))]);
        let ranking = rank(&input, RankDirection::Ascending, 2);
        assert_eq!(ids(&ranking), vec!["c", "a"]);
    }

    #[test]
    fn test_ties_are_broken_by_id() {
        let input = entries(&[("zeta", Some(10.0)), ("alpha", Some(10.0)), ("mid", Some(10.0))]);

        let desc = rank(&input, RankDirection::Descending, 10);
        assert_eq!(ids(&desc), vec!["alpha", "mid", "zeta"]);

        let asc = rank(&input, RankDirection::Ascending, 10);
        assert_eq!(ids(&asc), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_undefined_metrics_are_accounted_for() {
        let input = entries(&[("new", None), ("a", Some(1.0)), ("na", None)]);
        let ranking = rank(&input, RankDirection::Descending, 10);

        assert_eq!(ids(&ranking), vec!["a"]);
        assert_eq!(ranking.insufficient_data, vec!["na".to_string(), "new".to_string()]);
    }

    #[test]
    fn test_limit_above_count_returns_all_without_padding() {
        let input = entries(&[("a", Some(1.0)), ("b", Some(2.0))]);
        let ranking = rank(&input, RankDirection::Descending, 50);
        assert_eq!(ranking.ranked.len(), 2);

        let empty = rank::<String>(&[], RankDirection::Descending, 5);
        assert!(empty.is_empty());
        assert!(empty.insufficient_data.is_empty());
    }

    proptest! {
        #[test]
        fn prop_ranking_is_deterministic(
            rows in prop::collection::vec((0u8..20, prop::option::of(-50i32..50)), 0..30),
            limit in 0usize..40,
        ) {
            let input: Vec<RankEntry<u8>> = rows
                .iter()
                .map(|(id, m)| RankEntry::new(*id, m.map(f64::from)))
                .collect();
            let mut shuffled = input.clone();
            shuffled.reverse();

            let first = rank(&input, RankDirection::Descending, limit);
            let again = rank(&input, RankDirection::Descending, limit);
            let reordered = rank(&shuffled, RankDirection::Descending, limit);

            prop_assert_eq!(&first, &again);
            prop_assert_eq!(
                first.ranked.iter().map(|r| (r.id, r.value)).collect::<Vec<_>>(),
                reordered.ranked.iter().map(|r| (r.id, r.value)).collect::<Vec<_>>()
            );
            prop_assert!(first.ranked.len() <= limit);
        }
    }
}
