//! Ranking, recommendation partition and strength/weakness tags.

use crate::config::{EngineParams, GameConstants};
use crate::models::{Metric, PlayerComputed, Recommendation, RecommendationLists, WindowKey};

/// Sub-score threshold for the "strong growth" / "consistent" tags.
const STRENGTH_THRESHOLD: f64 = 0.8;

/// Sort descending by default-window score and assign 1-based dense rank.
///
/// Equal scores share a rank; the partition below still cuts by sorted
/// index, so the Main/Wing caps hold regardless of ties.
pub fn assign_ranks(players: &mut [PlayerComputed]) {
    players.sort_by(|a, b| {
        b.default_score()
            .partial_cmp(&a.default_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });

    let mut rank = 0u32;
    let mut last_score = f64::NAN;
    for player in players.iter_mut() {
        let score = player.default_score();
        if score != last_score {
            rank += 1;
            last_score = score;
        }
        player.rank = rank;
    }
}

/// Partition rank-sorted players into Main/Wing/None by sorted index.
pub fn assign_recommendations(
    players: &mut [PlayerComputed],
    params: &EngineParams,
) -> RecommendationLists {
    let mut lists = RecommendationLists::default();

    for (i, player) in players.iter_mut().enumerate() {
        player.recommendation = if i < params.main_slots {
            lists.main.push(player.key.clone());
            Recommendation::Main
        } else if i < params.main_slots + params.wing_slots {
            lists.wing.push(player.key.clone());
            Recommendation::Wing
        } else {
            Recommendation::None
        };
    }

    lists
}

/// Attach threshold-rule strength/weakness tags from the default window's
/// breakdown and the latest point.
pub fn assign_tags(player: &mut PlayerComputed, game: &GameConstants) {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    if let Some(breakdown) = player.scores.get(&WindowKey::DEFAULT) {
        if breakdown.growth.sub_score >= STRENGTH_THRESHOLD {
            strengths.push("strong growth".to_string());
        }
        if breakdown.consistency.sub_score >= STRENGTH_THRESHOLD {
            strengths.push("consistent".to_string());
        }
        if breakdown.coverage.possible_intervals > 0 {
            let raw = breakdown.coverage.realized_intervals as f64
                / breakdown.coverage.possible_intervals as f64;
            if raw < 0.75 {
                weaknesses.push("low coverage".to_string());
            }
        }
        if breakdown.level.low_leveling {
            weaknesses.push("slow leveling".to_string());
        }
    }

    if let Some(latest) = player.points.last() {
        if latest.mine >= game.mine_cap {
            strengths.push("mine capped".to_string());
        }
        if latest.treasury >= game.treasury_cap {
            strengths.push("treasury capped".to_string());
        }
    }

    // The base-stats percentile bucket is always labeled, on one side or
    // the other of the 0.5 line.
    if let Some(&pct) = player.percentiles.get(&Metric::BaseStats) {
        let label = percentile_bucket(pct);
        if pct >= 0.5 {
            strengths.push(label);
        } else {
            weaknesses.push(label);
        }
    }

    player.strengths = strengths;
    player.weaknesses = weaknesses;
}

fn percentile_bucket(pct: f64) -> String {
    if pct >= 0.9 {
        "top 10% base stats".to_string()
    } else if pct >= 0.75 {
        "top 25% base stats".to_string()
    } else if pct >= 0.5 {
        "top half base stats".to_string()
    } else {
        "bottom half base stats".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreBreakdown, ScoreWeights};
    use std::collections::HashMap;

    fn player(key: &str, score: f64) -> PlayerComputed {
        let mut scores = HashMap::new();
        let mut breakdown = ScoreBreakdown::neutral(ScoreWeights::default());
        breakdown.score = score;
        scores.insert(WindowKey::DEFAULT, breakdown);

        PlayerComputed {
            key: key.to_string(),
            name: key.to_string(),
            guild_key: None,
            class_id: None,
            points: Vec::new(),
            series: HashMap::new(),
            window_metrics: HashMap::new(),
            percentiles: HashMap::new(),
            resource_percentile: 0.0,
            scores,
            score_timeline: Vec::new(),
            rank: 0,
            recommendation: Recommendation::None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    fn keys(players: &[PlayerComputed]) -> Vec<&str> {
        players.iter().map(|p| p.key.as_str()).collect()
    }

    #[test]
    fn test_rank_sorts_descending() {
        let mut players = vec![player("low", 0.2), player("high", 0.9), player("mid", 0.5)];
        assign_ranks(&mut players);
        assert_eq!(keys(&players), vec!["high", "mid", "low"]);
        assert_eq!(players[0].rank, 1);
        assert_eq!(players[2].rank, 3);
    }

    #[test]
    fn test_dense_rank_on_ties() {
        let mut players = vec![
            player("a", 0.9),
            player("b", 0.5),
            player("c", 0.5),
            player("d", 0.1),
        ];
        assign_ranks(&mut players);
        assert_eq!(players[1].rank, 2);
        assert_eq!(players[2].rank, 2);
        assert_eq!(players[3].rank, 3);
    }

    #[test]
    fn test_recommendation_partition() {
        let params = EngineParams {
            main_slots: 2,
            wing_slots: 2,
            ..EngineParams::default()
        };
        let mut players: Vec<PlayerComputed> = (0..6)
            .map(|i| player(&format!("p{}", i), 1.0 - i as f64 * 0.1))
            .collect();
        assign_ranks(&mut players);
        let lists = assign_recommendations(&mut players, &params);

        assert_eq!(lists.main, vec!["p0", "p1"]);
        assert_eq!(lists.wing, vec!["p2", "p3"]);
        assert_eq!(players[4].recommendation, Recommendation::None);
        assert_eq!(players[5].recommendation, Recommendation::None);

        // Disjoint and total
        assert!(lists.main.iter().all(|k| !lists.wing.contains(k)));
        let tiered = lists.main.len() + lists.wing.len();
        assert_eq!(tiered + 2, players.len());
    }

    #[test]
    fn test_recommendation_caps() {
        let params = EngineParams::default();
        let mut players: Vec<PlayerComputed> = (0..130)
            .map(|i| player(&format!("p{:03}", i), 1.0 - i as f64 * 0.001))
            .collect();
        assign_ranks(&mut players);
        let lists = assign_recommendations(&mut players, &params);
        assert_eq!(lists.main.len(), 50);
        assert_eq!(lists.wing.len(), 50);
    }

    #[test]
    fn test_tags_percentile_bucket_always_present() {
        let game = GameConstants::default();

        let mut strong = player("a", 0.9);
        strong.percentiles.insert(Metric::BaseStats, 0.95);
        assign_tags(&mut strong, &game);
        assert!(strong.strengths.contains(&"top 10% base stats".to_string()));

        let mut weak = player("b", 0.1);
        weak.percentiles.insert(Metric::BaseStats, 0.2);
        assign_tags(&mut weak, &game);
        assert!(weak
            .weaknesses
            .contains(&"bottom half base stats".to_string()));
    }

    #[test]
    fn test_tags_thresholds() {
        let game = GameConstants::default();
        let mut p = player("a", 0.9);
        {
            let b = p.scores.get_mut(&WindowKey::DEFAULT).unwrap();
            b.growth.sub_score = 0.85;
            b.consistency.sub_score = 0.85;
            b.level.low_leveling = true;
        }
        assign_tags(&mut p, &game);
        assert!(p.strengths.contains(&"strong growth".to_string()));
        assert!(p.strengths.contains(&"consistent".to_string()));
        assert!(p.weaknesses.contains(&"slow leveling".to_string()));
    }
}
