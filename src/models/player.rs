//! Computed per-player and per-guild aggregates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IntervalMetric, Metric, ScoreBreakdown, SeriesPoint, WindowKey, WindowMetric};

/// Tier recommendation derived purely from rank at the default window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Main,
    Wing,
    None,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Main => write!(f, "main"),
            Recommendation::Wing => write!(f, "wing"),
            Recommendation::None => write!(f, "none"),
        }
    }
}

/// Interval history plus the long-run pace figure for one metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSeries {
    pub intervals: Vec<IntervalMetric>,

    /// Σdelta / Σdays across all intervals
    pub weighted_per_day: f64,
}

/// One entry of a player's score-over-time backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub score: f64,
}

/// Everything computed for one player in one dataset pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerComputed {
    /// Stable player key (player id or name)
    pub key: String,

    /// Display name as of the latest point
    pub name: String,

    /// Guild membership as of the latest point
    pub guild_key: Option<String>,

    pub class_id: Option<u32>,

    /// Sorted, date-unique point history
    pub points: Vec<SeriesPoint>,

    /// Per-metric interval history
    pub series: HashMap<Metric, MetricSeries>,

    /// Per-window, per-metric pace over the resolved span; a missing metric
    /// entry means the player lacks two points inside the span
    pub window_metrics: HashMap<WindowKey, HashMap<Metric, WindowMetric>>,

    /// Tie-aware rank percentile of current value, per metric
    pub percentiles: HashMap<Metric, f64>,

    /// Percentile of combined mine+treasury level
    pub resource_percentile: f64,

    /// Composite score per window, with full diagnostics
    pub scores: HashMap<WindowKey, ScoreBreakdown>,

    /// Default-window score replayed over every historical prefix
    pub score_timeline: Vec<TimelineEntry>,

    /// 1-based dense rank at the default window (within the population)
    pub rank: u32,

    pub recommendation: Recommendation,

    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl PlayerComputed {
    /// Latest observed point, if any.
    pub fn latest_point(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Score at the default ranking window.
    pub fn default_score(&self) -> f64 {
        self.scores
            .get(&WindowKey::DEFAULT)
            .map(|b| b.score)
            .unwrap_or(0.0)
    }
}

/// Per-guild aggregate: roster-average points and their derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildComputed {
    pub key: String,
    pub name: String,

    /// Member count as of the latest snapshot the guild appears in
    pub member_count: usize,

    /// Roster-average measurement per snapshot
    pub points: Vec<SeriesPoint>,

    pub series: HashMap<Metric, MetricSeries>,

    pub window_metrics: HashMap<WindowKey, HashMap<Metric, WindowMetric>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_display() {
        assert_eq!(Recommendation::Main.to_string(), "main");
        assert_eq!(Recommendation::None.to_string(), "none");
    }

    #[test]
    fn test_recommendation_serde_name() {
        assert_eq!(
            serde_json::to_string(&Recommendation::Wing).unwrap(),
            "\"wing\""
        );
    }
}
