//! Composite score models and the full diagnostic breakdown.

use serde::{Deserialize, Serialize};

/// Baseline group used to normalize a player's pace for display ratios.
///
/// Selection precedence is custom group, then real in-game guild, then the
/// server average; a group baseline is only valid with at least two members
/// showing positive pace. Modeled as a tagged variant so the fallback chain
/// is exhaustively checked instead of duck-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthReference {
    /// Caller-supplied grouping (e.g. a curated roster column)
    Custom { key: String, avg_abs: f64, avg_rel: f64 },

    /// Real in-game guild
    Real { key: String, avg_abs: f64, avg_rel: f64 },

    /// Server-wide average pace
    ServerAverage { avg_abs: f64 },

    /// No valid baseline available
    None,
}

impl Default for GrowthReference {
    fn default() -> Self {
        GrowthReference::None
    }
}

impl GrowthReference {
    /// Average absolute pace of the selected baseline, if any.
    pub fn avg_abs(&self) -> Option<f64> {
        match self {
            GrowthReference::Custom { avg_abs, .. }
            | GrowthReference::Real { avg_abs, .. }
            | GrowthReference::ServerAverage { avg_abs } => Some(*avg_abs),
            GrowthReference::None => None,
        }
    }
}

/// Published weight set for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub growth: f64,
    pub consistency: f64,
    pub level_penalty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            growth: 0.75,
            consistency: 0.25,
            level_penalty: 0.15,
        }
    }
}

/// Growth sub-score inputs and result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthBreakdown {
    /// Absolute pace of the scored metric (base stats per day), clamped ≥ 0
    pub abs_per_day: f64,

    /// Pace relative to the player's starting base stats
    pub rel_per_day: f64,

    /// Server-average pace, when computable
    pub server_avg: Option<f64>,

    /// abs_per_day / server_avg
    pub server_ratio: Option<f64>,

    /// Selected guild-level baseline
    pub reference: GrowthReference,

    /// abs_per_day / reference pace
    pub reference_ratio: Option<f64>,

    /// Average pace of the top-100-by-base-stats cohort (display only)
    pub top_cohort_avg: Option<f64>,

    /// abs_per_day / top_cohort_avg (display only)
    pub top_cohort_ratio: Option<f64>,

    /// Percentile of the player's pace within the server baseline cohort,
    /// when the player is part of it
    pub cohort_pace_percentile: Option<f64>,

    pub sub_score: f64,
}

/// Consistency sub-score inputs and result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyBreakdown {
    /// Realized intervals that entered the statistic
    pub intervals_used: usize,

    /// Fraction of interval ratios at or above the server baseline
    pub above_share: f64,

    /// Mean |ln(ratio)| across intervals
    pub gap: f64,

    /// exp(−3·gap)
    pub closeness: f64,

    /// exp(−6·MAD(ln ratio)), neutral 0.5 with fewer than 2 intervals
    pub stability: f64,

    pub sub_score: f64,
}

impl Default for ConsistencyBreakdown {
    fn default() -> Self {
        Self {
            intervals_used: 0,
            above_share: 0.0,
            gap: 0.0,
            closeness: 0.0,
            stability: 0.5,
            sub_score: 0.5,
        }
    }
}

/// Level-progression penalty inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelBreakdown {
    pub level_delta: Option<f64>,
    pub window_days: Option<i64>,

    /// Levels gained per 30 days
    pub level_per_30: Option<f64>,

    /// level_per_30 below the expected floor of 3
    pub low_leveling: bool,

    /// Penalty in [0,1], 0 when unknown
    pub penalty: f64,
}

/// Coverage discount inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageBreakdown {
    pub realized_intervals: usize,
    pub possible_intervals: usize,

    /// clamp(realized/possible, 0.75, 1); 1 when nothing was possible
    pub factor: f64,
}

impl Default for CoverageBreakdown {
    fn default() -> Self {
        Self {
            realized_intervals: 0,
            possible_intervals: 0,
            factor: 1.0,
        }
    }
}

/// Full diagnostic record for one player/window score.
///
/// A deterministic function of its inputs, never mutated after creation.
/// Only `score` feeds anything downstream; the rest exists for inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub weights: ScoreWeights,
    pub growth: GrowthBreakdown,
    pub consistency: ConsistencyBreakdown,
    pub level: LevelBreakdown,
    pub coverage: CoverageBreakdown,
}

impl ScoreBreakdown {
    /// Neutral breakdown for windows that cannot be scored (no metric,
    /// single point, ...). Built in one place so the four window keys never
    /// drift apart.
    pub fn neutral(weights: ScoreWeights) -> Self {
        Self {
            score: 0.0,
            weights,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_weights() {
        let w = ScoreWeights::default();
        assert_eq!(w.growth, 0.75);
        assert_eq!(w.consistency, 0.25);
        assert_eq!(w.level_penalty, 0.15);
    }

    #[test]
    fn test_growth_reference_avg_abs() {
        let custom = GrowthReference::Custom {
            key: "pool-a".into(),
            avg_abs: 12.0,
            avg_rel: 0.001,
        };
        assert_eq!(custom.avg_abs(), Some(12.0));
        assert_eq!(GrowthReference::None.avg_abs(), None);
    }

    #[test]
    fn test_neutral_breakdown() {
        let b = ScoreBreakdown::neutral(ScoreWeights::default());
        assert_eq!(b.score, 0.0);
        assert_eq!(b.consistency.stability, 0.5);
        assert_eq!(b.coverage.factor, 1.0);
        assert_eq!(b.growth.reference, GrowthReference::None);
    }

    #[test]
    fn test_growth_reference_tagged_serialization() {
        let real = GrowthReference::Real {
            key: "g1".into(),
            avg_abs: 8.0,
            avg_rel: 0.002,
        };
        let json = serde_json::to_string(&real).unwrap();
        assert!(json.contains("\"kind\":\"real\""));
        let parsed: GrowthReference = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, real);
    }
}
