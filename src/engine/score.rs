//! Growth/consistency composite scorer.

use std::collections::HashMap;

use crate::models::{
    finite_or_zero, ConsistencyBreakdown, CoverageBreakdown, GrowthBreakdown, GrowthReference,
    IntervalMetric, LevelBreakdown, ScoreBreakdown, ScoreWeights, SeriesPoint, WindowMetric,
};

use super::baseline::{interval_key, WindowBaselines};

/// Floor for the relative-pace denominator, so fresh characters with tiny
/// base stats do not produce absurd relative figures.
const REL_PACE_STAT_FLOOR: f64 = 1e6;

/// Levels per 30 days below which the level penalty kicks in.
const EXPECTED_LEVEL_PER_30: f64 = 3.0;

/// Coverage is never discounted below this floor, protecting sparse
/// histories from being crushed to zero.
const COVERAGE_FLOOR: f64 = 0.75;

/// Consistency ratios are clamped to this band before the log transform.
const CONSISTENCY_RATIO_BAND: (f64, f64) = (0.5, 1.5);

/// Everything player-specific the scorer needs for one window.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub player_key: &'a str,

    /// Window pace metric over base stats; None when unresolvable
    pub metric: Option<&'a WindowMetric>,

    /// The player's resolved boundary points inside the window span
    pub boundary_points: Option<(&'a SeriesPoint, &'a SeriesPoint)>,

    /// Realized base-stats intervals inside the window span
    pub realized_intervals: &'a [IntervalMetric],

    /// Max intervals obtainable inside the span (from the window meta)
    pub possible_intervals: usize,

    /// Real guild membership as of the latest point
    pub guild_key: Option<&'a str>,

    /// Custom group id, when the caller put this player in one
    pub custom_group: Option<&'a str>,
}

fn clamp01(x: f64) -> f64 {
    finite_or_zero(x).clamp(0.0, 1.0)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median absolute deviation from the median.
fn mad(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let m = median(&sorted);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - m).abs()).collect();
    deviations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    median(&deviations)
}

/// Select the guild-level comparison baseline: custom group, then real
/// guild, then server average.
fn select_reference(
    inputs: &ScoreInputs,
    baselines: &WindowBaselines,
) -> GrowthReference {
    if let Some(group) = inputs.custom_group {
        if let Some(b) = baselines.custom_groups.get(group) {
            return GrowthReference::Custom {
                key: group.to_string(),
                avg_abs: b.avg_abs,
                avg_rel: b.avg_rel,
            };
        }
    }
    if let Some(guild) = inputs.guild_key {
        if let Some(b) = baselines.real_guilds.get(guild) {
            return GrowthReference::Real {
                key: guild.to_string(),
                avg_abs: b.avg_abs,
                avg_rel: b.avg_rel,
            };
        }
    }
    if let Some(avg) = baselines.server_avg {
        return GrowthReference::ServerAverage { avg_abs: avg };
    }
    GrowthReference::None
}

fn growth_breakdown(
    inputs: &ScoreInputs,
    baselines: &WindowBaselines,
    abs_per_day: f64,
    rel_per_day: f64,
) -> GrowthBreakdown {
    let server_avg = baselines.server_avg.filter(|avg| *avg > 0.0);
    let server_ratio = server_avg.map(|avg| abs_per_day / avg);

    // Log-ratio against the server baseline, squashed through a logistic
    // curve: ratio 1 scores 0.5, ratio → 0 scores 0, ratio → ∞ scores 1.
    // The remaining two terms are held neutral pending richer relative and
    // momentum signals.
    let ratio_term = match server_ratio {
        Some(ratio) if ratio > 0.0 => sigmoid(ratio.ln()),
        Some(_) => 0.0,
        None => 0.5,
    };
    let sub_score = clamp01(0.7 * ratio_term + 0.2 * 0.5 + 0.1 * 0.5);

    let reference = select_reference(inputs, baselines);
    let reference_ratio = reference
        .avg_abs()
        .filter(|avg| *avg > 0.0)
        .map(|avg| abs_per_day / avg);

    let top_cohort_avg = baselines.top_cohort_avg.filter(|avg| *avg > 0.0);
    let top_cohort_ratio = top_cohort_avg.map(|avg| abs_per_day / avg);

    GrowthBreakdown {
        abs_per_day,
        rel_per_day,
        server_avg,
        server_ratio,
        reference,
        reference_ratio,
        top_cohort_avg,
        top_cohort_ratio,
        cohort_pace_percentile: baselines
            .cohort_pace_percentiles
            .get(inputs.player_key)
            .copied(),
        sub_score,
    }
}

fn consistency_breakdown(
    realized: &[IntervalMetric],
    interval_avgs: &HashMap<(i64, i64), f64>,
) -> ConsistencyBreakdown {
    if realized.is_empty() {
        return ConsistencyBreakdown::default();
    }

    let (lo, hi) = CONSISTENCY_RATIO_BAND;
    let mut ratios = Vec::with_capacity(realized.len());
    let mut logs = Vec::with_capacity(realized.len());
    for iv in realized {
        let baseline = interval_avgs.get(&interval_key(iv)).copied().unwrap_or(0.0);
        let ratio = if baseline > 0.0 {
            finite_or_zero(iv.per_day / baseline)
        } else {
            0.0
        };
        let clamped = ratio.clamp(lo, hi);
        ratios.push(ratio);
        logs.push(clamped.ln());
    }

    let n = ratios.len() as f64;
    let above_share = ratios.iter().filter(|r| **r >= 1.0).count() as f64 / n;
    let gap = logs.iter().map(|x| x.abs()).sum::<f64>() / n;
    let closeness = (-3.0 * gap).exp();
    let stability = if logs.len() >= 2 {
        (-6.0 * mad(&logs)).exp()
    } else {
        0.5
    };

    ConsistencyBreakdown {
        intervals_used: realized.len(),
        above_share,
        gap,
        closeness,
        stability,
        sub_score: clamp01(0.4 * above_share + 0.35 * closeness + 0.25 * stability),
    }
}

fn level_breakdown(inputs: &ScoreInputs) -> LevelBreakdown {
    let (metric, (start, end)) = match (inputs.metric, inputs.boundary_points) {
        (Some(m), Some(points)) => (m, points),
        _ => return LevelBreakdown::default(),
    };

    let level_delta = (end.level as f64 - start.level as f64).max(0.0);
    let level_per_30 = level_delta / metric.days as f64 * 30.0;
    let low_leveling = level_per_30 < EXPECTED_LEVEL_PER_30;
    let penalty = clamp01((EXPECTED_LEVEL_PER_30 - level_per_30) / EXPECTED_LEVEL_PER_30);

    LevelBreakdown {
        level_delta: Some(level_delta),
        window_days: Some(metric.days),
        level_per_30: Some(level_per_30),
        low_leveling,
        penalty,
    }
}

fn coverage_breakdown(realized: usize, possible: usize) -> CoverageBreakdown {
    let factor = if possible == 0 {
        1.0
    } else {
        (realized as f64 / possible as f64).clamp(COVERAGE_FLOOR, 1.0)
    };
    CoverageBreakdown {
        realized_intervals: realized,
        possible_intervals: possible,
        factor,
    }
}

/// Score one player against one resolved window.
///
/// Windows the player cannot fill (no metric, single point) yield the
/// neutral breakdown rather than an error.
pub fn score_window(
    inputs: &ScoreInputs,
    baselines: &WindowBaselines,
    interval_avgs: &HashMap<(i64, i64), f64>,
    weights: ScoreWeights,
) -> ScoreBreakdown {
    let metric = match inputs.metric {
        Some(m) => m,
        None => return ScoreBreakdown::neutral(weights),
    };

    let abs_per_day = finite_or_zero(metric.per_day).max(0.0);
    let base_start = inputs
        .boundary_points
        .map(|(start, _)| start.base_stats)
        .unwrap_or(0.0);
    let rel_per_day = abs_per_day / base_start.max(REL_PACE_STAT_FLOOR);

    let growth = growth_breakdown(inputs, baselines, abs_per_day, rel_per_day);
    let consistency = consistency_breakdown(inputs.realized_intervals, interval_avgs);
    let level = level_breakdown(inputs);
    let coverage = coverage_breakdown(inputs.realized_intervals.len(), inputs.possible_intervals);

    let combined = weights.growth * growth.sub_score + weights.consistency * consistency.sub_score;
    let score = clamp01(
        combined * coverage.factor * (1.0 - weights.level_penalty * level.penalty),
    );

    ScoreBreakdown {
        score,
        weights,
        growth,
        consistency,
        level,
        coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::build_interval;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
    }

    fn point(day: u32, base_stats: f64, level: u32) -> SeriesPoint {
        SeriesPoint {
            date: date(day),
            base_stats,
            level,
            exp: 0.0,
            exp_next: 0.0,
            mine: 0.0,
            treasury: 0.0,
            guild_key: None,
            exp_total: 0.0,
        }
    }

    fn baselines_with_server_avg(avg: f64) -> WindowBaselines {
        WindowBaselines {
            server_avg: Some(avg),
            ..WindowBaselines::default()
        }
    }

    fn inputs<'a>(
        metric: Option<&'a WindowMetric>,
        points: Option<(&'a SeriesPoint, &'a SeriesPoint)>,
        realized: &'a [IntervalMetric],
        possible: usize,
    ) -> ScoreInputs<'a> {
        ScoreInputs {
            player_key: "p",
            metric,
            boundary_points: points,
            realized_intervals: realized,
            possible_intervals: possible,
            guild_key: None,
            custom_group: None,
        }
    }

    #[test]
    fn test_no_metric_yields_neutral() {
        let b = score_window(
            &inputs(None, None, &[], 3),
            &baselines_with_server_avg(10.0),
            &HashMap::new(),
            ScoreWeights::default(),
        );
        assert_eq!(b.score, 0.0);
        assert_eq!(b.growth.reference, GrowthReference::None);
    }

    #[test]
    fn test_pace_at_server_average_scores_half() {
        let metric = build_interval(date(1), date(31), 1000.0, 1300.0);
        let start = point(1, 1000.0, 100);
        let end = point(31, 1300.0, 103);
        let b = score_window(
            &inputs(Some(&metric), Some((&start, &end)), &[], 0),
            &baselines_with_server_avg(10.0),
            &HashMap::new(),
            ScoreWeights::default(),
        );
        // ratio 1 → sigmoid(0) = 0.5 on every growth term
        assert!((b.growth.sub_score - 0.5).abs() < 1e-12);
        assert_eq!(b.growth.server_ratio, Some(1.0));
    }

    #[test]
    fn test_zero_pace_growth_floor() {
        let metric = build_interval(date(1), date(31), 1000.0, 1000.0);
        let start = point(1, 1000.0, 100);
        let end = point(31, 1000.0, 103);
        let b = score_window(
            &inputs(Some(&metric), Some((&start, &end)), &[], 0),
            &baselines_with_server_avg(10.0),
            &HashMap::new(),
            ScoreWeights::default(),
        );
        // Ratio term collapses to 0, the two neutral terms remain
        assert!((b.growth.sub_score - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_missing_server_baseline_is_neutral() {
        let metric = build_interval(date(1), date(31), 1000.0, 1300.0);
        let start = point(1, 1000.0, 100);
        let end = point(31, 1300.0, 103);
        let b = score_window(
            &inputs(Some(&metric), Some((&start, &end)), &[], 0),
            &WindowBaselines::default(),
            &HashMap::new(),
            ScoreWeights::default(),
        );
        assert!((b.growth.sub_score - 0.5).abs() < 1e-12);
        assert_eq!(b.growth.server_avg, None);
    }

    #[test]
    fn test_reference_precedence_custom_over_real_over_server() {
        let mut baselines = baselines_with_server_avg(10.0);
        baselines.real_guilds.insert(
            "g1".into(),
            super::super::baseline::GroupBaseline {
                avg_abs: 8.0,
                avg_rel: 0.001,
                count: 3,
            },
        );
        baselines.custom_groups.insert(
            "pool".into(),
            super::super::baseline::GroupBaseline {
                avg_abs: 12.0,
                avg_rel: 0.002,
                count: 2,
            },
        );

        let metric = build_interval(date(1), date(31), 1000.0, 1300.0);
        let start = point(1, 1000.0, 100);
        let end = point(31, 1300.0, 103);

        let mut i = inputs(Some(&metric), Some((&start, &end)), &[], 0);
        i.guild_key = Some("g1");
        i.custom_group = Some("pool");
        let b = score_window(&i, &baselines, &HashMap::new(), ScoreWeights::default());
        assert!(matches!(b.growth.reference, GrowthReference::Custom { .. }));

        i.custom_group = None;
        let b = score_window(&i, &baselines, &HashMap::new(), ScoreWeights::default());
        assert!(matches!(b.growth.reference, GrowthReference::Real { .. }));

        i.guild_key = None;
        let b = score_window(&i, &baselines, &HashMap::new(), ScoreWeights::default());
        assert!(matches!(
            b.growth.reference,
            GrowthReference::ServerAverage { .. }
        ));
    }

    #[test]
    fn test_invalid_guild_group_falls_back_to_server() {
        // Guild exists in-game but never passed the ≥2 positive-pace gate,
        // so it is absent from the baselines and the server average wins.
        let baselines = baselines_with_server_avg(10.0);
        let metric = build_interval(date(1), date(31), 1000.0, 1300.0);
        let start = point(1, 1000.0, 100);
        let end = point(31, 1300.0, 103);

        let mut i = inputs(Some(&metric), Some((&start, &end)), &[], 0);
        i.guild_key = Some("lonely");
        let b = score_window(&i, &baselines, &HashMap::new(), ScoreWeights::default());
        assert_eq!(
            b.growth.reference,
            GrowthReference::ServerAverage { avg_abs: 10.0 }
        );
    }

    #[test]
    fn test_consistency_steady_at_baseline() {
        let iv1 = build_interval(date(1), date(11), 0.0, 100.0);
        let iv2 = build_interval(date(11), date(21), 100.0, 200.0);
        let mut avgs = HashMap::new();
        avgs.insert(interval_key(&iv1), 10.0);
        avgs.insert(interval_key(&iv2), 10.0);

        let c = consistency_breakdown(&[iv1, iv2], &avgs);
        assert_eq!(c.above_share, 1.0);
        assert_eq!(c.gap, 0.0);
        assert_eq!(c.closeness, 1.0);
        assert_eq!(c.stability, 1.0);
        assert_eq!(c.sub_score, 1.0);
    }

    #[test]
    fn test_consistency_no_intervals_neutral() {
        let c = consistency_breakdown(&[], &HashMap::new());
        assert_eq!(c.sub_score, 0.5);
        assert_eq!(c.intervals_used, 0);
    }

    #[test]
    fn test_consistency_single_interval_neutral_stability() {
        let iv = build_interval(date(1), date(11), 0.0, 200.0);
        let mut avgs = HashMap::new();
        avgs.insert(interval_key(&iv), 10.0);
        let c = consistency_breakdown(&[iv], &avgs);
        assert_eq!(c.stability, 0.5);
        assert_eq!(c.intervals_used, 1);
    }

    #[test]
    fn test_consistency_ratio_clamped_to_band() {
        // 40 per day vs baseline 10 clamps to 1.5 before the log
        let iv1 = build_interval(date(1), date(11), 0.0, 400.0);
        let iv2 = build_interval(date(11), date(21), 400.0, 800.0);
        let mut avgs = HashMap::new();
        avgs.insert(interval_key(&iv1), 10.0);
        avgs.insert(interval_key(&iv2), 10.0);
        let c = consistency_breakdown(&[iv1, iv2], &avgs);
        assert!((c.gap - 1.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_level_delta_penalized() {
        let metric = build_interval(date(1), date(31), 1000.0, 1300.0);
        let start = point(1, 1000.0, 100);
        let flat = point(31, 1300.0, 100);
        let leveled = point(31, 1300.0, 104);

        let penalized = score_window(
            &inputs(Some(&metric), Some((&start, &flat)), &[], 0),
            &baselines_with_server_avg(10.0),
            &HashMap::new(),
            ScoreWeights::default(),
        );
        let unpenalized = score_window(
            &inputs(Some(&metric), Some((&start, &leveled)), &[], 0),
            &baselines_with_server_avg(10.0),
            &HashMap::new(),
            ScoreWeights::default(),
        );

        assert!(penalized.level.low_leveling);
        assert_eq!(penalized.level.level_per_30, Some(0.0));
        assert_eq!(penalized.level.penalty, 1.0);
        assert!(!unpenalized.level.low_leveling);
        assert!(penalized.score < unpenalized.score);
    }

    #[test]
    fn test_coverage_floor() {
        let c = coverage_breakdown(1, 10);
        assert_eq!(c.factor, 0.75);
        let full = coverage_breakdown(10, 10);
        assert_eq!(full.factor, 1.0);
        let empty = coverage_breakdown(0, 0);
        assert_eq!(empty.factor, 1.0);
    }

    #[test]
    fn test_score_bounds() {
        let metric = build_interval(date(1), date(31), 1000.0, 100_000.0);
        let start = point(1, 1000.0, 100);
        let end = point(31, 100_000.0, 200);
        let b = score_window(
            &inputs(Some(&metric), Some((&start, &end)), &[], 0),
            &baselines_with_server_avg(0.001),
            &HashMap::new(),
            ScoreWeights::default(),
        );
        assert!(b.score <= 1.0 && b.score >= 0.0);
    }
}
