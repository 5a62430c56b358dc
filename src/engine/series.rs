//! Series assembly: interval differencing and exp-total reconstruction.

use std::collections::HashMap;

use crate::config::GameConstants;
use crate::models::{
    build_interval, finite_or_zero, IntervalMetric, Metric, MetricSeries, SeriesPoint,
};

/// Experience gained between two consecutive points.
///
/// The exp curve is flat above `exp_curve_threshold`: below it the per-level
/// cost is read from the snapshot's `exp_next`, at/above it every level costs
/// `exp_per_level_capped`. When the interval crosses the threshold the
/// pre-threshold levels are closed out with the starting point's per-level
/// figure, each post-threshold level adds one flat chunk, and the ending raw
/// counter is added on top. Without a level gain the delta is just the raw
/// counter difference, floored at 0 (handles within-level progress and
/// counter resets).
pub fn exp_delta(start: &SeriesPoint, end: &SeriesPoint, game: &GameConstants) -> f64 {
    let threshold = game.exp_curve_threshold;
    let chunk = game.exp_per_level_capped;

    if end.level <= start.level {
        return finite_or_zero(end.exp - start.exp).max(0.0);
    }

    let delta = if start.level >= threshold {
        // Entire interval on the flat part of the curve
        (end.level - start.level) as f64 * chunk + end.exp - start.exp
    } else if end.level < threshold {
        // Entire interval below the threshold; per-level cost approximated
        // by the starting point's figure
        (start.exp_next - start.exp)
            + (end.level - start.level - 1) as f64 * start.exp_next
            + end.exp
    } else {
        // Crossed the threshold: close out pre-threshold levels, then flat
        // chunks for the rest
        (start.exp_next - start.exp)
            + (threshold - start.level - 1) as f64 * start.exp_next
            + (end.level - threshold) as f64 * chunk
            + end.exp
    };

    finite_or_zero(delta).max(0.0)
}

/// Fill in the cumulative `exp_total` of a sorted point sequence.
///
/// The first point seeds the total with its raw counter; each following
/// point adds `exp_delta`, so the running total is monotonically
/// non-decreasing across the whole history.
pub fn attach_exp_totals(points: &mut [SeriesPoint], game: &GameConstants) {
    let mut total = 0.0;
    for i in 0..points.len() {
        if i == 0 {
            total = finite_or_zero(points[0].exp).max(0.0);
        } else {
            let (before, after) = points.split_at_mut(i);
            total += exp_delta(&before[i - 1], &after[0], game);
        }
        points[i].exp_total = total;
    }
}

/// Consecutive-interval deltas for one metric of a sorted point sequence.
pub fn metric_intervals(points: &[SeriesPoint], metric: Metric) -> Vec<IntervalMetric> {
    points
        .windows(2)
        .map(|pair| {
            build_interval(
                pair[0].date,
                pair[1].date,
                metric.of(&pair[0]),
                metric.of(&pair[1]),
            )
        })
        .collect()
}

/// Σdelta / Σdays across intervals, the long-run pace figure.
pub fn weighted_per_day(intervals: &[IntervalMetric]) -> f64 {
    let total_days: i64 = intervals.iter().map(|iv| iv.days).sum();
    if total_days == 0 {
        return 0.0;
    }
    let total_delta: f64 = intervals.iter().map(|iv| iv.delta).sum();
    finite_or_zero(total_delta / total_days as f64)
}

/// All four metric series for one point history.
pub fn build_series(points: &[SeriesPoint]) -> HashMap<Metric, MetricSeries> {
    Metric::ALL
        .iter()
        .map(|&metric| {
            let intervals = metric_intervals(points, metric);
            let weighted = weighted_per_day(&intervals);
            (
                metric,
                MetricSeries {
                    intervals,
                    weighted_per_day: weighted,
                },
            )
        })
        .collect()
}
