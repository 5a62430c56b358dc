//! Score-over-time backtest.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::EngineParams;
use crate::models::{Metric, ScoreWeights, SeriesPoint, TimelineEntry, WindowKey};

use super::baseline::WindowBaselines;
use super::score::{score_window, ScoreInputs};
use super::series::metric_intervals;
use super::window::{resolve_window, window_metric, window_points};

/// Shared, point-in-time-correct baseline data for timeline replay.
///
/// Per-interval server averages are historical pairs and never depend on
/// "now"; the growth denominator does, so it is precomputed once per
/// snapshot date and reused by every player's replay.
#[derive(Debug, Clone)]
pub struct TimelineContext {
    pub interval_avgs: HashMap<(i64, i64), f64>,

    /// Snapshot date (ms) → server-average pace with that date as "now"
    pub server_avg_at: HashMap<i64, Option<f64>>,

    pub weights: ScoreWeights,
}

/// Server-average pace as of each snapshot date.
///
/// For a given "now", the default window is resolved against the dataset
/// dates up to it, and the cohort is re-selected from the players' stats as
/// of that date.
pub fn build_timeline_context(
    dataset_dates: &[DateTime<Utc>],
    global_points: &HashMap<String, Vec<SeriesPoint>>,
    interval_avgs: HashMap<(i64, i64), f64>,
    params: &EngineParams,
    weights: ScoreWeights,
) -> TimelineContext {
    let mut server_avg_at = HashMap::with_capacity(dataset_dates.len());

    for (i, now) in dataset_dates.iter().enumerate() {
        let visible = &dataset_dates[..=i];
        let avg = resolve_window(visible, WindowKey::DEFAULT).and_then(|meta| {
            let mut cohort: Vec<(f64, f64)> = Vec::new();
            for points in global_points.values() {
                let upto = points.partition_point(|p| p.date <= *now);
                let prefix = &points[..upto];
                let Some(last) = prefix.last() else { continue };
                let Some(metric) = window_metric(prefix, &meta, Metric::BaseStats) else {
                    continue;
                };
                cohort.push((last.base_stats, metric.per_day.max(0.0)));
            }
            cohort.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            cohort.truncate(params.server_baseline_cohort);
            if cohort.is_empty() {
                None
            } else {
                Some(cohort.iter().map(|(_, pace)| pace).sum::<f64>() / cohort.len() as f64)
            }
        });
        server_avg_at.insert(now.timestamp_millis(), avg);
    }

    TimelineContext {
        interval_avgs,
        server_avg_at,
        weights,
    }
}

/// Replay the default-window score over every historical prefix of one
/// player's points: "what would the score have been if this snapshot were
/// the most recent one".
pub fn build_timeline(points: &[SeriesPoint], ctx: &TimelineContext) -> Vec<TimelineEntry> {
    let mut timeline = Vec::with_capacity(points.len());

    for k in 1..=points.len() {
        let prefix = &points[..k];
        let now = prefix[k - 1].date;
        let dates: Vec<DateTime<Utc>> = prefix.iter().map(|p| p.date).collect();

        let score = match resolve_window(&dates, WindowKey::DEFAULT) {
            Some(meta) => {
                let metric = window_metric(prefix, &meta, Metric::BaseStats);
                let boundary = window_points(prefix, &meta);
                let realized: Vec<_> = metric_intervals(prefix, Metric::BaseStats)
                    .into_iter()
                    .filter(|iv| iv.start_date >= meta.start_date && iv.end_date <= meta.end_date)
                    .collect();

                let baselines = WindowBaselines {
                    server_avg: ctx
                        .server_avg_at
                        .get(&now.timestamp_millis())
                        .copied()
                        .flatten(),
                    ..WindowBaselines::default()
                };

                let inputs = ScoreInputs {
                    player_key: "",
                    metric: metric.as_ref(),
                    boundary_points: boundary,
                    realized_intervals: &realized,
                    possible_intervals: meta.possible_intervals,
                    guild_key: None,
                    custom_group: None,
                };
                score_window(&inputs, &baselines, &ctx.interval_avgs, ctx.weights).score
            }
            None => 0.0,
        };

        timeline.push(TimelineEntry { date: now, score });
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn point(d: DateTime<Utc>, base_stats: f64, level: u32) -> SeriesPoint {
        SeriesPoint {
            date: d,
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

    fn monthly_points(paces: &[f64]) -> Vec<SeriesPoint> {
        let mut stats = 1000.0;
        let mut level = 100;
        let mut out = Vec::new();
        for (i, pace) in paces.iter().enumerate() {
            let m = (i as u32 % 12) + 1;
            let y = 2024 + (i as i32) / 12;
            out.push(point(date(y, m, 1), stats, level));
            stats += pace * 30.0;
            level += 5;
        }
        out
    }

    fn context_for(points: &HashMap<String, Vec<SeriesPoint>>) -> TimelineContext {
        let dates: Vec<DateTime<Utc>> = points.values().next().unwrap().iter().map(|p| p.date).collect();
        build_timeline_context(
            &dates,
            points,
            HashMap::new(),
            &EngineParams::default(),
            ScoreWeights::default(),
        )
    }

    #[test]
    fn test_timeline_one_entry_per_point() {
        let points = monthly_points(&[10.0, 10.0, 10.0, 10.0]);
        let mut global = HashMap::new();
        global.insert("p".to_string(), points.clone());
        let ctx = context_for(&global);

        let timeline = build_timeline(&points, &ctx);
        assert_eq!(timeline.len(), 4);
        for (entry, p) in timeline.iter().zip(points.iter()) {
            assert_eq!(entry.date, p.date);
            assert!((0.0..=1.0).contains(&entry.score));
        }
    }

    #[test]
    fn test_timeline_first_prefix_scores_zero() {
        let points = monthly_points(&[10.0, 10.0, 10.0]);
        let mut global = HashMap::new();
        global.insert("p".to_string(), points.clone());
        let ctx = context_for(&global);

        let timeline = build_timeline(&points, &ctx);
        // A single point cannot fill a window
        assert_eq!(timeline[0].score, 0.0);
    }

    #[test]
    fn test_timeline_dates_ascend() {
        let points = monthly_points(&[10.0, 12.0, 8.0, 10.0, 11.0]);
        let mut global = HashMap::new();
        global.insert("p".to_string(), points.clone());
        let ctx = context_for(&global);

        let timeline = build_timeline(&points, &ctx);
        for pair in timeline.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }
}
