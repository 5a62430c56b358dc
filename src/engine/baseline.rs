//! Global growth/consistency baselines, computed once per window.

use std::collections::HashMap;

use crate::config::EngineParams;
use crate::models::{IntervalMetric, Metric, MetricSeries};

use super::percentile::rank_percentiles;

/// One global player's pace inside a resolved window.
#[derive(Debug, Clone)]
pub struct PaceSample {
    pub key: String,

    /// Current (latest) base stats, used for cohort selection
    pub current_base_stats: f64,

    /// Real guild membership as of the latest point
    pub guild_key: Option<String>,

    /// Window pace, clamped ≥ 0
    pub abs_per_day: f64,

    /// Pace relative to base stats at the window start
    pub rel_per_day: f64,
}

/// Average pace of one comparison group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBaseline {
    pub avg_abs: f64,
    pub avg_rel: f64,

    /// Members with positive pace that entered the average
    pub count: usize,
}

/// All baselines shared by every player scored against one window.
#[derive(Debug, Clone, Default)]
pub struct WindowBaselines {
    /// Mean pace of the top-N-by-base-stats server cohort
    pub server_avg: Option<f64>,

    /// Mean pace of the top-100 cohort (display ratio only)
    pub top_cohort_avg: Option<f64>,

    /// Pace percentile within the server cohort, per member key
    pub cohort_pace_percentiles: HashMap<String, f64>,

    /// Real guild key → group baseline (validity-gated)
    pub real_guilds: HashMap<String, GroupBaseline>,

    /// Custom group id → group baseline (validity-gated)
    pub custom_groups: HashMap<String, GroupBaseline>,
}

fn mean_abs(samples: &[&PaceSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|s| s.abs_per_day).sum::<f64>() / samples.len() as f64)
}

fn group_baselines<'a, F>(
    samples: &'a [PaceSample],
    min_group_size: usize,
    group_of: F,
) -> HashMap<String, GroupBaseline>
where
    F: Fn(&'a PaceSample) -> Option<&'a str>,
{
    let mut groups: HashMap<&str, Vec<&PaceSample>> = HashMap::new();
    for sample in samples {
        // Only positive-pace members count toward a group baseline
        if sample.abs_per_day <= 0.0 {
            continue;
        }
        if let Some(group) = group_of(sample) {
            groups.entry(group).or_default().push(sample);
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= min_group_size)
        .map(|(group, members)| {
            let n = members.len() as f64;
            let avg_abs = members.iter().map(|s| s.abs_per_day).sum::<f64>() / n;
            let avg_rel = members.iter().map(|s| s.rel_per_day).sum::<f64>() / n;
            (
                group.to_string(),
                GroupBaseline {
                    avg_abs,
                    avg_rel,
                    count: members.len(),
                },
            )
        })
        .collect()
}

/// Build the per-window baselines from the global population's pace samples.
///
/// `player_groups` maps player key → custom group id.
pub fn build_window_baselines(
    samples: &[PaceSample],
    player_groups: &HashMap<String, String>,
    params: &EngineParams,
) -> WindowBaselines {
    let mut by_stats: Vec<&PaceSample> = samples.iter().collect();
    by_stats.sort_by(|a, b| {
        b.current_base_stats
            .partial_cmp(&a.current_base_stats)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let server_cohort = &by_stats[..by_stats.len().min(params.server_baseline_cohort)];
    let top_cohort = &by_stats[..by_stats.len().min(params.top_cohort)];

    let cohort_paces: HashMap<String, f64> = server_cohort
        .iter()
        .map(|s| (s.key.clone(), s.abs_per_day))
        .collect();

    WindowBaselines {
        server_avg: mean_abs(server_cohort),
        top_cohort_avg: mean_abs(top_cohort),
        cohort_pace_percentiles: rank_percentiles(&cohort_paces),
        real_guilds: group_baselines(samples, params.min_group_size, |s| s.guild_key.as_deref()),
        custom_groups: group_baselines(samples, params.min_group_size, |s| {
            player_groups.get(&s.key).map(|g| g.as_str())
        }),
    }
}

/// Server-mean base-stats pace per consecutive snapshot interval.
///
/// Keyed by `(start, end)` timestamps in milliseconds; used as the
/// denominator of the consistency ratios.
pub fn interval_baselines<'a, I>(all_series: I) -> HashMap<(i64, i64), f64>
where
    I: Iterator<Item = &'a HashMap<Metric, MetricSeries>>,
{
    let mut sums: HashMap<(i64, i64), (f64, usize)> = HashMap::new();
    for series in all_series {
        if let Some(base) = series.get(&Metric::BaseStats) {
            for iv in &base.intervals {
                let entry = sums.entry(interval_key(iv)).or_insert((0.0, 0));
                entry.0 += iv.per_day;
                entry.1 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// Lookup key for one interval's server baseline.
pub fn interval_key(iv: &IntervalMetric) -> (i64, i64) {
    (
        iv.start_date.timestamp_millis(),
        iv.end_date.timestamp_millis(),
    )
}
