//! Trailing-window resolution via month buckets.

use chrono::{DateTime, Utc};

use crate::models::{build_interval, Metric, SeriesPoint, WindowKey, WindowMeta, WindowMetric};

/// `YYYY-MM` bucket key for a snapshot date.
pub fn month_key(date: DateTime<Utc>) -> String {
    date.format("%Y-%m").to_string()
}

fn month_buckets(dates: &[DateTime<Utc>]) -> Vec<Vec<DateTime<Utc>>> {
    let mut buckets: Vec<(String, Vec<DateTime<Utc>>)> = Vec::new();
    for &d in dates {
        let key = month_key(d);
        match buckets.last_mut() {
            Some((last_key, bucket)) if *last_key == key => bucket.push(d),
            _ => buckets.push((key, vec![d])),
        }
    }
    buckets.into_iter().map(|(_, b)| b).collect()
}

/// Resolve a trailing window of N months against a sorted snapshot date list.
///
/// The end bucket is the second-to-last populated month (the last month is
/// usually still being scanned), or the only month when just one exists. A
/// single reading in the end month is ambiguous as a window boundary, so the
/// end date extends to the first reading of the following month when one
/// exists. Pure function of the date list; the result is shared by every
/// player.
pub fn resolve_window(dates: &[DateTime<Utc>], window: WindowKey) -> Option<WindowMeta> {
    if dates.is_empty() {
        return None;
    }

    let buckets = month_buckets(dates);
    let end_index = if buckets.len() >= 2 { buckets.len() - 2 } else { 0 };
    let start_index = end_index.saturating_sub(window.months() as usize - 1);

    let start_date = buckets[start_index][0];
    let end_bucket = &buckets[end_index];
    let end_date = if end_bucket.len() >= 2 {
        *end_bucket.last().unwrap()
    } else if end_index + 1 < buckets.len() {
        buckets[end_index + 1][0]
    } else {
        end_bucket[0]
    };

    let in_span = dates
        .iter()
        .filter(|d| **d >= start_date && **d <= end_date)
        .count();

    Some(WindowMeta {
        start_date,
        end_date,
        possible_intervals: in_span.saturating_sub(1),
    })
}

/// A player's boundary points for a resolved window.
///
/// Boundaries are the player's own points nearest the global span, so
/// partial coverage realizes fewer intervals than `possible_intervals`.
/// The single-reading rule applies per player too: when the player's own
/// end month holds just one reading, the end point extends to the player's
/// next reading, even past the global end date.
pub fn window_points<'a>(
    points: &'a [SeriesPoint],
    meta: &WindowMeta,
) -> Option<(&'a SeriesPoint, &'a SeriesPoint)> {
    let first_idx = points
        .iter()
        .position(|p| p.date >= meta.start_date && p.date <= meta.end_date)?;
    let last_idx = points.iter().rposition(|p| p.date <= meta.end_date)?;

    let last = &points[last_idx];
    let end_month = month_key(last.date);
    let in_end_month = points[first_idx..=last_idx]
        .iter()
        .filter(|p| month_key(p.date) == end_month)
        .count();
    let end = if in_end_month >= 2 {
        last
    } else {
        points.get(last_idx + 1).unwrap_or(last)
    };

    let first = &points[first_idx];
    if end.date <= first.date {
        return None;
    }
    Some((first, end))
}

/// Window-spanning pace metric for one player and metric.
pub fn window_metric(
    points: &[SeriesPoint],
    meta: &WindowMeta,
    metric: Metric,
) -> Option<WindowMetric> {
    let (start, end) = window_points(points, meta)?;
    Some(build_interval(
        start.date,
        end.date,
        metric.of(start),
        metric.of(end),
    ))
}
