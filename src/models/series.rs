//! Time-series models: points, intervals, trailing windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One player's (or guild-aggregate) measurement at one snapshot date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: DateTime<Utc>,
    pub base_stats: f64,
    pub level: u32,
    pub exp: f64,
    pub exp_next: f64,
    pub mine: f64,
    pub treasury: f64,

    /// Guild the player belonged to at this snapshot
    pub guild_key: Option<String>,

    /// Reconstructed cumulative experience (see engine::series)
    pub exp_total: f64,
}

/// Numeric metric tracked per point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    BaseStats,
    Level,
    Mine,
    Treasury,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::BaseStats, Metric::Level, Metric::Mine, Metric::Treasury];

    /// Read this metric off a point.
    pub fn of(&self, point: &SeriesPoint) -> f64 {
        match self {
            Metric::BaseStats => point.base_stats,
            Metric::Level => point.level as f64,
            Metric::Mine => point.mine,
            Metric::Treasury => point.treasury,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::BaseStats => write!(f, "base_stats"),
            Metric::Level => write!(f, "level"),
            Metric::Mine => write!(f, "mine"),
            Metric::Treasury => write!(f, "treasury"),
        }
    }
}

/// Delta between two consecutive points of one series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalMetric {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    /// Elapsed days, floored to 1
    pub days: i64,

    pub delta: f64,

    /// delta / days
    pub per_day: f64,
}

/// Trailing window length in months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKey {
    #[serde(rename = "1")]
    M1,
    #[serde(rename = "3")]
    M3,
    #[serde(rename = "6")]
    M6,
    #[serde(rename = "12")]
    M12,
}

impl WindowKey {
    pub const ALL: [WindowKey; 4] = [WindowKey::M1, WindowKey::M3, WindowKey::M6, WindowKey::M12];

    /// Window used for ranking and recommendations.
    pub const DEFAULT: WindowKey = WindowKey::M3;

    pub fn months(&self) -> u32 {
        match self {
            WindowKey::M1 => 1,
            WindowKey::M3 => 3,
            WindowKey::M6 => 6,
            WindowKey::M12 => 12,
        }
    }
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.months())
    }
}

/// Resolved boundaries of one trailing window, shared by every player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMeta {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    /// Max intervals obtainable inside the span (snapshot dates − 1)
    pub possible_intervals: usize,
}

/// Interval-like metric spanning a resolved window rather than one step.
pub type WindowMetric = IntervalMetric;

/// Build the interval metric between two measurements of one numeric value.
///
/// `days` is the elapsed time rounded to whole days and floored to 1, so a
/// pair of scans taken hours apart still yields a sane per-day pace.
pub fn build_interval(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    start_value: f64,
    end_value: f64,
) -> IntervalMetric {
    let ms = (end_date - start_date).num_milliseconds() as f64;
    let days = ((ms / 86_400_000.0).round() as i64).max(1);
    let delta = finite_or_zero(end_value - start_value);
    IntervalMetric {
        start_date,
        end_date,
        days,
        delta,
        per_day: delta / days as f64,
    }
}

/// Degrade non-finite inputs to 0 rather than letting NaN propagate.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
