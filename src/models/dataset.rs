//! Dataset-level result and compute options.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GuildComputed, Metric, PlayerComputed, WindowKey};

/// Options accepted by a dataset computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeOptions {
    /// Restrict the roster to these guild keys (keys absent from the latest
    /// snapshot are dropped silently)
    #[serde(default)]
    pub guild_filter_keys: Option<Vec<String>>,

    /// Caller-curated groupings, group id → player keys. Used only as the
    /// custom growth reference; the caller excludes any "no grouping" id.
    #[serde(default)]
    pub custom_groups: HashMap<String, Vec<String>>,
}

/// Summary line for one ingested snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub date: DateTime<Utc>,
    pub id: String,
    pub label: Option<String>,
    pub guild_count: usize,
    pub player_count: usize,
}

/// One entry of a per-window, per-metric top-mover list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopMover {
    pub key: String,
    pub name: String,
    pub per_day: f64,
}

/// Recommendation key lists for the roster population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationLists {
    pub main: Vec<String>,
    pub wing: Vec<String>,
}

/// Complete output of one dataset computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetResult {
    pub dataset_id: String,

    /// Ordered, one per ingested snapshot
    pub snapshots: Vec<SnapshotSummary>,

    /// Roster-scoped players, pre-sorted by rank
    pub players: Vec<PlayerComputed>,

    /// Every observed player, pre-sorted by rank
    pub global_players: Vec<PlayerComputed>,

    pub guilds: Vec<GuildComputed>,

    /// Roster top movers per window per metric
    pub top_movers: HashMap<WindowKey, HashMap<Metric, Vec<TopMover>>>,

    pub recommendations: RecommendationLists,
}
