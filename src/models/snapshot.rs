//! Normalized roster snapshot input models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw per-member stats as captured by one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberStats {
    /// In-game character name
    pub name: String,

    /// Stable player id when the scan source provides one
    #[serde(default)]
    pub player_id: Option<String>,

    /// Sum of base attributes
    pub base_stats: f64,

    /// Character level
    pub level: u32,

    /// Raw experience counter within the current level
    pub exp: f64,

    /// Experience required to finish the current level
    pub exp_next: f64,

    /// Gem mine level
    pub mine: f64,

    /// Treasury level
    pub treasury: f64,

    /// Character class id
    #[serde(default)]
    pub class_id: Option<u32>,
}

impl MemberStats {
    /// Stable key for this member across snapshots.
    ///
    /// Prefers the scan source's player id; falls back to the character
    /// name (names are unique per server in the source game).
    pub fn key(&self) -> &str {
        self.player_id.as_deref().unwrap_or(&self.name)
    }
}

/// One guild's roster as of a single scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoster {
    /// Guild key (server-unique)
    pub key: String,

    /// Display name
    pub name: String,

    /// Members present at scan time, in roster order
    pub members: Vec<MemberStats>,
}

/// One timestamped capture of all guild rosters on a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSnapshot {
    /// When the scan was taken
    pub scanned_at: DateTime<Utc>,

    /// Every guild captured by this scan
    pub guilds: Vec<GuildRoster>,
}

impl NormalizedSnapshot {
    /// Total member entries across all guilds (duplicates included).
    pub fn member_count(&self) -> usize {
        self.guilds.iter().map(|g| g.members.len()).sum()
    }
}

/// Caller-supplied metadata aligned positionally with the snapshot list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    /// Source identifier (file name, scan id, ...)
    pub id: String,

    /// Human-readable label
    #[serde(default)]
    pub label: Option<String>,
}
