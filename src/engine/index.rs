//! Per-snapshot lookup tables.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{MemberStats, NormalizedSnapshot};

/// One indexed member entry.
#[derive(Debug, Clone)]
pub struct IndexedMember {
    pub stats: MemberStats,
    pub guild_key: String,
}

/// Lookup tables for one snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotIndex {
    pub date: DateTime<Utc>,

    /// player key → stats + guild at this snapshot (first occurrence wins)
    pub players: HashMap<String, IndexedMember>,

    /// guild key → ordered member keys
    pub guild_members: HashMap<String, Vec<String>>,

    /// guild key → display name
    pub guild_names: HashMap<String, String>,
}

impl SnapshotIndex {
    /// Build the lookup tables for one snapshot.
    pub fn build(snapshot: &NormalizedSnapshot) -> Self {
        let mut players = HashMap::new();
        let mut guild_members: HashMap<String, Vec<String>> = HashMap::new();
        let mut guild_names = HashMap::new();

        for guild in &snapshot.guilds {
            guild_names
                .entry(guild.key.clone())
                .or_insert_with(|| guild.name.clone());
            let member_keys = guild_members.entry(guild.key.clone()).or_default();

            for member in &guild.members {
                let key = member.key().to_string();
                member_keys.push(key.clone());
                players.entry(key).or_insert_with(|| IndexedMember {
                    stats: member.clone(),
                    guild_key: guild.key.clone(),
                });
            }
        }

        Self {
            date: snapshot.scanned_at,
            players,
            guild_members,
            guild_names,
        }
    }

    /// Guild keys present in this snapshot, sorted for determinism.
    pub fn guild_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.guild_members.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}
