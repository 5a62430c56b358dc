//! Roster universe resolution.

use std::collections::BTreeSet;

use tracing::debug;

use super::index::SnapshotIndex;

/// The two player populations a dataset computation works over.
#[derive(Debug, Clone)]
pub struct RosterUniverse {
    /// Guild keys in scope, from the latest snapshot (filtered)
    pub roster_guild_keys: Vec<String>,

    /// Players that were ever a member of a roster guild, any snapshot
    pub roster_player_keys: BTreeSet<String>,

    /// Every player observed in any snapshot, any guild
    pub global_player_keys: BTreeSet<String>,
}

/// Resolve the roster from the latest snapshot's guilds.
///
/// Filter keys absent from the latest snapshot are dropped silently; the
/// roster population collects members of the resolved guilds across the
/// whole history, not just the latest scan.
pub fn resolve_universe(
    indexes: &[SnapshotIndex],
    guild_filter_keys: Option<&[String]>,
) -> RosterUniverse {
    let latest = indexes.last();

    let roster_guild_keys: Vec<String> = match latest {
        Some(index) => index
            .guild_keys()
            .into_iter()
            .filter(|key| match guild_filter_keys {
                Some(filter) => filter.iter().any(|f| f == key),
                None => true,
            })
            .map(|k| k.to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut roster_player_keys = BTreeSet::new();
    let mut global_player_keys = BTreeSet::new();

    for index in indexes {
        global_player_keys.extend(index.players.keys().cloned());
        for guild_key in &roster_guild_keys {
            if let Some(members) = index.guild_members.get(guild_key) {
                roster_player_keys.extend(members.iter().cloned());
            }
        }
    }

    debug!(
        guilds = roster_guild_keys.len(),
        roster_players = roster_player_keys.len(),
        global_players = global_player_keys.len(),
        "resolved roster universe"
    );

    RosterUniverse {
        roster_guild_keys,
        roster_player_keys,
        global_player_keys,
    }
}
