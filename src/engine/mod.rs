//! The analytics computation engine.
//!
//! One call consumes the full ordered snapshot list and returns a fully
//! formed [`DatasetResult`]: per-player interval deltas, trailing-window
//! metrics, percentile rankings, composite scores with diagnostics, score
//! timelines and Main/Wing/None recommendations. The computation is pure,
//! synchronous and single-threaded; re-invocation recomputes from scratch.

pub mod baseline;
pub mod index;
pub mod percentile;
pub mod rank;
pub mod roster;
pub mod score;
pub mod series;
pub mod timeline;
pub mod window;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::models::{
    finite_or_zero, ComputeOptions, DatasetResult, GuildComputed, Metric, NormalizedSnapshot,
    PlayerComputed, Recommendation, ScoreWeights, SeriesPoint, SnapshotDescriptor,
    SnapshotSummary, TopMover, WindowKey, WindowMeta,
};

use baseline::PaceSample;
use index::SnapshotIndex;
use percentile::rank_percentiles;
use roster::RosterUniverse;
use score::ScoreInputs;
use window::{resolve_window, window_metric, window_points};

/// Input-contract violations. Everything else degrades to a best-effort
/// result instead of erroring.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("snapshot list is empty")]
    EmptySnapshots,

    #[error("snapshot metadata misaligned: {snapshots} snapshots, {meta} descriptors")]
    MisalignedMeta { snapshots: usize, meta: usize },
}

/// Latest-known display identity of a player.
struct PlayerIdentity {
    name: String,
    class_id: Option<u32>,
}

/// Run the full analytics pipeline over one dataset.
///
/// `snapshot_meta[i]` must correspond to `snapshots[i]` before sorting; both
/// are reordered together by `scanned_at`.
pub fn compute_dataset(
    snapshots: Vec<NormalizedSnapshot>,
    snapshot_meta: Vec<SnapshotDescriptor>,
    dataset_id: &str,
    options: ComputeOptions,
    config: &AppConfig,
) -> Result<DatasetResult, ComputeError> {
    if snapshots.is_empty() {
        return Err(ComputeError::EmptySnapshots);
    }
    if snapshots.len() != snapshot_meta.len() {
        return Err(ComputeError::MisalignedMeta {
            snapshots: snapshots.len(),
            meta: snapshot_meta.len(),
        });
    }

    info!(dataset_id, snapshots = snapshots.len(), "computing dataset");

    let mut paired: Vec<(NormalizedSnapshot, SnapshotDescriptor)> =
        snapshots.into_iter().zip(snapshot_meta).collect();
    paired.sort_by_key(|(snap, _)| snap.scanned_at);

    let indexes: Vec<SnapshotIndex> = paired
        .iter()
        .map(|(snap, _)| SnapshotIndex::build(snap))
        .collect();

    let snapshot_summaries: Vec<SnapshotSummary> = paired
        .iter()
        .map(|(snap, meta)| SnapshotSummary {
            date: snap.scanned_at,
            id: meta.id.clone(),
            label: meta.label.clone(),
            guild_count: snap.guilds.len(),
            player_count: snap.member_count(),
        })
        .collect();

    let universe = roster::resolve_universe(&indexes, options.guild_filter_keys.as_deref());

    let (points_by_player, identities) = assemble_points(&indexes, config);
    let series_by_player: BTreeMap<String, _> = points_by_player
        .iter()
        .map(|(key, points)| (key.clone(), series::build_series(points)))
        .collect();

    let dates = dataset_dates(&indexes);
    let window_metas: HashMap<WindowKey, Option<WindowMeta>> = WindowKey::ALL
        .iter()
        .map(|&key| (key, resolve_window(&dates, key)))
        .collect();

    let interval_avgs = baseline::interval_baselines(series_by_player.values());
    let player_groups = invert_custom_groups(&options);

    debug!("scoring {} players", points_by_player.len());
    let mut computed = score_all_players(
        &points_by_player,
        &series_by_player,
        &identities,
        &window_metas,
        &interval_avgs,
        &player_groups,
        config,
    );

    let timeline_ctx = timeline::build_timeline_context(
        &dates,
        &points_by_player,
        interval_avgs,
        &config.engine,
        ScoreWeights::default(),
    );
    for player in computed.values_mut() {
        player.score_timeline =
            timeline::build_timeline(&points_by_player[&player.key], &timeline_ctx);
    }

    // Roster and global copies diverge from here: percentiles, rank and
    // recommendations are relative to their own population.
    let mut players: Vec<PlayerComputed> = universe
        .roster_player_keys
        .iter()
        .filter_map(|key| computed.get(key).cloned())
        .collect();
    let mut global_players: Vec<PlayerComputed> = universe
        .global_player_keys
        .iter()
        .filter_map(|key| computed.remove(key))
        .collect();

    finalize_population(&mut players, config);
    finalize_population(&mut global_players, config);
    let recommendations = rank::assign_recommendations(&mut players, &config.engine);
    // The global view gets the identical partition procedure; only the
    // roster lists are published.
    rank::assign_recommendations(&mut global_players, &config.engine);

    let top_movers = top_movers(&players, config.engine.top_mover_limit);
    let guilds = build_guilds(&indexes, &universe, &window_metas);

    info!(
        roster_players = players.len(),
        global_players = global_players.len(),
        guilds = guilds.len(),
        "dataset computed"
    );

    Ok(DatasetResult {
        dataset_id: dataset_id.to_string(),
        snapshots: snapshot_summaries,
        players,
        global_players,
        guilds,
        top_movers,
        recommendations,
    })
}

/// Sorted snapshot dates with duplicates collapsed.
fn dataset_dates(indexes: &[SnapshotIndex]) -> Vec<DateTime<Utc>> {
    let mut dates: Vec<DateTime<Utc>> = indexes.iter().map(|i| i.date).collect();
    dates.dedup();
    dates
}

/// Per-player sorted point histories plus latest display identities.
fn assemble_points(
    indexes: &[SnapshotIndex],
    config: &AppConfig,
) -> (HashMap<String, Vec<SeriesPoint>>, HashMap<String, PlayerIdentity>) {
    let mut points_by_player: HashMap<String, Vec<SeriesPoint>> = HashMap::new();
    let mut identities: HashMap<String, PlayerIdentity> = HashMap::new();

    for index in indexes {
        for (key, member) in &index.players {
            identities.insert(
                key.clone(),
                PlayerIdentity {
                    name: member.stats.name.clone(),
                    class_id: member.stats.class_id,
                },
            );

            let points = points_by_player.entry(key.clone()).or_default();
            // Points are unique by date; a second scan at the same instant
            // is ignored
            if points.last().is_some_and(|p| p.date == index.date) {
                continue;
            }
            points.push(SeriesPoint {
                date: index.date,
                base_stats: finite_or_zero(member.stats.base_stats),
                level: member.stats.level,
                exp: finite_or_zero(member.stats.exp),
                exp_next: finite_or_zero(member.stats.exp_next),
                mine: finite_or_zero(member.stats.mine),
                treasury: finite_or_zero(member.stats.treasury),
                guild_key: Some(member.guild_key.clone()),
                exp_total: 0.0,
            });
        }
    }

    for points in points_by_player.values_mut() {
        series::attach_exp_totals(points, &config.game);
    }

    (points_by_player, identities)
}

/// player key → custom group id (first group naming the key wins).
fn invert_custom_groups(options: &ComputeOptions) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut group_ids: Vec<&String> = options.custom_groups.keys().collect();
    group_ids.sort();
    for group_id in group_ids {
        for key in &options.custom_groups[group_id] {
            map.entry(key.clone()).or_insert_with(|| group_id.clone());
        }
    }
    map
}

fn score_all_players(
    points_by_player: &HashMap<String, Vec<SeriesPoint>>,
    series_by_player: &BTreeMap<String, HashMap<Metric, crate::models::MetricSeries>>,
    identities: &HashMap<String, PlayerIdentity>,
    window_metas: &HashMap<WindowKey, Option<WindowMeta>>,
    interval_avgs: &HashMap<(i64, i64), f64>,
    player_groups: &HashMap<String, String>,
    config: &AppConfig,
) -> BTreeMap<String, PlayerComputed> {
    let weights = ScoreWeights::default();

    // Window pace metrics first: the baselines need every player's pace
    // before anyone can be scored.
    let mut window_metrics: HashMap<String, HashMap<WindowKey, HashMap<Metric, _>>> =
        HashMap::new();
    for (key, points) in points_by_player {
        let per_window = window_metrics.entry(key.clone()).or_default();
        for (&window, meta) in window_metas {
            let Some(meta) = meta else { continue };
            let per_metric = per_window.entry(window).or_insert_with(HashMap::new);
            for metric in Metric::ALL {
                if let Some(m) = window_metric(points, meta, metric) {
                    per_metric.insert(metric, m);
                }
            }
        }
    }

    let baselines_by_window: HashMap<WindowKey, baseline::WindowBaselines> = window_metas
        .iter()
        .map(|(&window, meta)| {
            let samples: Vec<PaceSample> = match meta {
                Some(meta) => points_by_player
                    .iter()
                    .filter_map(|(key, points)| {
                        let pace = window_metrics[key]
                            .get(&window)?
                            .get(&Metric::BaseStats)?;
                        let (start, _) = window_points(points, meta)?;
                        let last = points.last()?;
                        let abs = finite_or_zero(pace.per_day).max(0.0);
                        Some(PaceSample {
                            key: key.clone(),
                            current_base_stats: last.base_stats,
                            guild_key: last.guild_key.clone(),
                            abs_per_day: abs,
                            rel_per_day: abs / start.base_stats.max(1e6),
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };
            (
                window,
                baseline::build_window_baselines(&samples, player_groups, &config.engine),
            )
        })
        .collect();

    points_by_player
        .iter()
        .map(|(key, points)| {
            let identity = &identities[key];
            let series = &series_by_player[key];
            let latest = points.last();

            let mut scores = HashMap::new();
            for (&window, meta) in window_metas {
                let breakdown = match meta {
                    Some(meta) => {
                        let metric = window_metrics[key]
                            .get(&window)
                            .and_then(|m| m.get(&Metric::BaseStats));
                        let realized: Vec<_> = series[&Metric::BaseStats]
                            .intervals
                            .iter()
                            .filter(|iv| {
                                iv.start_date >= meta.start_date && iv.end_date <= meta.end_date
                            })
                            .cloned()
                            .collect();
                        let inputs = ScoreInputs {
                            player_key: key,
                            metric,
                            boundary_points: window_points(points, meta),
                            realized_intervals: &realized,
                            possible_intervals: meta.possible_intervals,
                            guild_key: latest.and_then(|p| p.guild_key.as_deref()),
                            custom_group: player_groups.get(key).map(|g| g.as_str()),
                        };
                        score::score_window(
                            &inputs,
                            &baselines_by_window[&window],
                            interval_avgs,
                            weights,
                        )
                    }
                    None => crate::models::ScoreBreakdown::neutral(weights),
                };
                scores.insert(window, breakdown);
            }

            let player = PlayerComputed {
                key: key.clone(),
                name: identity.name.clone(),
                guild_key: latest.and_then(|p| p.guild_key.clone()),
                class_id: identity.class_id,
                points: points.clone(),
                series: series.clone(),
                window_metrics: window_metrics[key].clone(),
                percentiles: HashMap::new(),
                resource_percentile: 0.0,
                scores,
                score_timeline: Vec::new(),
                rank: 0,
                recommendation: Recommendation::None,
                strengths: Vec::new(),
                weaknesses: Vec::new(),
            };
            (key.clone(), player)
        })
        .collect()
}

/// Percentiles, rank and tags relative to one population.
fn finalize_population(players: &mut [PlayerComputed], config: &AppConfig) {
    for metric in Metric::ALL {
        let values: HashMap<String, f64> = players
            .iter()
            .filter_map(|p| p.latest_point().map(|pt| (p.key.clone(), metric.of(pt))))
            .collect();
        let pcts = rank_percentiles(&values);
        for player in players.iter_mut() {
            if let Some(&pct) = pcts.get(&player.key) {
                player.percentiles.insert(metric, pct);
            }
        }
    }

    let resource: HashMap<String, f64> = players
        .iter()
        .filter_map(|p| {
            p.latest_point()
                .map(|pt| (p.key.clone(), pt.mine + pt.treasury))
        })
        .collect();
    let pcts = rank_percentiles(&resource);
    for player in players.iter_mut() {
        if let Some(&pct) = pcts.get(&player.key) {
            player.resource_percentile = pct;
        }
        rank::assign_tags(player, &config.game);
    }

    rank::assign_ranks(players);
    // Tags depend on percentiles set above; rank resorts, so retag is not
    // needed, only ordering changed.
}

/// Roster top movers per window per metric.
fn top_movers(
    players: &[PlayerComputed],
    limit: usize,
) -> HashMap<WindowKey, HashMap<Metric, Vec<TopMover>>> {
    WindowKey::ALL
        .iter()
        .map(|&window| {
            let per_metric = Metric::ALL
                .iter()
                .map(|&metric| {
                    let mut movers: Vec<TopMover> = players
                        .iter()
                        .filter_map(|p| {
                            let m = p.window_metrics.get(&window)?.get(&metric)?;
                            Some(TopMover {
                                key: p.key.clone(),
                                name: p.name.clone(),
                                per_day: m.per_day,
                            })
                        })
                        .collect();
                    movers.sort_by(|a, b| {
                        b.per_day
                            .partial_cmp(&a.per_day)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    movers.truncate(limit);
                    (metric, movers)
                })
                .collect();
            (window, per_metric)
        })
        .collect()
}

/// Roster-average guild aggregates.
fn build_guilds(
    indexes: &[SnapshotIndex],
    universe: &RosterUniverse,
    window_metas: &HashMap<WindowKey, Option<WindowMeta>>,
) -> Vec<GuildComputed> {
    universe
        .roster_guild_keys
        .iter()
        .map(|guild_key| {
            let mut points: Vec<SeriesPoint> = Vec::new();
            let mut name = guild_key.clone();
            let mut member_count = 0;

            for index in indexes {
                let Some(members) = index.guild_members.get(guild_key) else {
                    continue;
                };
                if members.is_empty() {
                    continue;
                }
                if points.last().is_some_and(|p| p.date == index.date) {
                    continue;
                }

                let n = members.len() as f64;
                let mut base_stats = 0.0;
                let mut level = 0.0;
                let mut mine = 0.0;
                let mut treasury = 0.0;
                for key in members {
                    if let Some(member) = index.players.get(key) {
                        base_stats += finite_or_zero(member.stats.base_stats);
                        level += member.stats.level as f64;
                        mine += finite_or_zero(member.stats.mine);
                        treasury += finite_or_zero(member.stats.treasury);
                    }
                }

                points.push(SeriesPoint {
                    date: index.date,
                    base_stats: base_stats / n,
                    level: (level / n).round() as u32,
                    exp: 0.0,
                    exp_next: 0.0,
                    mine: mine / n,
                    treasury: treasury / n,
                    guild_key: Some(guild_key.clone()),
                    exp_total: 0.0,
                });
                if let Some(display) = index.guild_names.get(guild_key) {
                    name = display.clone();
                }
                member_count = members.len();
            }

            let series = series::build_series(&points);
            let mut metrics = HashMap::new();
            for (&window, meta) in window_metas {
                let Some(meta) = meta else { continue };
                let per_metric: HashMap<Metric, _> = Metric::ALL
                    .iter()
                    .filter_map(|&metric| {
                        window_metric(&points, meta, metric).map(|m| (metric, m))
                    })
                    .collect();
                metrics.insert(window, per_metric);
            }

            GuildComputed {
                key: guild_key.clone(),
                name,
                member_count,
                points,
                series,
                window_metrics: metrics,
            }
        })
        .collect()
}
