use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guild_metrics::config::AppConfig;
use guild_metrics::engine;
use guild_metrics::models::{ComputeOptions, NormalizedSnapshot, SnapshotDescriptor};

#[derive(Parser)]
#[command(name = "guild-metrics")]
#[command(about = "Guild roster growth analytics and tier recommendations")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a dataset from normalized snapshot files
    Compute {
        /// Snapshot JSON file or directory of *.json files
        input: PathBuf,

        /// Dataset identifier (usually the server key)
        #[arg(long, default_value = "default")]
        dataset_id: String,

        /// Restrict the roster to these guild keys (repeatable)
        #[arg(long = "guild")]
        guilds: Vec<String>,

        /// JSON file mapping custom group ids to player key lists
        #[arg(long)]
        groups: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective configuration
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting guild-metrics v{}", env!("CARGO_PKG_VERSION"));

    let config_path = PathBuf::from(&cli.config);
    let config = if config_path.exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    match cli.command {
        Commands::Compute {
            input,
            dataset_id,
            guilds,
            groups,
            out,
            pretty,
        } => {
            let (snapshots, meta) = load_snapshots(&input)?;

            let mut options = ComputeOptions::default();
            if !guilds.is_empty() {
                options.guild_filter_keys = Some(guilds);
            }
            if let Some(path) = groups {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read groups file {}", path.display()))?;
                options.custom_groups = serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse groups file {}", path.display()))?;
            }

            let result =
                engine::compute_dataset(snapshots, meta, &dataset_id, options, &config)?;

            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!("Result written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::ShowConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Load snapshots from a single JSON file or every `*.json` in a directory.
///
/// Individual unreadable or unparsable files are skipped with a warning;
/// the computation tolerates a shorter snapshot list.
fn load_snapshots(input: &Path) -> Result<(Vec<NormalizedSnapshot>, Vec<SnapshotDescriptor>)> {
    let mut paths: Vec<PathBuf> = if input.is_dir() {
        std::fs::read_dir(input)
            .with_context(|| format!("Failed to read directory {}", input.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    } else {
        vec![input.to_path_buf()]
    };
    paths.sort();

    let mut snapshots = Vec::new();
    let mut meta = Vec::new();
    for path in paths {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Skipping unreadable snapshot {}: {}", path.display(), e);
                continue;
            }
        };
        match serde_json::from_str::<NormalizedSnapshot>(&contents) {
            Ok(snapshot) => {
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                snapshots.push(snapshot);
                meta.push(SnapshotDescriptor { id, label: None });
            }
            Err(e) => {
                tracing::warn!("Skipping unparsable snapshot {}: {}", path.display(), e);
            }
        }
    }

    tracing::info!("Loaded {} snapshots from {}", snapshots.len(), input.display());
    Ok((snapshots, meta))
}
