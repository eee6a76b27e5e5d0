use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use playlist_snapshot_collector as lib;
use lib::api::spotify::SpotifyClient;
use lib::config::Config;
use lib::reconcile::Outcome;
use lib::store::{DatedLayout, FsStore};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "playlist-snapshot-collector", version)]
struct Cli {
    /// Path to config file (TOML, or JSON when it ends in .json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the playlist and write this month's snapshot or today's changes
    Collect {
        /// Date to file the run under (defaults to today, local time)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// Fetch the playlist and print the normalized tracks as JSON; writes nothing
    Fetch,
    /// Authorize against Spotify and cache the token (interactive)
    Auth,
    /// Validate config file and exit
    ConfigValidate,
}

fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let toml_path = Path::new("config.toml");
            if toml_path.exists() {
                toml_path.to_path_buf()
            } else {
                PathBuf::from("config.json")
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    if let Commands::ConfigValidate = cli.command {
        match Config::from_path(&config_path).and_then(|c| c.validate()) {
            Ok(()) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {:#}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    // Parse first so log_dir is known, then resolve the secret once logging is up.
    let mut cfg = Config::from_path(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let _log_guard = lib::logging::init_logging(cfg.log_dir.as_deref())?;
    cfg.apply_env_secret();
    cfg.validate()?;

    let client = SpotifyClient::from_config(&cfg);

    match cli.command {
        Commands::Collect { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let outcome = lib::collect::run_collect(
                &client,
                &FsStore,
                DatedLayout::new(&cfg.data_dir),
                &cfg.playlist_id,
                date,
            )
            .await
            .context("running collect")?;
            match outcome {
                Outcome::SnapshotCreated { path, tracks } => {
                    println!("Full snapshot saved to {} ({} tracks)", path.display(), tracks);
                }
                Outcome::DeltaWritten { path, added, removed } => {
                    println!("Changes saved to {} ({} added, {} removed)", path.display(), added, removed);
                }
                Outcome::NoChanges => println!("No changes detected."),
            }
        }
        Commands::Fetch => {
            let tracks = lib::fetcher::fetch_playlist_tracks(&client, &cfg.playlist_id).await?;
            println!("{}", serde_json::to_string_pretty(&tracks)?);
        }
        Commands::Auth => {
            lib::api::spotify_auth::run_spotify_auth(&cfg, &client).await?;
        }
        // handled above, before logging init
        Commands::ConfigValidate => {}
    }

    Ok(())
}
