//! tmdb-harvest main entry point
//!
//! This is the command-line interface for the TMDb metadata harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tmdb_harvest::config::{load_config_with_hash, Config};
use tmdb_harvest::harvest::{run_harvest, Coordinator, HarvestOutcome};
use tmdb_harvest::output::{export_jsonl, load_statistics, print_statistics};
use tmdb_harvest::storage::{lock, SqliteStorage};
use tracing_subscriber::EnvFilter;

/// tmdb-harvest: resumable TMDb metadata collection
///
/// Collects movies, series, their extras and people from The Movie Database.
/// Uses the API when a key is configured and falls back to the website when
/// the API stops answering. Interrupted runs resume from their checkpoint.
#[derive(Parser, Debug)]
#[command(name = "tmdb-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Resumable TMDb metadata harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard the stored checkpoint and start from the beginning
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be collected without any network access
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Write every stored record as JSON Lines to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = cli.export.as_deref() {
        handle_export(&config, path)?;
    } else {
        handle_harvest(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tmdb_harvest=info,warn"),
            1 => EnvFilter::new("tmdb_harvest=debug,info"),
            2 => EnvFilter::new("tmdb_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be collected
fn handle_dry_run(config: &Config) {
    println!("=== tmdb-harvest Dry Run ===\n");

    println!("Harvest:");
    println!("  Content types: {:?}", config.harvest.content_type.content_types());
    println!("  Results wanted: {}", config.harvest.results_wanted);
    println!("  Max pages per query: {}", config.harvest.max_pages);
    println!("  Max concurrency: {}", config.harvest.max_concurrency);
    println!(
        "  Source: {}",
        match (config.network.active_api_key(), config.harvest.use_api_first) {
            (Some(_), true) => "API first, website fallback",
            _ => "website only",
        }
    );

    println!("\nQueries:");
    for query in config.content_queries() {
        println!("  - {}", query);
    }
    if config.harvest.search_queries.is_empty() {
        println!("  Sort: {}", config.discover.sort_by);
        if let Some(genres) = config.discover.genre_list() {
            println!("  Genres: {}", genres);
        }
        if let (Some(from), to) = (config.discover.year_from, config.discover.year_to) {
            println!("  Years: {}..{}", from, to.map(|y| y.to_string()).unwrap_or_default());
        }
    }

    let extras = &config.extras;
    println!("\nExtras:");
    println!("  Credits: {}", extras.collect_credits);
    println!(
        "  Reviews: {} (max {})",
        extras.collect_reviews, extras.max_reviews_per_content
    );
    println!("  Keywords: {}", extras.collect_keywords);
    println!(
        "  Images: {} (max {})",
        extras.collect_images, extras.max_images_per_content
    );
    println!("  Collections: {}", extras.collect_collections);

    let people = config.people_queries();
    if !people.is_empty() {
        println!("\nPeople ({} per query):", config.people.results_wanted);
        for query in people {
            println!("  - {}", query);
        }
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes stored records as JSON Lines
fn handle_export(config: &Config, path: &Path) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let count = export_jsonl(&storage, path)
        .with_context(|| format!("failed to export to {}", path.display()))?;
    println!("✓ Exported {} records to {}", count, path.display());
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring stored checkpoint)");
    } else {
        tracing::info!("Starting harvest (will resume from a stored checkpoint)");
    }

    let mut coordinator = Coordinator::new(config, config_hash, fresh)?;
    match run_harvest(&mut coordinator).await? {
        HarvestOutcome::Completed(stats) => {
            let storage = coordinator.storage();
            let totals = load_statistics(&*lock(&storage)?)?;
            tracing::info!(
                "Harvest finished: {} new content items, {} records in the database",
                stats.contents,
                totals.total_records
            );
        }
        HarvestOutcome::Interrupted => {
            tracing::info!("Harvest interrupted; run again to resume");
        }
    }

    Ok(())
}
