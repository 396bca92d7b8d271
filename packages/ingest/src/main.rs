#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ERB map feed loader.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use erb_map_cli_utils::{IndicatifProgress, MultiProgress};
use erb_map_ingest::report::{render_stats, write_dataset};
use erb_map_ingest::{LoadRequest, SCHEMA_ENV_VAR, all_schemas, load_file};
use erb_map_ingest_models::LoadedDataset;

#[derive(Parser)]
#[command(name = "erb_map_ingest", about = "Cell-tower call record loader")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command that reads a feed.
#[derive(clap::Args)]
struct FeedArgs {
    /// Newline-delimited JSON feed
    feed: PathBuf,
    /// Embedded schema ID (e.g., "labeled")
    #[arg(long, env = SCHEMA_ENV_VAR)]
    schema: Option<String>,
    /// Schema TOML file, overrides `--schema`
    #[arg(long)]
    schema_file: Option<PathBuf>,
    /// Pipeline config TOML file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for color assignment (reproducible output)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a feed and write the placed, aggregated dataset as JSON
    Load {
        #[command(flatten)]
        feed: FeedArgs,
        /// Write JSON here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Load a feed and print its summary statistics
    Stats {
        #[command(flatten)]
        feed: FeedArgs,
    },
    /// List the embedded feed schemas
    Schemas,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = erb_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return erb_map_ingest::interactive::run(&multi);
    };

    match command {
        Commands::Schemas => {
            let schemas = all_schemas();
            println!("{:<12} NAME", "ID");
            println!("{}", "-".repeat(50));
            for schema in &schemas {
                println!("{:<12} {}", schema.id(), schema.name());
            }
        }
        Commands::Load { feed, output } => {
            let dataset = run_load(feed, &multi)?;
            write_dataset(&dataset, output.as_deref())?;
        }
        Commands::Stats { feed } => {
            let dataset = run_load(feed, &multi)?;
            print!("{}", render_stats(&dataset.stats));
        }
    }

    Ok(())
}

fn run_load(
    args: FeedArgs,
    multi: &MultiProgress,
) -> Result<LoadedDataset, Box<dyn std::error::Error>> {
    let name = args
        .feed
        .file_name()
        .map_or_else(|| args.feed.display().to_string(), |n| n.to_string_lossy().into_owned());
    let progress = IndicatifProgress::load_bar(multi, &name);

    let request = LoadRequest {
        feed: args.feed,
        schema: args.schema,
        schema_file: args.schema_file,
        config: args.config,
        seed: args.seed,
    };
    Ok(load_file(&request, progress)?)
}
