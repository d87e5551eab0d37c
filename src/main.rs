use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

use nearpoi::api::{AmapClient, RequestThrottler};
use nearpoi::config::FileConfig;
use nearpoi::domain::{Category, PoiCandidate};
use nearpoi::logging::init_logging;
use nearpoi::matching::merge_all_categories;
use nearpoi::search::{CategoryOutcome, NearbySearch, SearchOptions, SearchReport};

/// Find points of interest near an address, with travel times
///
/// Examples:
///   # Default categories around an address
///   nearpoi search "北京市朝阳区三里屯" --key $AMAP_KEY
///
///   # Only subway stations and parks, as JSON
///   nearpoi search "上海市徐汇区" --category 地铁站=150500 --category 公园=110101 --json
///
///   # De-duplicate a saved result set offline
///   nearpoi merge results.json
#[derive(Parser, Debug)]
#[command(name = "nearpoi")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (optional, auto-searches nearpoi.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search every category around an address
    Search(SearchArgs),
    /// Merge near-duplicates in a saved JSON result set
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Address to search around
    address: String,

    /// AMap web-service key
    #[arg(long, env = "AMAP_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Search radius in meters
    #[arg(short = 'r', long)]
    radius: Option<u32>,

    /// Places per category
    #[arg(short = 'n', long)]
    max_results: Option<u32>,

    /// Maximum requests in flight
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Minimum milliseconds between request starts
    #[arg(long)]
    min_spacing_ms: Option<u64>,

    /// Category as LABEL=CODE; repeat to search several (replaces configured categories)
    #[arg(short = 'c', long = "category")]
    categories: Vec<Category>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Keep near-duplicate places
    #[arg(long)]
    no_merge: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// JSON file mapping category labels to place lists
    file: PathBuf,

    /// Print the merged result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (file_config, skipped) = if let Some(ref config_path) = cli.config {
        if !config_path.exists() {
            bail!("Config file not found: {:?}", config_path);
        }
        (FileConfig::from_path(config_path)?, Vec::new())
    } else {
        let (found, skipped) = FileConfig::load();
        (found.unwrap_or_default(), skipped)
    };

    init_logging(cli.verbose || file_config.verbose);
    for err in &skipped {
        warn!(error = %err, "skipping config file");
    }

    match cli.command {
        Command::Search(args) => run_search(args, file_config).await,
        Command::Merge(args) => run_merge(&args.file, args.json, &file_config),
    }
}

async fn run_search(args: SearchArgs, mut config: FileConfig) -> Result<()> {
    if let Some(radius) = args.radius {
        config.search.radius_m = radius;
    }
    if let Some(max_results) = args.max_results {
        config.search.max_results = max_results;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        config.throttle.max_concurrent = max_concurrent;
    }
    if let Some(min_spacing_ms) = args.min_spacing_ms {
        config.throttle.min_spacing_ms = min_spacing_ms;
    }
    if !args.categories.is_empty() {
        config.categories = args.categories;
    }
    config.validate()?;

    let Some(key) = args.key.or_else(|| config.service.key.clone()) else {
        bail!("No API key: pass --key, set AMAP_KEY, or add service.key to the config file");
    };

    let throttler = RequestThrottler::new(config.throttle);
    let client = AmapClient::new(&config.service, key, throttler)
        .context("Failed to set up the geo service client")?;

    let mut options = SearchOptions::from_config(&config);
    options.merge = !args.no_merge;
    let search = NearbySearch::new(client, options);

    let spinner = create_spinner(&format!("Searching around {}...", args.address));
    let start = Instant::now();
    let result = search.search(&args.address).await;
    let stats = search.service().throttler().stats();
    spinner.finish_and_clear();

    let report = result.context("Search failed")?;
    eprintln!(
        "Found {} places in {} categories with {} requests [{:.1}s]",
        report.total_pois(),
        report.categories.len(),
        stats.dispatched,
        start.elapsed().as_secs_f32()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_merge(path: &Path, json: bool, config: &FileConfig) -> Result<()> {
    let contents = std::fs::read_to_string(path).context(format!("Failed to read {:?}", path))?;
    let results: BTreeMap<String, Vec<PoiCandidate>> =
        serde_json::from_str(&contents).context(format!("Failed to parse {:?}", path))?;

    config.validate()?;

    let before: usize = results.values().map(Vec::len).sum();
    let merged = merge_all_categories(results, &config.matching);
    let after: usize = merged.values().map(Vec::len).sum();
    eprintln!("Merged {} places into {}", before, after);

    if json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
    } else {
        for (label, pois) in &merged {
            print_category(label, pois);
        }
    }
    Ok(())
}

fn print_report(report: &SearchReport) {
    println!("{} -> {} ({})", report.address, report.origin, report.city);
    println!();

    for category in &report.categories {
        match &category.outcome {
            CategoryOutcome::Pois(pois) => print_category(&category.label, pois),
            CategoryOutcome::Unavailable(reason) => {
                println!("{}", category.label);
                println!("  (unavailable: {})", reason);
                println!();
            }
        }
    }
}

fn print_category(label: &str, pois: &[PoiCandidate]) {
    println!("{}", label);
    if pois.is_empty() {
        println!("  (no results)");
    }
    for poi in pois {
        println!("  {}", poi.name);
        if !poi.address.is_empty() {
            println!("    address:  {}", poi.address);
        }
        println!("    distance: {}", poi.distance);
        println!(
            "    driving:  {}  transit: {}  cycling: {}",
            poi.driving, poi.transit, poi.cycling
        );
    }
    println!();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_rejects_invalid_matching_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("results.json");
        std::fs::write(
            &input,
            r#"{"地铁站": [{"category": "地铁站", "name": "三里屯站", "distance": "500米"}]}"#,
        )
        .unwrap();

        let mut config = FileConfig::default();
        assert!(run_merge(&input, true, &config).is_ok());

        config.matching.name_threshold = 1.5;
        let err = run_merge(&input, true, &config).unwrap_err();
        assert!(err.to_string().contains("matching.name_threshold"));
    }
}
