//! Place investigation CLI.
//!
//! Searches OpenStreetMap through Overpass for places matching a name inside
//! a region, then reports chains (one name at many locations) and near-miss
//! spellings.

mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use place_detective::analysis::analyze;
use place_detective::config::Config;
use place_detective::find_similar_names;
use place_detective::models::{MatchMode, Place, SearchSpec, TypeFilter};
use place_detective::pipeline::{ProgressEvent, ProgressSink, TileOutcome};
use place_detective::{Investigator, OverpassClient, RegionLookup, Scope};

use crate::output::OutputFormat;

/// Similar names shown after the broad search
const SIMILAR_NAMES_SHOWN: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "detective")]
#[command(about = "Investigate places, chains and similar spellings in OpenStreetMap")]
struct Args {
    /// Place name to search for
    #[arg(short, long)]
    search: String,

    /// Region to search (built-in or from the config file)
    #[arg(short, long, default_value = "bangkok")]
    city: String,

    /// Search the city proper or the whole province
    #[arg(long, default_value = "city")]
    area_scope: Scope,

    /// Place types, as `key` or `key=value` (e.g. amenity=restaurant).
    /// A bare `-t` searches every type.
    #[arg(short, long, num_args = 0..)]
    types: Vec<String>,

    /// Match the name exactly instead of as a case-insensitive substring
    #[arg(long)]
    exact: bool,

    /// Disable name-variation detection and the similar-name expansion
    #[arg(long)]
    no_fuzzy: bool,

    /// Minimum similarity (0-100) for two names to count as variations
    #[arg(long, default_value_t = 85)]
    fuzzy_threshold: i64,

    /// Server-side query timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// File for json/csv output (a timestamped name is generated if omitted)
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upper bound on tiles for large areas [default: 16]
    #[arg(long)]
    max_tiles: Option<usize>,

    /// Tiles fetched at the same time [default: 2]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Overpass interpreter URL
    #[arg(long)]
    endpoint: Option<String>,
}

/// Progress bar over tiles, advanced as each tile finishes.
struct TileProgress {
    bar: ProgressBar,
}

impl TileProgress {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tiles {msg}",
                )?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for TileProgress {
    fn on_tile(&self, event: &ProgressEvent) {
        self.bar.set_length(event.total as u64);
        self.bar.inc(1);
        match &event.outcome {
            TileOutcome::Succeeded { records, .. } => {
                self.bar.set_message(format!("(+{} from {})", records, event.area));
            }
            TileOutcome::Failed { reason, .. } => {
                self.bar
                    .println(format!("tile {} failed: {}", event.index + 1, reason));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    let regions = config.region_table()?;
    let area = regions.lookup(&args.city, args.area_scope).with_context(|| {
        format!("Known regions: {}", regions.names().join(", "))
    })?;

    let mode = if args.exact {
        MatchMode::Exact
    } else {
        MatchMode::Partial
    };
    let filters = args
        .types
        .iter()
        .map(|t| TypeFilter::parse(t))
        .collect::<place_detective::Result<Vec<_>>>()?;
    let spec = SearchSpec::builder(&args.search, mode)
        .filters(filters)
        .timeout(Duration::from_secs(args.timeout))
        .fuzzy(!args.no_fuzzy)
        .fuzzy_threshold(args.fuzzy_threshold)
        .build()
        .context("Invalid search parameters")?;

    let mut settings = config.settings();
    if let Some(max_tiles) = args.max_tiles {
        settings.max_tiles = max_tiles;
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency.max(1);
    }
    let endpoint = args
        .endpoint
        .as_deref()
        .unwrap_or(config.overpass.endpoint.as_str());

    let client = OverpassClient::new(endpoint, &config.overpass.user_agent)?;
    let investigator = Investigator::new(client)
        .with_retry(config.retry_policy())
        .with_settings(settings)
        .with_partitioner(config.partitioner()?);

    info!(
        "Investigating '{}' in {} ({} scope, {})",
        spec.term(),
        args.city,
        args.area_scope,
        area
    );
    info!("Endpoint: {}", endpoint);

    let progress = TileProgress::new()?;
    let investigation = investigator
        .investigate(&spec, &area, &progress)
        .await
        .context("Investigation failed")?;
    progress.finish();

    let places = &investigation.places;
    info!(
        "Found {} place(s) matching '{}' ({} records, {} duplicates removed)",
        places.len(),
        spec.term(),
        investigation.records_received,
        investigation.duplicates_removed
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if places.is_empty() {
        writeln!(out, "No places found with the specified criteria")?;
    } else {
        emit_places(&args, places, &mut out)?;
    }

    let report = analyze(places, &spec);
    if !places.is_empty() {
        writeln!(out)?;
        writeln!(out, "== Analysis ==")?;
        output::write_analysis(&report, places, &mut out)?;
    }

    if spec.fuzzy_enabled() && !places.is_empty() {
        writeln!(out)?;
        writeln!(out, "== Similar places to '{}' ==", spec.term())?;
        info!("Gathering all named places in the area for fuzzy matching");

        let progress = TileProgress::new()?;
        let broad = investigator
            .investigate_broad(&spec, &area, &progress)
            .await
            .context("Broad search failed")?;
        progress.finish();

        if !broad.is_complete() {
            warn!(
                "{} of {} tiles failed during the broad search",
                broad.failed_count(),
                broad.tiles_total
            );
        }

        let names = broad.places.iter().filter_map(Place::name);
        let mut similar = find_similar_names(spec.term(), names, spec.fuzzy_threshold());
        similar.truncate(SIMILAR_NAMES_SHOWN);
        if similar.is_empty() {
            writeln!(out, "No similar places found for '{}'", spec.term())?;
        } else {
            output::write_similar(&similar, &broad.places, &mut out)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "== Summary ==")?;
    output::write_summary(spec.term(), &investigation, &report, &mut out)?;

    Ok(())
}

/// Print the places, or save them to a file for json/csv.
fn emit_places(args: &Args, places: &[Place], out: &mut impl Write) -> Result<()> {
    let Some(extension) = args.output.extension() else {
        return output::write_table(places, out);
    };

    let path = args.output_file.clone().unwrap_or_else(|| {
        PathBuf::from(output::default_filename(
            &args.search,
            &args.city,
            extension,
            Local::now().naive_local(),
        ))
    });
    let file = File::create(&path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match args.output {
        OutputFormat::Json => output::write_json(places, &mut writer)?,
        OutputFormat::Csv => output::write_csv(places, &mut writer)?,
        OutputFormat::Table => {}
    }
    writer.flush()?;

    writeln!(out, "Saved {} place(s) to {}", places.len(), path.display())?;
    Ok(())
}
