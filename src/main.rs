use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use specimen_map::data::{LoadState, RecordStore};
use specimen_map::map::ClusterMode;
use specimen_map::palette::ColorBy;
use specimen_map::settings::ViewSettings;
use specimen_map::Engine;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "specimen-map")]
#[command(about = "Filter specimen records and export the map features to draw.", long_about = None)]
struct Args {
    /// Load specimen records from this JSON FILE.
    #[arg(short = 'r', long = "records", value_name = "FILE")]
    records: PathBuf,

    /// Restore filters from a shared URL query string (e.g. "family=Nymphalidae&sp=...").
    #[arg(short = 'q', long = "query", value_name = "QUERY", default_value = "")]
    query: String,

    /// Read persisted view settings from this JSON FILE.
    #[arg(short = 's', long = "settings", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Spread co-located taxa apart (overrides settings).
    #[arg(long = "scatter")]
    scatter: bool,

    /// Counting unit for co-located records: individuals, subspecies or species.
    #[arg(short = 'c', long = "cluster-mode", value_name = "MODE")]
    cluster_mode: Option<ClusterMode>,

    /// Attribute used for marker colors.
    #[arg(short = 'b', long = "color-by", value_name = "ATTR")]
    color_by: Option<ColorBy>,

    /// Write the displayed GeoJSON to this FILE instead of stdout.
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Write the color map as JSON to this FILE.
    #[arg(long = "colors", value_name = "FILE")]
    colors: Option<PathBuf>,

    /// Write the filter option lists as JSON to this FILE.
    #[arg(long = "options", value_name = "FILE")]
    options: Option<PathBuf>,

    /// Verbose output.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn load_settings(args: &Args) -> Result<ViewSettings> {
    let mut settings = match &args.settings {
        Some(path) => ViewSettings::load(path)?,
        None => ViewSettings::default(),
    };
    if args.scatter {
        settings.scatter = true;
    }
    if let Some(mode) = args.cluster_mode {
        settings.cluster_mode = mode;
    }
    if let Some(attr) = args.color_by {
        settings.color_by = attr;
    }
    Ok(settings)
}

fn run(args: Args) -> Result<()> {
    let settings = load_settings(&args)?;

    let store = RecordStore::load(&args.records);
    if let LoadState::Failed(reason) = store.state() {
        warn!("Continuing with an empty map: {}", reason);
    }

    let mut engine = Engine::new(store, settings);
    engine.restore_query(&args.query);

    info!(
        "{} of {} records pass {} active filters; {} features displayed",
        engine.filtered().len(),
        engine.store().len(),
        engine.filters().active_count(),
        engine.displayed().len()
    );
    info!("Share query: ?{}", engine.query_string());

    let geojson = engine.displayed().to_geojson().to_string();
    match &args.out {
        Some(path) => {
            fs::write(path, geojson).with_context(|| format!("writing {}", path.display()))?;
            info!("Saved features to {:?}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(geojson.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    if let Some(path) = &args.colors {
        let colors = serde_json::json!({
            "color_by": engine.settings().color_by,
            "colors": engine.color_map(),
            "counts": engine.legend_counts(),
        });
        fs::write(path, serde_json::to_string_pretty(&colors)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Saved color map to {:?}", path);
    }

    if let Some(path) = &args.options {
        let opts = engine.options();
        let json = serde_json::json!({
            "families": opts.families,
            "tribes": opts.tribes,
            "genera": opts.genera,
            "species": opts.species,
            "subspecies": opts.subspecies,
            "mimicry": opts.mimicry,
            "mimicry_available": opts.mimicry_available,
            "mimicry_unavailable": opts.mimicry_unavailable,
            "statuses": opts.statuses,
            "sources": opts.sources,
            "countries": opts.countries,
        });
        fs::write(path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Saved filter options to {:?}", path);
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    run(args)
}
