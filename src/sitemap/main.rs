//! Site map generator.
//!
//! Draws field sites from a table over a shapefile basemap, coloured by
//! temperature, with an overview inset marking the study area.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sitemap::config::MapConfig;
use sitemap::pipeline::{run, PipelineInputs};

#[derive(Parser, Debug)]
#[command(name = "sitemap")]
#[command(about = "Render a site map with an overview inset to PNG")]
struct Args {
    /// Shapefile directory (or .shp file) for the basemap
    #[arg(short, long)]
    basemap: PathBuf,

    /// Site table: CSV, TSV, gzip-compressed CSV/TSV, or a workbook
    #[arg(short, long)]
    sites: PathBuf,

    /// Output PNG
    #[arg(short, long, default_value = "map.png")]
    output: PathBuf,

    /// TOML configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bounding box margin in degrees
    #[arg(long)]
    margin: Option<f64>,

    /// Output resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// CRS assigned to the basemap (EPSG code, PROJ string or WKT)
    #[arg(long)]
    crs: Option<String>,

    /// Write a JSON summary of the map here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => MapConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MapConfig::default(),
    };
    if let Some(margin) = args.margin {
        config.margin = margin;
    }
    if let Some(dpi) = args.dpi {
        config.output.dpi = dpi;
    }
    if let Some(crs) = args.crs {
        config.crs = crs;
    }

    info!("Site map generator");
    info!("Basemap: {}", args.basemap.display());
    info!("Sites: {}", args.sites.display());

    let inputs = PipelineInputs {
        basemap: args.basemap,
        sites: args.sites,
        output: args.output,
        summary: args.summary,
    };

    let outcome = run(&inputs, &config)
        .with_context(|| format!("Failed to produce {}", inputs.output.display()))?;

    info!(
        "Done: {} sites, {}x{} px, {}",
        outcome.site_count,
        outcome.dimensions.0,
        outcome.dimensions.1,
        inputs.output.display()
    );
    Ok(())
}
