// Entry point and high-level CLI flow.
//
// One invocation builds one dashboard:
// - fetch the ZHVI table for the selected geography and home type,
// - reshape it to yearly averages and join it onto the boundary features,
// - write the map layer and chart data, and preview the charts as tables.
mod config;
mod dashboard;
mod error;
mod join;
mod loader;
mod map;
mod output;
mod reports;
mod transform;
mod types;
mod util;

use clap::Parser;
use config::{DashboardConfig, Geography, HomeType};
use loader::{CsvFileSource, RegionSource, ZillowSource};
use log::info;
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "zhvi_dashboard", about = "Zillow Home Value Index dashboard by state or county")]
struct Args {
    /// State or county geometry level.
    #[arg(long, value_enum, default_value = "state")]
    geography: Geography,

    #[arg(long, value_enum, default_value = "combined")]
    home_type: HomeType,

    /// Year to average, 2018 through 2022.
    #[arg(long, default_value_t = 2022)]
    year: i32,

    /// Months of data a region needs before it gets a yearly average.
    #[arg(long, default_value_t = 1)]
    min_months: usize,

    #[arg(long, default_value = "assets/states_geom.json")]
    states_geometry: PathBuf,

    #[arg(long, default_value = "assets/county_geom.json")]
    counties_geometry: PathBuf,

    /// Read a downloaded ZHVI CSV instead of fetching it.
    #[arg(long)]
    source_csv: Option<PathBuf>,

    #[arg(long, default_value = "dashboard")]
    out_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = DashboardConfig::new(args.geography, args.home_type, args.year, args.min_months)?;
    info!(
        "Building {} dashboard for {} homes in {}",
        config.geography.title(),
        config.home_type.name(),
        config.year
    );

    let geometry_path = match config.geography {
        Geography::State => &args.states_geometry,
        Geography::County => &args.counties_geometry,
    };
    let geometry = loader::load_geometry(geometry_path)?;
    info!(
        "Loaded {} boundary features from {}",
        util::format_int(geometry.len() as u64),
        geometry_path.display()
    );

    let source: Box<dyn RegionSource> = match &args.source_csv {
        Some(path) => Box::new(CsvFileSource::new(path)),
        None => Box::new(ZillowSource::new()?),
    };

    let dashboard = dashboard::build_dashboard(config, source.as_ref(), &geometry)?;

    println!("\nAverage ZHVI (Zillow {} Home Value Index)", config.home_type.title());
    output::preview_table(&dashboard.most_expensive.title, None, &dashboard.most_expensive.data, 10);
    output::preview_table(&dashboard.least_expensive.title, None, &dashboard.least_expensive.data, 10);
    output::preview_table(
        &dashboard.monthly.title,
        Some("mean across all regions"),
        &dashboard.monthly.data,
        12,
    );

    dashboard::write_artifacts(&dashboard, &args.out_dir)?;
    println!("(Map layer and chart data exported to {})", args.out_dir.display());
    Ok(())
}
