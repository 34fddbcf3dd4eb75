// One full dashboard build: statistics, geometry join, map and charts.

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::join::join_fields;
use crate::loader::RegionSource;
use crate::map::{build_choropleth, ChoroplethLayer};
use crate::output::{write_csv, write_geojson, write_json};
use crate::reports::{monthly_chart, monthly_trend, rank_regions, ranking_chart, ChartSpec, Rank};
use crate::transform::build_statistics;
use crate::types::{JoinedGeoRecord, MonthlyPriceRow, RankingRow};
use geojson::Feature;
use log::info;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub config: DashboardConfig,
    pub map: ChoroplethLayer,
    pub most_expensive: ChartSpec<RankingRow>,
    pub least_expensive: ChartSpec<RankingRow>,
    pub monthly: ChartSpec<MonthlyPriceRow>,
}

/// Derives the map and charts from an already joined table.
pub fn render(config: DashboardConfig, joined: &[JoinedGeoRecord]) -> Dashboard {
    let (geo, home, year) = (config.geography, config.home_type, config.year);
    let top = rank_regions(joined, geo, home, Rank::MostExpensive);
    let bottom = rank_regions(joined, geo, home, Rank::LeastExpensive);
    Dashboard {
        config,
        map: build_choropleth(joined, geo, home, year),
        most_expensive: ranking_chart(top, geo, Rank::MostExpensive, year),
        least_expensive: ranking_chart(bottom, geo, Rank::LeastExpensive, year),
        monthly: monthly_chart(monthly_trend(joined, home), year),
    }
}

/// Fetches, reshapes and joins the statistics for `config` onto `geometry`.
pub fn build_dashboard(
    config: DashboardConfig,
    source: &dyn RegionSource,
    geometry: &[Feature],
) -> Result<Dashboard, DashboardError> {
    let statistics = build_statistics(source, &config)?;
    let columns = statistics.column_names();
    let joined = join_fields(
        geometry,
        &statistics,
        config.geography.geometry_key(),
        config.geography.source_key(),
        &columns,
    )?;
    Ok(render(config, &joined))
}

/// Writes every dashboard artifact into `dir`, creating it if needed.
pub fn write_artifacts(dashboard: &Dashboard, dir: &Path) -> Result<(), DashboardError> {
    std::fs::create_dir_all(dir)?;
    write_geojson(&dir.join("map.geojson"), &dashboard.map.features)?;
    write_csv(&dir.join("top10.csv"), &dashboard.most_expensive.data)?;
    write_csv(&dir.join("bottom10.csv"), &dashboard.least_expensive.data)?;
    write_csv(&dir.join("monthly.csv"), &dashboard.monthly.data)?;
    write_json(&dir.join("dashboard.json"), dashboard)?;
    info!("Wrote dashboard artifacts to {}", dir.display());
    Ok(())
}
