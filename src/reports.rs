use crate::config::{Geography, HomeType};
use crate::types::{JoinedGeoRecord, MonthlyPriceRow, RankingRow};
use chrono::Month;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const TOP_N: usize = 10;

const CHART_COLOR: &str = "#0083B8";
const CHART_TEMPLATE: &str = "plotly_white";

/// Calendar position of each full month name.
static MONTH_ORDER: Lazy<HashMap<&'static str, Month>> = Lazy::new(|| {
    (1u8..=12)
        .filter_map(|m| Month::try_from(m).ok())
        .map(|m| (m.name(), m))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    MostExpensive,
    LeastExpensive,
}

/// Display name for a ranked region.
fn display_name(geography: Geography, record: &JoinedGeoRecord) -> String {
    let fallback = || record.key.clone().unwrap_or_default();
    match geography {
        Geography::State => record.text("RegionName").unwrap_or_else(fallback),
        Geography::County => match (record.get("RegionName"), record.get("StateName")) {
            (Some(region), Some(state)) => format!("{}, {}", region, state),
            (Some(region), None) => region.to_string(),
            _ => fallback(),
        },
    }
}

/// The `TOP_N` most or least expensive regions by yearly average.
///
/// Stable sort: ties keep their original row order, and regions without an
/// average always come last. Fewer than `TOP_N` rows yields all of them.
pub fn rank_regions(
    records: &[JoinedGeoRecord],
    geography: Geography,
    home_type: HomeType,
    rank: Rank,
) -> Vec<RankingRow> {
    let avg_col = home_type.average_column();
    let mut ranked: Vec<(Option<i64>, &JoinedGeoRecord)> =
        records.iter().map(|r| (r.int(&avg_col), r)).collect();
    ranked.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => match rank {
            Rank::MostExpensive => y.cmp(&x),
            Rank::LeastExpensive => x.cmp(&y),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked
        .into_iter()
        .take(TOP_N)
        .map(|(avg, r)| RankingRow {
            name: display_name(geography, r),
            average_price: avg,
        })
        .collect()
}

/// National monthly trend: per-month mean across all regions, truncated to
/// whole dollars, in calendar order.
pub fn monthly_trend(records: &[JoinedGeoRecord], home_type: HomeType) -> Vec<MonthlyPriceRow> {
    let suffix = format!("_{}", home_type.name());
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let mut months: Vec<(Month, &str)> = first
        .columns
        .iter()
        .map(|(c, _)| c.as_str())
        .filter(|c| !c.starts_with("yr_avg"))
        .filter_map(|c| {
            let bare = c.strip_suffix(&suffix)?;
            MONTH_ORDER.get(bare).map(|m| (*m, c))
        })
        .collect();
    months.sort_by_key(|(m, _)| m.number_from_month());

    months
        .into_iter()
        .map(|(month, column)| {
            let (sum, count) = records
                .iter()
                .filter_map(|r| r.int(column))
                .fold((0i128, 0i128), |(s, c), v| (s + v as i128, c + 1));
            MonthlyPriceRow {
                month: month.name().to_string(),
                // Integer division truncates toward zero.
                price: (count > 0).then(|| (sum / count) as i64),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

/// Renderer-agnostic chart description.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec<T> {
    pub kind: ChartKind,
    pub title: String,
    pub x: &'static str,
    pub y: &'static str,
    pub color: &'static str,
    pub template: &'static str,
    pub data: Vec<T>,
}

fn ranking_title(geography: Geography, rank: Rank, year: i32) -> String {
    let which = match rank {
        Rank::MostExpensive => "Most",
        Rank::LeastExpensive => "Least",
    };
    format!("The {} {} Expensive {} {}", TOP_N, which, geography.plural(), year)
}

pub fn ranking_chart(rows: Vec<RankingRow>, geography: Geography, rank: Rank, year: i32) -> ChartSpec<RankingRow> {
    ChartSpec {
        kind: ChartKind::Bar,
        title: ranking_title(geography, rank, year),
        x: "Name",
        y: "Average_Price",
        color: CHART_COLOR,
        template: CHART_TEMPLATE,
        data: rows,
    }
}

pub fn monthly_chart(rows: Vec<MonthlyPriceRow>, year: i32) -> ChartSpec<MonthlyPriceRow> {
    ChartSpec {
        kind: ChartKind::Line,
        title: format!("Monthly Average Price Changes {} (All of US)", year),
        x: "Month",
        y: "Price",
        color: CHART_COLOR,
        template: CHART_TEMPLATE,
        data: rows,
    }
}
