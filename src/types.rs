use crate::config::{Geography, HomeType};
use crate::util::format_price;
use chrono::{Month, NaiveDate};
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

/// A single value in a tabular column after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Identifying fields carried through every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionIdentity {
    pub region_id: Option<i64>,
    pub region_name: String,
    pub state_name: Option<String>,
    pub state_code_fips: Option<String>,
    pub municipal_code_fips: Option<String>,
    /// Composite `SS` + `CCC` key, only derived for county data.
    pub county_fips: Option<String>,
}

/// Wide-format table as published: one value per month column.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegionTable {
    pub month_columns: Vec<NaiveDate>,
    pub rows: Vec<RawRegionRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRegionRecord {
    pub identity: RegionIdentity,
    /// Parallel to `RawRegionTable::month_columns`.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthValue<T> {
    pub month: Month,
    /// Renamed column, e.g. `March_condo`.
    pub column: String,
    pub value: Option<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredRecord {
    pub identity: RegionIdentity,
    pub months: Vec<MonthValue<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub identity: RegionIdentity,
    pub months: Vec<MonthValue<f64>>,
    pub yr_avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub identity: RegionIdentity,
    pub months: Vec<MonthValue<i64>>,
    pub yr_avg: Option<i64>,
}

/// Record set produced by one pipeline stage for a single selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTable<R> {
    pub geography: Geography,
    pub home_type: HomeType,
    /// Renamed month columns, in source order.
    pub month_columns: Vec<String>,
    pub rows: Vec<R>,
}

impl RegionTable<NormalizedRecord> {
    fn identity_columns(&self) -> &'static [&'static str] {
        match self.geography {
            Geography::State => &["RegionID", "RegionName", "StateName"],
            Geography::County => &[
                "RegionID",
                "RegionName",
                "StateName",
                "StateCodeFIPS",
                "MunicipalCodeFIPS",
                "County_FIPS",
            ],
        }
    }

    /// Every column of the normalized table, identifying columns first.
    pub fn column_names(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .identity_columns()
            .iter()
            .map(|c| c.to_string())
            .collect();
        cols.extend(self.month_columns.iter().cloned());
        cols.push(self.home_type.average_column());
        cols
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.identity_columns().contains(&column)
            || self.month_columns.iter().any(|c| c == column)
            || column == self.home_type.average_column()
    }

    /// Value of `column` for `row`; `None` for nulls and unknown columns.
    pub fn cell(&self, row: &NormalizedRecord, column: &str) -> Option<Cell> {
        let id = &row.identity;
        match column {
            "RegionID" => id.region_id.map(Cell::Int),
            "RegionName" => Some(Cell::Text(id.region_name.clone())),
            "StateName" => id.state_name.clone().map(Cell::Text),
            "StateCodeFIPS" => id.state_code_fips.as_deref().map(code_cell),
            "MunicipalCodeFIPS" => id.municipal_code_fips.as_deref().map(code_cell),
            "County_FIPS" => id.county_fips.clone().map(Cell::Text),
            c if c == self.home_type.average_column() => row.yr_avg.map(Cell::Int),
            c => row
                .months
                .iter()
                .find(|m| m.column == c)
                .and_then(|m| m.value.map(Cell::Int)),
        }
    }
}

fn code_cell(code: &str) -> Cell {
    code.parse::<i64>()
        .map(Cell::Int)
        .unwrap_or_else(|_| Cell::Text(code.to_string()))
}

/// A boundary feature augmented with columns from the statistics table.
#[derive(Debug, Clone)]
pub struct JoinedGeoRecord {
    pub feature: geojson::Feature,
    pub key: Option<String>,
    /// Requested columns; all `None` when no statistics row matched.
    pub columns: Vec<(String, Option<Cell>)>,
}

impl JoinedGeoRecord {
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Cell::as_int)
    }

    /// Joined column as text, falling back to the feature's own properties.
    pub fn text(&self, column: &str) -> Option<String> {
        if let Some(cell) = self.get(column) {
            return Some(cell.to_string());
        }
        match self.feature.property(column)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.columns.iter().any(|(_, v)| v.is_some())
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RankingRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Average_Price")]
    #[tabled(rename = "Average_Price", display_with = "display_price")]
    pub average_price: Option<i64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyPriceRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Price")]
    #[tabled(rename = "Price", display_with = "display_price")]
    pub price: Option<i64>,
}

fn display_price(v: &Option<i64>) -> String {
    match v {
        Some(p) => format_price(*p),
        None => "n/a".to_string(),
    }
}
