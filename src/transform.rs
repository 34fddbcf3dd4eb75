// Reshaping of the wide ZHVI table into one row per region for a single
// year: column selection, yearly averages and integer normalization.

use crate::config::{DashboardConfig, Geography, HomeType};
use crate::error::DashboardError;
use crate::loader::{derive_county_fips, RegionSource};
use crate::types::{AggregatedRecord, FilteredRecord, MonthValue, NormalizedRecord, RawRegionTable, RegionTable};
use crate::util::average_present;
use chrono::{Datelike, Month};
use log::{debug, info};

/// Keeps the identifying fields and the month columns of `year`, renaming
/// each month column to `<MonthName>_<hometype>`.
pub fn filter_year_columns(
    table: RawRegionTable,
    geography: Geography,
    home_type: HomeType,
    year: i32,
) -> RegionTable<FilteredRecord> {
    let selected: Vec<(usize, Month, String)> = table
        .month_columns
        .iter()
        .enumerate()
        .filter(|(_, date)| date.year() == year)
        .filter_map(|(i, date)| {
            let month = Month::try_from(date.month() as u8).ok()?;
            Some((i, month, format!("{}_{}", month.name(), home_type.name())))
        })
        .collect();
    debug!(
        "Selected {} of {} month columns for {}",
        selected.len(),
        table.month_columns.len(),
        year
    );

    let rows = table
        .rows
        .into_iter()
        .map(|row| FilteredRecord {
            months: selected
                .iter()
                .map(|(i, month, column)| MonthValue {
                    month: *month,
                    column: column.clone(),
                    value: row.values.get(*i).copied().flatten(),
                })
                .collect(),
            identity: row.identity,
        })
        .collect();

    RegionTable {
        geography,
        home_type,
        month_columns: selected.into_iter().map(|(_, _, c)| c).collect(),
        rows,
    }
}

/// Appends the yearly average of each row's monthly values. Missing months
/// are skipped; rows with fewer than `min_months` values get no average.
pub fn aggregate(table: RegionTable<FilteredRecord>, min_months: usize) -> RegionTable<AggregatedRecord> {
    let rows = table
        .rows
        .into_iter()
        .map(|row| AggregatedRecord {
            yr_avg: average_present(row.months.iter().map(|m| m.value), min_months),
            identity: row.identity,
            months: row.months,
        })
        .collect();
    RegionTable {
        geography: table.geography,
        home_type: table.home_type,
        month_columns: table.month_columns,
        rows,
    }
}

/// Floors a float into a nullable integer; missing and non-finite values stay missing.
pub fn floor_to_int(v: Option<f64>) -> Option<i64> {
    v.filter(|x| x.is_finite()).map(|x| x.floor() as i64)
}

pub fn normalize(table: RegionTable<AggregatedRecord>) -> RegionTable<NormalizedRecord> {
    let rows = table
        .rows
        .into_iter()
        .map(|row| NormalizedRecord {
            identity: row.identity,
            months: row
                .months
                .into_iter()
                .map(|m| MonthValue {
                    month: m.month,
                    column: m.column,
                    value: floor_to_int(m.value),
                })
                .collect(),
            yr_avg: floor_to_int(row.yr_avg),
        })
        .collect();
    RegionTable {
        geography: table.geography,
        home_type: table.home_type,
        month_columns: table.month_columns,
        rows,
    }
}

/// Runs every reshaping step on an already fetched table.
pub fn reshape(raw: RawRegionTable, config: &DashboardConfig) -> RegionTable<NormalizedRecord> {
    let raw = match config.geography {
        Geography::County => derive_county_fips(raw),
        Geography::State => raw,
    };
    let filtered = filter_year_columns(raw, config.geography, config.home_type, config.year);
    normalize(aggregate(filtered, config.min_months))
}

/// Fetches the source table for `config` and reshapes it.
pub fn build_statistics(
    source: &dyn RegionSource,
    config: &DashboardConfig,
) -> Result<RegionTable<NormalizedRecord>, DashboardError> {
    let raw = source.fetch(config.geography, config.home_type)?;
    info!(
        "Loaded {} {} rows with {} month columns",
        raw.rows.len(),
        config.geography.title().to_lowercase(),
        raw.month_columns.len()
    );
    let table = reshape(raw, config);
    let averaged = table.rows.iter().filter(|r| r.yr_avg.is_some()).count();
    info!("{} of {} rows have a {} average", averaged, table.rows.len(), config.year);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, RawRegionRecord, RegionIdentity};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 28).unwrap()
    }

    fn raw(values: Vec<Option<f64>>) -> RawRegionTable {
        RawRegionTable {
            month_columns: vec![date(2021, 12), date(2022, 1), date(2022, 2), date(2022, 3)],
            rows: vec![RawRegionRecord {
                identity: RegionIdentity {
                    region_id: Some(9),
                    region_name: "Ohio".to_string(),
                    ..Default::default()
                },
                values,
            }],
        }
    }

    #[test]
    fn keeps_only_the_requested_year_and_renames() {
        let table = filter_year_columns(
            raw(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Geography::State,
            HomeType::Home,
            2022,
        );
        assert_eq!(table.month_columns, vec!["January_home", "February_home", "March_home"]);
        let values: Vec<_> = table.rows[0].months.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn selection_compares_calendar_years() {
        let mut table = raw(vec![Some(1.0); 4]);
        table.month_columns[0] = NaiveDate::from_ymd_opt(2020, 2, 20).unwrap();
        let filtered = filter_year_columns(table, Geography::State, HomeType::Home, 2020);
        assert_eq!(filtered.month_columns, vec!["February_home"]);
    }

    #[test]
    fn averages_monthly_values() {
        let table = aggregate(
            filter_year_columns(
                raw(vec![None, Some(100.0), Some(200.0), Some(300.0)]),
                Geography::State,
                HomeType::Condo,
                2022,
            ),
            1,
        );
        assert_eq!(table.rows[0].yr_avg, Some(200.0));
    }

    #[test]
    fn min_months_threshold_nulls_sparse_rows() {
        let filtered = filter_year_columns(
            raw(vec![None, Some(100.0), None, None]),
            Geography::State,
            HomeType::Condo,
            2022,
        );
        assert_eq!(aggregate(filtered.clone(), 1).rows[0].yr_avg, Some(100.0));
        assert_eq!(aggregate(filtered, 2).rows[0].yr_avg, None);
    }

    #[test]
    fn floors_and_keeps_missing_distinct_from_zero() {
        assert_eq!(floor_to_int(Some(19.9)), Some(19));
        assert_eq!(floor_to_int(Some(-0.5)), Some(-1));
        assert_eq!(floor_to_int(Some(0.0)), Some(0));
        assert_eq!(floor_to_int(None), None);
        assert_eq!(floor_to_int(Some(f64::NAN)), None);
    }

    #[test]
    fn normalized_table_exposes_named_columns() {
        let config = DashboardConfig::new(Geography::State, HomeType::Home, 2022, 1).unwrap();
        let table = reshape(raw(vec![Some(5.0), Some(100.5), None, Some(200.9)]), &config);
        assert_eq!(
            table.column_names(),
            vec!["RegionID", "RegionName", "StateName", "January_home", "February_home", "March_home", "yr_avg_home"]
        );
        let row = &table.rows[0];
        assert_eq!(table.cell(row, "January_home"), Some(Cell::Int(100)));
        assert_eq!(table.cell(row, "February_home"), None);
        assert_eq!(table.cell(row, "yr_avg_home"), Some(Cell::Int(150)));
        assert_eq!(table.cell(row, "RegionName"), Some(Cell::Text("Ohio".to_string())));
    }
}
