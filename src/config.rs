// Dashboard selections.
//
// Everything a single dashboard build depends on lives in `DashboardConfig`
// and is passed into the pipeline explicitly.
use crate::error::ConfigError;
use clap::ValueEnum;
use serde::Serialize;
use std::ops::RangeInclusive;

/// Years offered by the dashboard.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 2018..=2022;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Geography {
    State,
    County,
}

impl Geography {
    /// Title-cased form used in the source URL and in tooltips.
    pub fn title(self) -> &'static str {
        match self {
            Geography::State => "State",
            Geography::County => "County",
        }
    }

    /// Property on the boundary features that identifies a region.
    pub fn geometry_key(self) -> &'static str {
        match self {
            Geography::State => "NAME",
            Geography::County => "County_FIPS",
        }
    }

    /// Column of the statistics table matched against `geometry_key`.
    pub fn source_key(self) -> &'static str {
        match self {
            Geography::State => "RegionName",
            Geography::County => "County_FIPS",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Geography::State => "States",
            Geography::County => "Counties",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeType {
    /// Single-family homes and condos together.
    Combined,
    /// Single-family homes only.
    Home,
    Condo,
}

impl HomeType {
    /// Code used by the published CSV file names.
    pub fn query_code(self) -> &'static str {
        match self {
            HomeType::Combined => "sfrcondo",
            HomeType::Home => "sfr",
            HomeType::Condo => "condo",
        }
    }

    /// Suffix used in renamed column names, e.g. `January_home`.
    pub fn name(self) -> &'static str {
        match self {
            HomeType::Combined => "combined",
            HomeType::Home => "home",
            HomeType::Condo => "condo",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            HomeType::Combined => "Combined",
            HomeType::Home => "Home",
            HomeType::Condo => "Condo",
        }
    }

    /// Name of the yearly average column, e.g. `yr_avg_condo`.
    pub fn average_column(self) -> String {
        format!("yr_avg_{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardConfig {
    pub geography: Geography,
    pub home_type: HomeType,
    pub year: i32,
    /// A row needs at least this many monthly values to get a yearly average.
    pub min_months: usize,
}

impl DashboardConfig {
    pub fn new(
        geography: Geography,
        home_type: HomeType,
        year: i32,
        min_months: usize,
    ) -> Result<Self, ConfigError> {
        if !SUPPORTED_YEARS.contains(&year) {
            return Err(ConfigError::UnsupportedYear(year));
        }
        if !(1..=12).contains(&min_months) {
            return Err(ConfigError::InvalidMinMonths(min_months));
        }
        Ok(Self {
            geography,
            home_type,
            year,
            min_months,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_type_maps_to_query_codes() {
        assert_eq!(HomeType::Combined.query_code(), "sfrcondo");
        assert_eq!(HomeType::Home.query_code(), "sfr");
        assert_eq!(HomeType::Condo.query_code(), "condo");
        assert_eq!(HomeType::Home.average_column(), "yr_avg_home");
    }

    #[test]
    fn rejects_years_outside_the_offered_range() {
        assert_eq!(
            DashboardConfig::new(Geography::State, HomeType::Home, 2017, 1),
            Err(ConfigError::UnsupportedYear(2017))
        );
        assert!(DashboardConfig::new(Geography::County, HomeType::Condo, 2020, 1).is_ok());
    }

    #[test]
    fn rejects_zero_min_months() {
        assert_eq!(
            DashboardConfig::new(Geography::State, HomeType::Home, 2022, 0),
            Err(ConfigError::InvalidMinMonths(0))
        );
    }
}
