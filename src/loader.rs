use crate::config::{Geography, HomeType};
use crate::error::DashboardError;
use crate::types::{RawRegionRecord, RawRegionTable, RegionIdentity};
use crate::util::{parse_date_safe, parse_f64_safe, parse_i64_safe, zfill};
use csv::{ReaderBuilder, StringRecord};
use geojson::{Feature, FeatureCollection, GeoJson};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const ZHVI_BASE_URL: &str = "https://files.zillowstatic.com/research/public_csvs/zhvi";

/// Somewhere the wide-format ZHVI table can be read from.
pub trait RegionSource {
    fn fetch(&self, geography: Geography, home_type: HomeType) -> Result<RawRegionTable, DashboardError>;
}

/// Published ZHVI CSVs, fetched over HTTP on every call.
pub struct ZillowSource {
    client: reqwest::blocking::Client,
}

impl ZillowSource {
    pub fn new() -> Result<Self, DashboardError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("zhvi_dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl RegionSource for ZillowSource {
    fn fetch(&self, geography: Geography, home_type: HomeType) -> Result<RawRegionTable, DashboardError> {
        let url = source_url(geography, home_type);
        info!("Fetching {}", url);
        let body = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        debug!("Downloaded {} bytes", body.len());
        parse_region_csv(body.as_ref(), geography)
    }
}

/// A ZHVI CSV that was downloaded beforehand.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegionSource for CsvFileSource {
    fn fetch(&self, geography: Geography, _home_type: HomeType) -> Result<RawRegionTable, DashboardError> {
        info!("Reading {}", self.path.display());
        let file = File::open(&self.path)?;
        parse_region_csv(BufReader::new(file), geography)
    }
}

pub fn source_url(geography: Geography, home_type: HomeType) -> String {
    format!(
        "{}/{}_zhvi_uc_{}_tier_0.33_0.67_sm_sa_month.csv",
        ZHVI_BASE_URL,
        geography.title(),
        home_type.query_code()
    )
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, DashboardError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| DashboardError::MissingColumn { column: name.to_string() })
}

/// Reads the wide ZHVI layout: identifying columns plus one `YYYY-MM-DD`
/// column per month. Cells that are not numbers become missing values.
pub fn parse_region_csv<R: Read>(reader: R, geography: Geography) -> Result<RawRegionTable, DashboardError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let id_idx = column_index(&headers, "RegionID")?;
    let name_idx = column_index(&headers, "RegionName")?;
    let state_idx = column_index(&headers, "StateName")?;
    let fips_idx = match geography {
        Geography::County => Some((
            column_index(&headers, "StateCodeFIPS")?,
            column_index(&headers, "MunicipalCodeFIPS")?,
        )),
        Geography::State => None,
    };

    let (date_idx, month_columns): (Vec<usize>, Vec<_>) = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| parse_date_safe(Some(h)).map(|d| (i, d)))
        .unzip();
    debug!("Found {} month columns", month_columns.len());

    let mut rows = Vec::new();
    let mut unnamed = 0usize;
    for result in rdr.records() {
        let record = result?;
        let region_name = match non_empty(record.get(name_idx)) {
            Some(n) => n,
            None => {
                unnamed += 1;
                String::new()
            }
        };
        let (state_code_fips, municipal_code_fips) = match fips_idx {
            Some((s, m)) => (code_text(record.get(s)), code_text(record.get(m))),
            None => (None, None),
        };
        rows.push(RawRegionRecord {
            identity: RegionIdentity {
                region_id: parse_i64_safe(record.get(id_idx)),
                region_name,
                state_name: non_empty(record.get(state_idx)),
                state_code_fips,
                municipal_code_fips,
                county_fips: None,
            },
            values: date_idx.iter().map(|&i| parse_f64_safe(record.get(i))).collect(),
        });
    }
    if unnamed > 0 {
        warn!("{} rows have no RegionName", unnamed);
    }

    Ok(RawRegionTable { month_columns, rows })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Stringify a numeric code the way it reads: `6`, `6.0` and ` 6 ` all give `6`.
fn code_text(s: Option<&str>) -> Option<String> {
    let raw = non_empty(s)?;
    Some(parse_i64_safe(Some(&raw)).map(|v| v.to_string()).unwrap_or(raw))
}

/// Builds `County_FIPS` from the 2-digit state and 3-digit municipal codes.
pub fn derive_county_fips(table: RawRegionTable) -> RawRegionTable {
    let rows = table
        .rows
        .into_iter()
        .map(|mut row| {
            let id = &mut row.identity;
            id.county_fips = match (
                code_text(id.state_code_fips.as_deref()),
                code_text(id.municipal_code_fips.as_deref()),
            ) {
                (Some(state), Some(muni)) => Some(format!("{}{}", zfill(&state, 2), zfill(&muni, 3))),
                _ => None,
            };
            row
        })
        .collect();
    RawRegionTable { month_columns: table.month_columns, rows }
}

/// Loads boundary features from a GeoJSON `FeatureCollection` file.
pub fn load_geometry(path: &Path) -> Result<Vec<Feature>, DashboardError> {
    let file = File::open(path)?;
    let geojson = GeoJson::from_reader(BufReader::new(file))?;
    features_from_geojson(geojson)
}

pub fn features_from_geojson(geojson: GeoJson) -> Result<Vec<Feature>, DashboardError> {
    match geojson {
        GeoJson::FeatureCollection(FeatureCollection { features, .. }) => Ok(features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(DashboardError::InvalidGeometry {
            message: "expected features, found a bare geometry".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTY_CSV: &str = "\
RegionID,SizeRank,RegionName,RegionType,StateName,State,Metro,StateCodeFIPS,MunicipalCodeFIPS,2021-12-31,2022-01-31,2022-02-28
3101,0,Los Angeles County,county,CA,CA,LA,6,37,700000.5,710000,
139,1,Cook County,county,IL,IL,Chicago,17,31,250000,n/a,255000
";

    #[test]
    fn builds_the_published_url() {
        assert_eq!(
            source_url(Geography::County, HomeType::Home),
            "https://files.zillowstatic.com/research/public_csvs/zhvi/County_zhvi_uc_sfr_tier_0.33_0.67_sm_sa_month.csv"
        );
        assert!(source_url(Geography::State, HomeType::Combined).contains("/State_zhvi_uc_sfrcondo_"));
    }

    #[test]
    fn parses_wide_rows_and_coerces_dirty_cells() {
        let table = parse_region_csv(COUNTY_CSV.as_bytes(), Geography::County).unwrap();
        assert_eq!(table.month_columns.len(), 3);
        assert_eq!(table.rows.len(), 2);
        let la = &table.rows[0];
        assert_eq!(la.identity.region_id, Some(3101));
        assert_eq!(la.identity.state_code_fips.as_deref(), Some("6"));
        assert_eq!(la.values, vec![Some(700000.5), Some(710000.0), None]);
        assert_eq!(table.rows[1].values[1], None);
    }

    #[test]
    fn county_data_requires_fips_codes() {
        let csv = "RegionID,RegionName,StateName,2022-01-31\n1,Alabama,,100\n";
        let err = parse_region_csv(csv.as_bytes(), Geography::County).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { ref column } if column == "StateCodeFIPS"));
        assert!(parse_region_csv(csv.as_bytes(), Geography::State).is_ok());
    }

    #[test]
    fn county_fips_is_always_five_digits() {
        let table = derive_county_fips(parse_region_csv(COUNTY_CSV.as_bytes(), Geography::County).unwrap());
        let keys: Vec<_> = table.rows.iter().map(|r| r.identity.county_fips.clone().unwrap()).collect();
        assert_eq!(keys, vec!["06037", "17031"]);

        let codes = [("0", "0"), ("1", "1"), ("56", "999"), ("9", "45"), ("6.0", "37.0"), (" 4 ", "13")];
        let table = RawRegionTable {
            month_columns: Vec::new(),
            rows: codes
                .iter()
                .map(|(state, muni)| RawRegionRecord {
                    identity: RegionIdentity {
                        state_code_fips: Some(state.to_string()),
                        municipal_code_fips: Some(muni.to_string()),
                        ..Default::default()
                    },
                    values: Vec::new(),
                })
                .collect(),
        };
        let keys: Vec<String> = derive_county_fips(table)
            .rows
            .into_iter()
            .map(|r| r.identity.county_fips.unwrap())
            .collect();
        assert_eq!(keys, vec!["00000", "01001", "56999", "09045", "06037", "04013"]);
        assert!(keys.iter().all(|k| k.len() == 5));
    }

    #[test]
    fn missing_code_leaves_no_key() {
        let csv = "RegionID,RegionName,StateName,StateCodeFIPS,MunicipalCodeFIPS,2022-01-31\n1,Somewhere,TX,48,,100\n";
        let table = derive_county_fips(parse_region_csv(csv.as_bytes(), Geography::County).unwrap());
        assert_eq!(table.rows[0].identity.county_fips, None);
    }

    #[test]
    fn reads_feature_collections() {
        let geojson: GeoJson = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"NAME":"Ohio"},"geometry":null}]}"#
            .parse()
            .unwrap();
        let features = features_from_geojson(geojson).unwrap();
        assert_eq!(features.len(), 1);
    }
}
