// Choropleth layer for the joined table.
//
// Drawing happens in whatever web map consumes `map.geojson`; this module
// decides the colour scale and resolves a fill colour per feature.
use crate::config::{Geography, HomeType};
use crate::types::JoinedGeoRecord;
use crate::util::quantile;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::Serialize;

/// Percentiles used as county colour breaks. Non-uniform to spread out the
/// skewed price distribution.
pub const COUNTY_BREAKS: [f64; 8] = [0.0, 0.2, 0.4, 0.5, 0.7, 0.8, 0.98, 1.0];

const MAP_CENTER: [f64; 2] = [39.817999, -95.693616];
const MAP_ZOOM: u8 = 4;
const TILES: &str = "CartoDB positron";
const NAN_FILL_COLOR: &str = "gray";
const NAN_FILL_OPACITY: f64 = 0.4;
const LINE_COLOR: &str = "#FFFFFF";

/// ColorBrewer `BuPu` sequential palettes.
const BUPU_6: [&str; 6] = ["#edf8fb", "#bfd3e6", "#9ebcda", "#8c96c6", "#8856a7", "#810f7c"];
const BUPU_7: [&str; 7] = ["#edf8fb", "#bfd3e6", "#9ebcda", "#8c96c6", "#8c6bb1", "#88419d", "#6e016b"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColorScale {
    /// Bucket boundaries; values fall in `[t[i], t[i + 1])`, the last bucket is closed.
    Threshold { thresholds: Vec<f64> },
    /// Linear from `min` to `max`, shown with a legend.
    Continuous { min: f64, max: f64, legend: String },
}

impl ColorScale {
    fn palette(&self) -> &'static [&'static str] {
        match self {
            ColorScale::Threshold { .. } => &BUPU_7,
            ColorScale::Continuous { .. } => &BUPU_6,
        }
    }

    /// Fill colour for `value`, or `None` when the value is missing.
    pub fn color_for(&self, value: Option<i64>) -> Option<&'static str> {
        let v = value? as f64;
        let palette = self.palette();
        let bucket = match self {
            ColorScale::Threshold { thresholds } => {
                let buckets = thresholds.len().saturating_sub(1).max(1);
                let i = thresholds
                    .iter()
                    .skip(1)
                    .position(|t| v < *t)
                    .unwrap_or(buckets - 1);
                // Spread the buckets over the palette when there are fewer than its classes.
                i * (palette.len() - 1) / (buckets - 1).max(1)
            }
            ColorScale::Continuous { min, max, .. } => {
                let span = max - min;
                if span <= 0.0 {
                    0
                } else {
                    let pos = ((v - min) / span).clamp(0.0, 1.0);
                    ((pos * palette.len() as f64) as usize).min(palette.len() - 1)
                }
            }
        };
        palette.get(bucket).copied()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tooltip {
    pub fields: Vec<String>,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethLayer {
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: &'static str,
    pub key_on: String,
    pub value_column: String,
    pub fill_palette: &'static str,
    pub line_color: &'static str,
    pub nan_fill_color: &'static str,
    pub nan_fill_opacity: f64,
    pub scale: Option<ColorScale>,
    pub tooltip: Tooltip,
    #[serde(skip)]
    pub features: FeatureCollection,
}

fn present_values(records: &[JoinedGeoRecord], column: &str) -> Vec<f64> {
    let mut values: Vec<f64> = records.iter().filter_map(|r| r.int(column)).map(|v| v as f64).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Percentile breaks of the non-null values; `None` if there are none.
pub fn threshold_scale(records: &[JoinedGeoRecord], column: &str) -> Option<ColorScale> {
    let values = present_values(records, column);
    if values.is_empty() {
        return None;
    }
    let thresholds = COUNTY_BREAKS.iter().map(|q| quantile(&values, *q)).collect();
    Some(ColorScale::Threshold { thresholds })
}

pub fn continuous_scale(records: &[JoinedGeoRecord], column: &str, legend: String) -> Option<ColorScale> {
    let values = present_values(records, column);
    let (min, max) = (*values.first()?, *values.last()?);
    Some(ColorScale::Continuous { min, max, legend })
}

fn json_value(record: &JoinedGeoRecord, column: &str) -> JsonValue {
    record
        .get(column)
        .and_then(|c| serde_json::to_value(c).ok())
        .unwrap_or(JsonValue::Null)
}

/// Builds the choropleth layer: county maps get percentile buckets, state
/// maps a continuous scale with a legend.
pub fn build_choropleth(
    records: &[JoinedGeoRecord],
    geography: Geography,
    home_type: HomeType,
    year: i32,
) -> ChoroplethLayer {
    let value_column = home_type.average_column();
    let scale = match geography {
        Geography::County => threshold_scale(records, &value_column),
        Geography::State => continuous_scale(
            records,
            &value_column,
            format!("Average Zillow {} Home Value Index for {}", home_type.title(), year),
        ),
    };

    let features: Vec<Feature> = records
        .iter()
        .map(|record| {
            let mut feature = record.feature.clone();
            let mut props: JsonObject = feature.properties.take().unwrap_or_default();
            for (column, cell) in &record.columns {
                // A null joined value never replaces the feature's own property.
                if cell.is_some() {
                    props.insert(column.clone(), json_value(record, column));
                } else {
                    props.entry(column.clone()).or_insert(JsonValue::Null);
                }
            }
            let fill = scale
                .as_ref()
                .and_then(|s| s.color_for(record.int(&value_column)))
                .unwrap_or(NAN_FILL_COLOR);
            props.insert("fill_color".to_string(), JsonValue::from(fill));
            feature.properties = Some(props);
            feature
        })
        .collect();

    ChoroplethLayer {
        center: MAP_CENTER,
        zoom: MAP_ZOOM,
        tiles: TILES,
        key_on: format!("feature.properties.{}", geography.geometry_key()),
        value_column: value_column.clone(),
        fill_palette: "BuPu",
        line_color: LINE_COLOR,
        nan_fill_color: NAN_FILL_COLOR,
        nan_fill_opacity: NAN_FILL_OPACITY,
        scale,
        tooltip: Tooltip {
            fields: vec!["RegionName".to_string(), value_column],
            aliases: vec![format!("{}:", geography.title()), "Avg ZHVI:".to_string()],
        },
        features: FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn record(avg: Option<i64>) -> JoinedGeoRecord {
        let mut feature = Feature::default();
        feature.set_property("County_FIPS", "01001");
        JoinedGeoRecord {
            feature,
            key: Some("01001".to_string()),
            columns: vec![
                ("RegionName".to_string(), Some(Cell::Text("Autauga County".to_string()))),
                ("yr_avg_home".to_string(), avg.map(Cell::Int)),
            ],
        }
    }

    #[test]
    fn county_breaks_ignore_missing_values() {
        let mut records: Vec<_> = (0..=10).map(|i| record(Some(i * 100))).collect();
        records.push(record(None));
        let scale = threshold_scale(&records, "yr_avg_home").unwrap();
        let ColorScale::Threshold { thresholds } = scale else {
            panic!("expected a threshold scale");
        };
        assert_eq!(thresholds.len(), 8);
        assert_eq!(thresholds[0], 0.0);
        assert_eq!(thresholds[3], 500.0);
        assert!((thresholds[6] - 980.0).abs() < 1e-9);
        assert_eq!(thresholds[7], 1000.0);
    }

    #[test]
    fn no_values_means_no_scale() {
        assert_eq!(threshold_scale(&[record(None)], "yr_avg_home"), None);
    }

    #[test]
    fn threshold_buckets_map_onto_the_palette() {
        let scale = ColorScale::Threshold {
            thresholds: vec![0.0, 20.0, 40.0, 50.0, 70.0, 80.0, 98.0, 100.0],
        };
        assert_eq!(scale.color_for(Some(0)), Some(BUPU_7[0]));
        assert_eq!(scale.color_for(Some(45)), Some(BUPU_7[2]));
        assert_eq!(scale.color_for(Some(100)), Some(BUPU_7[6]));
        assert_eq!(scale.color_for(None), None);
    }

    #[test]
    fn layer_carries_joined_properties_and_fill() {
        let records = vec![record(Some(100)), record(Some(300)), record(None)];
        let layer = build_choropleth(&records, Geography::County, HomeType::Home, 2022);
        assert_eq!(layer.key_on, "feature.properties.County_FIPS");
        assert_eq!(layer.tooltip.aliases, vec!["County:", "Avg ZHVI:"]);
        let props = layer.features.features[2].properties.as_ref().unwrap();
        assert_eq!(props["fill_color"], "gray");
        assert_eq!(props["yr_avg_home"], JsonValue::Null);
        let props = layer.features.features[1].properties.as_ref().unwrap();
        assert_eq!(props["yr_avg_home"], 300);
        assert_eq!(props["RegionName"], "Autauga County");
    }

    #[test]
    fn unmatched_counties_keep_their_geometry_key() {
        let joined = |fips: &str, avg: Option<i64>| {
            let mut feature = Feature::default();
            feature.set_property("County_FIPS", fips);
            JoinedGeoRecord {
                feature,
                key: Some(fips.to_string()),
                columns: vec![
                    ("County_FIPS".to_string(), avg.map(|_| Cell::Text(fips.to_string()))),
                    ("RegionName".to_string(), avg.map(|_| Cell::Text("Los Angeles County".to_string()))),
                    ("yr_avg_home".to_string(), avg.map(Cell::Int)),
                ],
            }
        };
        let records = vec![joined("06037", Some(800000)), joined("48201", None)];
        let layer = build_choropleth(&records, Geography::County, HomeType::Home, 2022);

        let matched = layer.features.features[0].properties.as_ref().unwrap();
        assert_eq!(matched["County_FIPS"], "06037");
        assert_eq!(matched["RegionName"], "Los Angeles County");

        let unmatched = layer.features.features[1].properties.as_ref().unwrap();
        assert_eq!(unmatched["County_FIPS"], "48201");
        assert_eq!(unmatched["RegionName"], JsonValue::Null);
        assert_eq!(unmatched["yr_avg_home"], JsonValue::Null);
        assert_eq!(unmatched["fill_color"], "gray");
    }

    #[test]
    fn state_layer_uses_a_legend() {
        let layer = build_choropleth(&[record(Some(1)), record(Some(3))], Geography::State, HomeType::Home, 2020);
        match layer.scale {
            Some(ColorScale::Continuous { min, max, legend }) => {
                assert_eq!((min, max), (1.0, 3.0));
                assert_eq!(legend, "Average Zillow Home Home Value Index for 2020");
            }
            other => panic!("unexpected scale {:?}", other),
        }
    }
}
