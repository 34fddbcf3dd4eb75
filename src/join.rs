// Left join of the statistics table onto boundary features.

use crate::error::{JoinError, JoinSide};
use crate::types::{Cell, JoinedGeoRecord, NormalizedRecord, RegionTable};
use geojson::Feature;
use log::{info, warn};
use std::collections::{HashMap, HashSet};

/// Key value of a feature property; numbers are compared by their text form.
fn feature_key(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First repeated key, if any. Two missing keys count as a repeat.
fn first_duplicate<'a>(keys: impl IntoIterator<Item = &'a Option<String>>) -> Option<String> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .find(|k| !seen.insert(*k))
        .map(|k| k.clone().unwrap_or_else(|| "<missing>".to_string()))
}

/// Augments every feature in `target` with `columns` of the matching
/// `source` row, matched on `target_key` == `source_key`.
///
/// Both keys must be unique; otherwise the join is refused rather than
/// producing an inaccurate result. Features without a match keep their place
/// and carry `None` in every joined column.
pub fn join_fields(
    target: &[Feature],
    source: &RegionTable<NormalizedRecord>,
    target_key: &str,
    source_key: &str,
    columns: &[String],
) -> Result<Vec<JoinedGeoRecord>, JoinError> {
    if !target.is_empty() && target.iter().all(|f| !f.contains_property(target_key)) {
        return Err(JoinError::MissingKeyColumn {
            side: JoinSide::Target,
            key: target_key.to_string(),
        });
    }
    if !source.has_column(source_key) {
        return Err(JoinError::MissingKeyColumn {
            side: JoinSide::Source,
            key: source_key.to_string(),
        });
    }

    let target_keys: Vec<Option<String>> = target.iter().map(|f| feature_key(f, target_key)).collect();
    let source_keys: Vec<Option<String>> = source
        .rows
        .iter()
        .map(|row| source.cell(row, source_key).map(|c| c.to_string()))
        .collect();

    for (side, key, keys) in [
        (JoinSide::Target, target_key, &target_keys),
        (JoinSide::Source, source_key, &source_keys),
    ] {
        if let Some(value) = first_duplicate(keys.iter()) {
            warn!("{} key `{}` is not unique, refusing to join", side, key);
            return Err(JoinError::DuplicateKey {
                side,
                key: key.to_string(),
                value,
            });
        }
    }

    let mut selected: Vec<String> = Vec::with_capacity(columns.len() + 1);
    for column in columns.iter().map(String::as_str).chain([source_key]) {
        if !selected.iter().any(|c| c == column) {
            selected.push(column.to_string());
        }
    }

    let by_key: HashMap<&str, &NormalizedRecord> = source_keys
        .iter()
        .zip(&source.rows)
        .filter_map(|(k, row)| k.as_deref().map(|k| (k, row)))
        .collect();

    let joined: Vec<JoinedGeoRecord> = target
        .iter()
        .zip(target_keys)
        .map(|(feature, key)| {
            let row = key.as_deref().and_then(|k| by_key.get(k));
            let columns: Vec<(String, Option<Cell>)> = selected
                .iter()
                .map(|c| (c.clone(), row.and_then(|r| source.cell(r, c))))
                .collect();
            JoinedGeoRecord {
                feature: feature.clone(),
                key,
                columns,
            }
        })
        .collect();

    let matched = joined.iter().filter(|r| r.is_matched()).count();
    info!("Joined {} of {} features", matched, joined.len());
    if matched < joined.len() {
        warn!("{} features have no statistics", joined.len() - matched);
    }
    Ok(joined)
}
