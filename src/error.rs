use std::fmt;
use thiserror::Error;

/// Which side of a geometry join a problem was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    /// The geometry features being augmented.
    Target,
    /// The statistics table supplying the joined columns.
    Source,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// Reasons a geometry join is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    /// A join key value occurs more than once, so the join would not be accurate.
    #[error("{side} key `{key}` is not unique (repeated value: {value})")]
    DuplicateKey {
        side: JoinSide,
        key: String,
        value: String,
    },

    /// The key column does not exist on that side.
    #[error("{side} has no key column `{key}`")]
    MissingKeyColumn { side: JoinSide, key: String },
}

/// Rejected dashboard selections.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported year {0}, expected one of 2018..=2022")]
    UnsupportedYear(i32),

    #[error("min months must be between 1 and 12, got {0}")]
    InvalidMinMonths(usize),
}

/// Errors that abort a dashboard build.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Fetching the published CSV failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The source table lacks an identifying column the pipeline needs.
    #[error("source data has no `{column}` column")]
    MissingColumn { column: String },

    #[error("invalid geometry: {message}")]
    InvalidGeometry { message: String },

    #[error("join refused: {0}")]
    Join(#[from] JoinError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
