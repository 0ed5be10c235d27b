//! Error types shared by the dataset builder and the forecast reconstructor.

use thiserror::Error;

/// Result type alias for quackcast operations.
pub type Result<T> = std::result::Result<T, TimeseriesError>;

/// Broad category of a [`TimeseriesError`], used by hosts to decide how to
/// present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Irregular or misaligned time grid.
    Continuity,
    /// Wrong column set, row count or array shape.
    Schema,
    /// Invalid caller selection or parameter.
    Configuration,
    /// External features used inconsistently between training and prediction.
    Consistency,
    /// Failure inside DuckDB or a predictor backend.
    Backend,
}

/// Main error type.
#[derive(Error, Debug)]
pub enum TimeseriesError {
    #[error(
        "Time column {column} doesn't have regular time intervals of frequency {frequency}{}. {detail}",
        series_suffix(.series)
    )]
    TimeContinuity {
        column: String,
        frequency: String,
        detail: String,
        series: Option<String>,
    },

    #[error(
        "Time column {column} doesn't have regular time intervals of frequency {frequency}{}. For {unit} frequency, timestamps must be end of {unit} (for e.g. '{example}')",
        series_suffix(.series)
    )]
    PeriodBoundary {
        column: String,
        frequency: String,
        unit: &'static str,
        example: String,
        series: Option<String>,
    },

    #[error("The dataset of future values of external features must contain exactly the following columns: {}", .expected.join(", "))]
    Schema { expected: Vec<String> },

    #[error("Please provide {expected} future values of external features, as this was the forecasting horizon used for training (got {actual})")]
    HorizonMismatch { expected: usize, actual: usize },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {column} {reason}")]
    InvalidColumn { column: String, reason: String },

    #[error("Invalid timestamp '{value}' in column {column}")]
    InvalidTimestamp { column: String, value: String },

    #[error("Please choose a forecasting horizon lower or equal to the one chosen when training: {max}")]
    HorizonTooLong { requested: usize, max: usize },

    #[error("{0}")]
    Config(String),

    #[error("You must provide a dataset of future values of external features.")]
    MissingExternalFeatures,

    #[error("A dataset of future values of external features was provided, but no external features were used during training for the selected model. Remove this dataset from the inputs or select a model that used external features during training.")]
    UnexpectedExternalFeatures,

    #[error("Predictor error: {0}")]
    Predictor(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn series_suffix(series: &Option<String>) -> String {
    match series {
        Some(label) => format!(" for time series {}", label),
        None => String::new(),
    }
}

impl TimeseriesError {
    /// Classify the error for presentation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TimeContinuity { .. } | Self::PeriodBoundary { .. } => ErrorKind::Continuity,
            Self::Schema { .. }
            | Self::HorizonMismatch { .. }
            | Self::Shape { .. }
            | Self::ColumnNotFound(_)
            | Self::InvalidColumn { .. }
            | Self::InvalidTimestamp { .. } => ErrorKind::Schema,
            Self::HorizonTooLong { .. } | Self::Config(_) | Self::Serialization(_) => {
                ErrorKind::Configuration
            }
            Self::MissingExternalFeatures | Self::UnexpectedExternalFeatures => {
                ErrorKind::Consistency
            }
            Self::Predictor(_) | Self::DuckDb(_) => ErrorKind::Backend,
        }
    }

    /// Attach the identifier combination of the offending series to a
    /// continuity error. Other errors are returned unchanged.
    pub fn for_series(self, label: impl Into<String>) -> Self {
        match self {
            Self::TimeContinuity {
                column,
                frequency,
                detail,
                ..
            } => Self::TimeContinuity {
                column,
                frequency,
                detail,
                series: Some(label.into()),
            },
            Self::PeriodBoundary {
                column,
                frequency,
                unit,
                example,
                ..
            } => Self::PeriodBoundary {
                column,
                frequency,
                unit,
                example,
                series: Some(label.into()),
            },
            other => other,
        }
    }
}

impl From<ndarray::ShapeError> for TimeseriesError {
    fn from(err: ndarray::ShapeError) -> Self {
        TimeseriesError::Shape {
            expected: "arrays with matching feature rows".to_string(),
            actual: err.to_string(),
        }
    }
}
