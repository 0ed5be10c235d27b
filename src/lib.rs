//! Timeseries dataset builder and forecast reconstructor.
//!
//! A [`Table`] (in memory or read from DuckDB) is turned into validated
//! per-series records by a [`DatasetBuilder`]. An opaque [`Predictor`]
//! forecasts those records, and [`reconstruct`] reassembles its quantile
//! forecasts into one wide table, optionally merged with the history. The
//! result can be written back to DuckDB with [`write_forecast_table`].
//!
//! ```no_run
//! use duckdb::Connection;
//! use quackcast::{
//!     read_training_table, write_forecast_table, DatasetParams, EtsPredictor,
//!     ForecastReconstructor, PredictParams,
//! };
//!
//! # fn main() -> quackcast::Result<()> {
//! let conn = Connection::open("sales.duckdb")?;
//! let params = DatasetParams::from_json(
//!     r#"{"time_column": "ds", "target_columns": ["sales"], "timeseries_identifiers": ["store"],
//!         "time_granularity_unit": "M", "time_granularity_step": 1, "prediction_length": 6}"#,
//! )?;
//! let table = read_training_table(&conn, "sales", &params)?;
//! params.validate(&table.column_names())?;
//! let dataset = params.builder()?.build(&table, None)?;
//!
//! let reconstructor = ForecastReconstructor::new(EtsPredictor::new(6), PredictParams::default())?;
//! let forecasts = reconstructor.predict(&dataset)?;
//! write_forecast_table(&conn, "sales_forecast", &forecasts)?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod dataset;
pub mod error;
pub mod forecast;

pub use common::frequency::{Frequency, TimeUnit};
pub use common::params::DatasetParams;
pub use common::table::{Column, Table};
pub use common::table_reader::{read_table, read_training_table};
pub use common::time_grid::validate_time_grid;
pub use common::types::{ExternalFeatures, Identifiers, SeriesDataset, SeriesRecord};
pub use dataset::{attach_future_features, check_external_features, check_future_schema, DatasetBuilder};
pub use error::{ErrorKind, Result, TimeseriesError};
pub use forecast::models::EtsPredictor;
pub use forecast::output::{ForecastTable, RowOrigin};
pub use forecast::params::PredictParams;
pub use forecast::predictor::{
    FixedQuantileForecast, GaussianForecast, Predictor, QuantileCapability, QuantileForecast, SampleForecast,
};
pub use forecast::table_writer::write_forecast_table;
pub use forecast::{reconstruct, ForecastReconstructor, Reconstruction};
