pub mod config;
pub mod control;
pub mod datetime;
pub mod db;
pub mod error;
pub mod excel;
pub mod format;
pub mod loader;
pub mod reader;
pub mod stats;
pub mod table;
pub mod writer;

pub use error::W2Error;
pub use format::FileType;
pub use loader::{open_time_series, LoadOptions, LoadedSeries};
pub use table::TimeSeriesTable;
