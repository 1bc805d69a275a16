/// Open any supported time series file in one call:
/// sniff the type, resolve the start year, then dispatch to the matching reader.
use std::path::Path;
use tracing::{info, instrument};

use crate::control::{resolve_start_year, YearResolution};
use crate::db::SqliteStore;
use crate::error::W2Error;
use crate::excel::read_excel;
use crate::format::{header_row_index, sniff, FileType};
use crate::reader::{self, ReadOptions, DEFAULT_SKIPROWS};
use crate::table::TimeSeriesTable;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start year used when the control file does not provide one
    pub default_year: i32,
    /// Skip the control file lookup and use this start year
    pub year: Option<i32>,
    /// Lines before the first data row. When unset, text files skip through their
    /// header row and Excel sheets skip `DEFAULT_SKIPROWS`.
    ///
    /// For `tsr*` files (header on the first line) the unset default is 1, not 3: set
    /// `Some(3)` to reproduce a reader that always skips three lines, which drops the first
    /// two data rows of those files.
    pub skiprows: Option<usize>,
}

impl LoadOptions {
    pub fn new(default_year: i32) -> Self {
        Self {
            default_year,
            year: None,
            skiprows: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub table: TimeSeriesTable,
    pub file_type: FileType,
    /// Start year applied to the day-of-year index (text formats only)
    pub year: Option<i32>,
    pub year_resolution: Option<YearResolution>,
}

/// Load a time series from a CSV, fixed-width, Excel or SQLite file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn open_time_series(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<LoadedSeries, W2Error> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(W2Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        ));
    }

    let (file_type, columns) = sniff(path)?;
    info!("Opening {} as {}", path.display(), file_type);

    match file_type {
        FileType::FixedWidth | FileType::Csv => {
            let (year, year_resolution) = match options.year {
                Some(year) => (year, None),
                None => {
                    let resolution = resolve_start_year(data_dir(path))?;
                    (resolution.year_or(options.default_year), Some(resolution))
                }
            };

            let read_options = ReadOptions {
                skiprows: options
                    .skiprows
                    .unwrap_or_else(|| header_row_index(path) + 1),
                file_type: Some(file_type),
            };
            let table = reader::read(path, year, &columns, &read_options)?;
            Ok(LoadedSeries {
                table,
                file_type,
                year: Some(year),
                year_resolution,
            })
        }
        FileType::Excel => Ok(LoadedSeries {
            table: read_excel(path, options.skiprows.unwrap_or(DEFAULT_SKIPROWS))?,
            file_type,
            year: None,
            year_resolution: None,
        }),
        FileType::Sqlite => {
            let store = SqliteStore::open(path).await?;
            let table = store.read_first_table().await;
            store.close().await;
            Ok(LoadedSeries {
                table: table?,
                file_type,
                year: None,
                year_resolution: None,
            })
        }
        FileType::Unknown => Err(W2Error::UnsupportedFileType(path.to_path_buf())),
    }
}

fn data_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
