/// Write a dated table back out as a W2 CSV input file (JDAY + one column per series)
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

use crate::datetime::datetime_to_day_of_year;
use crate::error::W2Error;
use crate::table::TimeSeriesTable;

/// Title block written when the caller gives none
pub const DEFAULT_HEADER: &str = "$\n\n";
pub const DEFAULT_PRECISION: usize = 3;

#[derive(Debug, Clone)]
pub struct CsvExportOptions {
    pub header: String,
    pub precision: usize,
}

impl Default for CsvExportOptions {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Write `table` with its dates converted to JDAY relative to Jan 1 of `year`.
/// Missing values are written as empty fields.
#[instrument(skip(table, options), fields(path = %path.as_ref().display()))]
pub fn write_w2_csv(
    table: &TimeSeriesTable,
    path: impl AsRef<Path>,
    year: i32,
    options: &CsvExportOptions,
) -> Result<(), W2Error> {
    let path = path.as_ref();
    let precision = options.precision;

    // All rows are converted before the file is created
    let mut records = Vec::with_capacity(table.len());
    for (date, row) in table.dates().iter().zip(table.rows()) {
        let jday = datetime_to_day_of_year(year, *date).ok_or_else(|| W2Error::Unreadable {
            path: path.to_path_buf(),
            msg: format!("cannot express {date} as a day of year relative to {year}"),
        })?;

        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(format!("{jday:.precision$}"));
        record.extend(row.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                format!("{v:.precision$}")
            }
        }));
        records.push(record);
    }

    let io_err = |e: std::io::Error| W2Error::io(path, e);
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(options.header.as_bytes()).map_err(io_err)?;

    let mut writer = csv::Writer::from_writer(file);
    let csv_err = |e: csv::Error| W2Error::Unreadable {
        path: path.to_path_buf(),
        msg: e.to_string(),
    };

    let mut header = vec!["JDAY".to_string()];
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;
    for record in &records {
        writer.write_record(record).map_err(csv_err)?;
    }

    writer.flush().map_err(io_err)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}
