/// Excel time series loader
///
/// # Expected Sheet Structure (first worksheet):
/// ```text
/// Row 1-3: Title / notes (skipped, see `skiprows`)
/// Row 4:   Header (first cell is replaced by "Date", remaining cells name the series)
/// Row 5-N: MM/DD/YYYY HH:MM (or an Excel date cell) | value | value | ...
/// ```
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::error::W2Error;
use crate::table::{TimeSeriesTable, CELL_DATE_FORMAT};

const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Read the first worksheet of an Excel workbook as a dated time series
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_excel(path: impl AsRef<Path>, skiprows: usize) -> Result<TimeSeriesTable, W2Error> {
    let path = path.as_ref();

    let mut workbook = match open_workbook_auto(path) {
        Ok(wb) => wb,
        Err(e) => return Err(excel_error(path, format!("failed to open workbook: {e}"))),
    };

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(excel_error(path, e.to_string())),
        None => return Err(excel_error(path, "workbook has no worksheets".to_string())),
    };

    let table = parse_range(path, &range, skiprows)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table.with_source(path))
}

/// Parse a worksheet range. Row and column numbers are absolute sheet positions.
pub fn parse_range(
    path: &Path,
    range: &Range<Data>,
    skiprows: usize,
) -> Result<TimeSeriesTable, W2Error> {
    let Some((end_row, end_col)) = range.end() else {
        return Err(excel_error(path, "worksheet is empty".to_string()));
    };

    let header_row = skiprows as u32;
    if header_row > end_row {
        return Err(excel_error(
            path,
            format!("worksheet is shorter than header row {}", header_row + 1),
        ));
    }

    let columns: Vec<String> = (1..=end_col)
        .map(|col| header_name(range.get_value((header_row, col)), col))
        .collect();
    debug!("Found {} data columns", columns.len());

    let mut table = TimeSeriesTable::new(columns);

    for row in (header_row + 1)..=end_row {
        let cells: Vec<Option<&Data>> = (0..=end_col)
            .map(|col| range.get_value((row, col)))
            .collect();
        if cells.iter().all(|c| is_blank(*c)) {
            continue;
        }

        let date = parse_date(cells[0]).ok_or_else(|| {
            excel_error(
                path,
                format!("row {}: invalid date {:?}", row + 1, cells[0]),
            )
        })?;

        let mut values = Vec::with_capacity(cells.len() - 1);
        for (col, cell) in cells.iter().enumerate().skip(1) {
            let value = parse_value(*cell).ok_or_else(|| {
                excel_error(
                    path,
                    format!("row {}, col {}: expected number, got {:?}", row + 1, col + 1, cell),
                )
            })?;
            values.push(value);
        }

        table.push_row(date, values)?;
    }

    Ok(table)
}

fn header_name(cell: Option<&Data>, col: u32) -> String {
    match cell {
        Some(Data::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Float(f)) => f.to_string(),
        _ => format!("Unnamed: {col}"),
    }
}

fn is_blank(cell: Option<&Data>) -> bool {
    match cell {
        None | Some(Data::Empty) => true,
        Some(Data::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Parse a date cell: Excel date, ISO text, `MM/DD/YYYY HH:MM` text, or a date serial
fn parse_date(cell: Option<&Data>) -> Option<NaiveDateTime> {
    match cell? {
        Data::DateTime(excel_date) => excel_date.as_datetime(),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s.trim(), ISO_DATETIME_FORMAT).ok(),
        Data::String(s) => NaiveDateTime::parse_from_str(s.trim(), CELL_DATE_FORMAT).ok(),
        Data::Float(f) => excel_serial_to_datetime(*f),
        Data::Int(i) => excel_serial_to_datetime(*i as f64),
        _ => None,
    }
}

/// Parse a value cell. Blank cells are missing values (NaN).
fn parse_value(cell: Option<&Data>) -> Option<f64> {
    match cell {
        None | Some(Data::Empty) => Some(f64::NAN),
        Some(Data::Float(f)) => Some(*f),
        Some(Data::Int(i)) => Some(*i as f64),
        Some(Data::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(f64::NAN)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Excel serial date (days since 1899-12-30, fraction = time of day) to a timestamp
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::try_seconds(seconds)?)
}

fn excel_error(path: &Path, msg: String) -> W2Error {
    W2Error::Excel {
        path: path.to_path_buf(),
        msg,
    }
}
