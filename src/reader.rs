/// CE-QUAL-W2 time series reader
///
/// Reads fixed-width (`*.npt`, `*.opt`) and CSV time series into a table indexed by day
/// of year, then converts that index to timestamps using the simulation start year.
///
/// # File layout
/// ```text
/// Line 1-3: title, comments, column header (skipped, see `skiprows`)
/// Line 4-N: JDAY | value 1 | value 2 | ...
/// ```
///
/// Legacy files are not consistent about delimiters: a `*.npt` file may actually be
/// comma delimited, and CSV rows often end with one or two trailing commas.
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::datetime::day_of_year_to_datetimes;
use crate::error::W2Error;
use crate::format::{split_fixed_width_line, FileType, FIELD_WIDTH};
use crate::table::TimeSeriesTable;

/// Header lines skipped before the first data row
pub const DEFAULT_SKIPROWS: usize = 3;

/// Trailing empty fields tolerated on a CSV row (one per stray trailing comma)
pub const MAX_TRAILING_EMPTY_FIELDS: usize = 2;

/// Standard column names of a W2 meteorology input file
pub const MET_COLUMNS: [&str; 6] = [
    "Air Temperature (°C)",
    "Dew Point Temperature (°C)",
    "Wind Speed (m/s)",
    "Wind Direction (radians)",
    "Cloudiness (fraction)",
    "Solar Radiation (W/m²)",
];

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub skiprows: usize,
    /// Overrides the extension-based file type when set
    pub file_type: Option<FileType>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            skiprows: DEFAULT_SKIPROWS,
            file_type: None,
        }
    }
}

/// Time series still indexed by day of year (before the start year is applied)
#[derive(Debug, Clone, PartialEq)]
pub struct DayOfYearSeries {
    pub columns: Vec<String>,
    pub days: Vec<f64>,
    pub rows: Vec<Vec<f64>>,
    pub source: PathBuf,
}

impl DayOfYearSeries {
    fn new(columns: &[String], source: &Path) -> Self {
        Self {
            columns: columns.to_vec(),
            days: Vec::new(),
            rows: Vec::new(),
            source: source.to_path_buf(),
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Replace the day-of-year index with timestamps rounded to the nearest hour
    pub fn into_dated(self, year: i32) -> Result<TimeSeriesTable, W2Error> {
        let dates = day_of_year_to_datetimes(year, &self.days).map_err(|e| match e {
            W2Error::InvalidDayOfYear { line, value } => W2Error::Unreadable {
                path: self.source.clone(),
                msg: format!("data row {line}: day of year {value} cannot be converted"),
            },
            other => other,
        })?;

        let table = TimeSeriesTable::from_rows(self.columns, dates, self.rows)?;
        Ok(table.with_source(self.source))
    }
}

/// Read a fixed-width time series. Falls back to CSV parsing when the first data line
/// contains a comma.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_fixed_width(
    path: impl AsRef<Path>,
    columns: &[String],
    skiprows: usize,
) -> Result<DayOfYearSeries, W2Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| W2Error::io(path, e))?;

    if first_data_line(&content, skiprows).is_some_and(|line| line.contains(',')) {
        info!("{} is comma delimited, reading as CSV", path.display());
        return parse_csv(path, &content, columns, skiprows);
    }

    let field_count = columns.len() + 1;
    let mut series = DayOfYearSeries::new(columns, path);

    for (line_no, line) in data_lines(&content, skiprows) {
        let fields = split_fixed_width_line(line, FIELD_WIDTH);
        let fields: Vec<&str> = (0..field_count)
            .map(|i| fields.get(i).map(|f| f.trim()).unwrap_or(""))
            .collect();

        let (day, values) = parse_row(path, line_no, &fields, columns)?;
        series.days.push(day);
        series.rows.push(values);
    }

    debug!("Read {} fixed-width rows", series.len());
    Ok(series)
}

/// Read a comma-delimited time series
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_csv(
    path: impl AsRef<Path>,
    columns: &[String],
    skiprows: usize,
) -> Result<DayOfYearSeries, W2Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| W2Error::io(path, e))?;
    parse_csv(path, &content, columns, skiprows)
}

/// Read a W2 text time series and convert its day-of-year index to dates
#[instrument(skip(path, columns, options), fields(path = %path.as_ref().display()))]
pub fn read(
    path: impl AsRef<Path>,
    year: i32,
    columns: &[String],
    options: &ReadOptions,
) -> Result<TimeSeriesTable, W2Error> {
    let path = path.as_ref();
    let file_type = options
        .file_type
        .unwrap_or_else(|| FileType::from_path(path));

    debug!("Reading {} as {}", path.display(), file_type);

    let series = match file_type {
        FileType::FixedWidth => read_fixed_width(path, columns, options.skiprows)?,
        FileType::Csv => read_csv(path, columns, options.skiprows)?,
        _ => return Err(W2Error::UnsupportedFileType(path.to_path_buf())),
    };

    let table = series.into_dated(year)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Read a meteorology input file using the standard W2 met column names
pub fn read_met(
    path: impl AsRef<Path>,
    year: i32,
    options: &ReadOptions,
) -> Result<TimeSeriesTable, W2Error> {
    let columns: Vec<String> = MET_COLUMNS.iter().map(|c| c.to_string()).collect();
    read(path, year, &columns, options)
}

fn parse_csv(
    path: &Path,
    content: &str,
    columns: &[String],
    skiprows: usize,
) -> Result<DayOfYearSeries, W2Error> {
    let field_count = columns.len() + 1;
    let mut series = DayOfYearSeries::new(columns, path);
    let mut padded_rows = 0;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(skip_lines(content, skiprows).as_bytes());

    for record in reader.records() {
        let record = record.map_err(|e| W2Error::Unreadable {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        let line_no = skiprows
            + record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(series.len() + 1);

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let mut fields: Vec<&str> = record.iter().collect();
        if fields.len() > field_count {
            let extra = fields.split_off(field_count);
            if extra.len() > MAX_TRAILING_EMPTY_FIELDS || extra.iter().any(|f| !f.is_empty()) {
                return Err(W2Error::Unreadable {
                    path: path.to_path_buf(),
                    msg: format!(
                        "line {line_no}: expected {field_count} fields, found {}",
                        field_count + extra.len()
                    ),
                });
            }
            padded_rows += 1;
        }
        fields.resize(field_count, "");

        let (day, values) = parse_row(path, line_no, &fields, columns)?;
        series.days.push(day);
        series.rows.push(values);
    }

    if padded_rows > 0 {
        warn!(
            "{}: dropped trailing empty fields on {} rows",
            path.display(),
            padded_rows
        );
    }

    debug!("Read {} CSV rows", series.len());
    Ok(series)
}

/// Parse one data row: day of year followed by one value per column. Blank values are NaN.
fn parse_row(
    path: &Path,
    line_no: usize,
    fields: &[&str],
    columns: &[String],
) -> Result<(f64, Vec<f64>), W2Error> {
    let unreadable = |msg: String| W2Error::Unreadable {
        path: path.to_path_buf(),
        msg: format!("line {line_no}: {msg}"),
    };

    let day_field = fields.first().copied().unwrap_or("");
    let day = day_field
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .ok_or_else(|| unreadable(format!("invalid day of year {day_field:?}")))?;

    let mut values = Vec::with_capacity(columns.len());
    for (field, column) in fields[1..].iter().zip(columns) {
        if field.is_empty() {
            values.push(f64::NAN);
            continue;
        }
        let value = field
            .parse::<f64>()
            .map_err(|_| unreadable(format!("invalid value {field:?} in column {column:?}")))?;
        values.push(value);
    }

    Ok((day, values))
}

/// Non-blank lines after the header, with their 1-based line numbers
fn data_lines(content: &str, skiprows: usize) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .skip(skiprows)
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn first_data_line(content: &str, skiprows: usize) -> Option<&str> {
    content.lines().nth(skiprows)
}

fn skip_lines(content: &str, n: usize) -> &str {
    if n == 0 {
        return content;
    }
    match content.match_indices('\n').nth(n - 1) {
        Some((idx, _)) => &content[idx + 1..],
        None => "",
    }
}
