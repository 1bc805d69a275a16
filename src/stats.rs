/// Summary statistics and time resampling for loaded time series
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::W2Error;
use crate::table::TimeSeriesTable;

/// Row labels of a summary, in display order
pub const STATISTIC_NAMES: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Descriptive statistics of one column. Missing values (NaN) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(column: &str, values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = if count == 0 {
            f64::NAN
        } else {
            sorted.iter().sum::<f64>() / count as f64
        };
        let std = if count < 2 {
            f64::NAN
        } else {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };

        Self {
            column: column.to_string(),
            count,
            mean,
            std,
            min: sorted.first().copied().unwrap_or(f64::NAN),
            p25: percentile(&sorted, 0.25),
            median: percentile(&sorted, 0.5),
            p75: percentile(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }

    /// Values in `STATISTIC_NAMES` order
    pub fn values(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.p25,
            self.median,
            self.p75,
            self.max,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub columns: Vec<ColumnSummary>,
}

impl Summary {
    /// One row per statistic, one value per column
    pub fn rows(&self) -> Vec<(&'static str, Vec<f64>)> {
        STATISTIC_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, self.columns.iter().map(|c| c.values()[i]).collect()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Count, mean, sample standard deviation, min, quartiles and max of every column
pub fn describe(table: &TimeSeriesTable) -> Summary {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| ColumnSummary::from_values(name, &table.column_at(idx)))
        .collect();
    Summary { columns }
}

/// Linear interpolation between closest ranks of sorted data
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Hourly,
    Daily,
    /// Weeks end on Sunday and are labelled by that Sunday
    Weekly,
    /// Labelled by the last day of the month
    Monthly,
}

impl Frequency {
    /// Label of the bin holding `date_time`
    fn bin(&self, date_time: NaiveDateTime) -> NaiveDateTime {
        let date = date_time.date();
        match self {
            Frequency::Hourly => date
                .and_hms_opt(date_time.hour(), 0, 0)
                .unwrap_or(date_time),
            Frequency::Daily => date.and_time(NaiveTime::MIN),
            Frequency::Weekly => {
                let days_to_sunday = (7 - date.weekday().num_days_from_sunday()) % 7;
                (date + Duration::days(i64::from(days_to_sunday))).and_time(NaiveTime::MIN)
            }
            Frequency::Monthly => month_end(date.year(), date.month()).and_time(NaiveTime::MIN),
        }
    }

    fn next(&self, bin: NaiveDateTime) -> NaiveDateTime {
        match self {
            Frequency::Hourly => bin + Duration::hours(1),
            Frequency::Daily => bin + Duration::days(1),
            Frequency::Weekly => bin + Duration::weeks(1),
            Frequency::Monthly => {
                let first_of_next = bin.date() + Duration::days(1);
                month_end(first_of_next.year(), first_of_next.month()).and_time(NaiveTime::MIN)
            }
        }
    }
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" | "h" => Ok(Frequency::Hourly),
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Hourly => "Hourly",
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    Max,
    Min,
}

impl Aggregation {
    fn apply(&self, values: &[f64]) -> f64 {
        let mut present = values.iter().copied().filter(|v| !v.is_nan()).peekable();
        if present.peek().is_none() {
            return f64::NAN;
        }
        match self {
            Aggregation::Mean => {
                let (sum, n) = present.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                sum / n as f64
            }
            Aggregation::Max => present.fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Min => present.fold(f64::INFINITY, f64::min),
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Aggregation::Mean),
            "max" => Ok(Aggregation::Max),
            "min" => Ok(Aggregation::Min),
            other => Err(format!("unknown aggregation: {other}")),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Mean => "Mean",
            Aggregation::Max => "Max",
            Aggregation::Min => "Min",
        };
        f.write_str(name)
    }
}

/// Aggregate rows into regular time bins.
///
/// Bins run continuously from the first to the last bin that holds data. Bins with no
/// data are filled by linear interpolation between neighbouring bins; leading gaps stay
/// NaN and trailing gaps repeat the last value.
pub fn resample(
    table: &TimeSeriesTable,
    frequency: Frequency,
    aggregation: Aggregation,
) -> Result<TimeSeriesTable, W2Error> {
    let width = table.columns().len();
    let mut bins: BTreeMap<NaiveDateTime, Vec<Vec<f64>>> = BTreeMap::new();

    for (date, row) in table.dates().iter().zip(table.rows()) {
        let values = bins
            .entry(frequency.bin(*date))
            .or_insert_with(|| vec![Vec::new(); width]);
        for (col, value) in row.iter().enumerate() {
            values[col].push(*value);
        }
    }

    let mut result = TimeSeriesTable::new(table.columns().to_vec());
    if let Some(source) = table.source() {
        result = result.with_source(source);
    }

    let (Some(first), Some(last)) = (
        bins.keys().next().copied(),
        bins.keys().next_back().copied(),
    ) else {
        return Ok(result);
    };

    let mut labels = Vec::new();
    let mut bin = first;
    while bin <= last {
        labels.push(bin);
        bin = frequency.next(bin);
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(labels.len()); width];
    for label in &labels {
        for (col, out) in columns.iter_mut().enumerate() {
            let value = bins
                .get(label)
                .map(|values| aggregation.apply(&values[col]))
                .unwrap_or(f64::NAN);
            out.push(value);
        }
    }

    for column in columns.iter_mut() {
        interpolate_gaps(column);
    }

    for (i, label) in labels.into_iter().enumerate() {
        let row: Vec<f64> = columns.iter().map(|c| c[i]).collect();
        result.push_row(label, row)?;
    }

    Ok(result)
}

/// Fill NaN gaps by linear interpolation over position
fn interpolate_gaps(values: &mut [f64]) {
    let mut last_valid: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(prev) = last_valid {
            let span = (i - prev) as f64;
            for j in (prev + 1)..i {
                let t = (j - prev) as f64 / span;
                values[j] = values[prev] + (values[i] - values[prev]) * t;
            }
        }
        last_valid = Some(i);
    }

    if let Some(prev) = last_valid {
        let fill = values[prev];
        for v in values.iter_mut().skip(prev + 1) {
            *v = fill;
        }
    }
}
