use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::W2Error;

/// Name of the timestamp index of every loaded table
pub const INDEX_NAME: &str = "Date";

/// Format used when a date cell is edited by hand
pub const CELL_DATE_FORMAT: &str = "%m/%d/%Y %H:%M";

#[derive(Error, Debug, PartialEq)]
pub enum CellEditError {
    #[error("Row {row} is out of range (table has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Column {col} is out of range (table has {cols} columns)")]
    ColumnOutOfRange { col: usize, cols: usize },

    #[error("Cannot convert {0:?} to a number")]
    InvalidNumber(String),

    #[error("Cannot convert {0:?} to a date (expected MM/DD/YYYY HH:MM)")]
    InvalidDate(String),
}

/// A dated W2 time series: one timestamp per row and a fixed set of numeric columns.
///
/// Values are stored row-major. Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    index_name: String,
    dates: Vec<NaiveDateTime>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    source: Option<PathBuf>,
}

impl TimeSeriesTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            index_name: INDEX_NAME.to_string(),
            dates: Vec::new(),
            columns,
            rows: Vec::new(),
            source: None,
        }
    }

    /// Build a table from parallel date/row vectors, checking every row width
    pub fn from_rows(
        columns: Vec<String>,
        dates: Vec<NaiveDateTime>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, W2Error> {
        if dates.len() != rows.len() {
            return Err(W2Error::RowCountMismatch {
                dates: dates.len(),
                rows: rows.len(),
            });
        }
        let mut table = Self::new(columns);
        for (date, values) in dates.into_iter().zip(rows) {
            table.push_row(date, values)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, date: NaiveDateTime, values: Vec<f64>) -> Result<(), W2Error> {
        if values.len() != self.columns.len() {
            return Err(W2Error::ColumnMismatch {
                expected: self.columns.len(),
                found: values.len(),
                row: self.rows.len(),
            });
        }
        self.dates.push(date);
        self.rows.push(values);
        Ok(())
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// File the table was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of one column's values, in row order
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.column_at(idx))
    }

    pub(crate) fn column_at(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[idx]).collect()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Replace a value from user-entered text. On failure the table is unchanged.
    pub fn set_value(&mut self, row: usize, col: usize, text: &str) -> Result<f64, CellEditError> {
        let rows = self.rows.len();
        let cols = self.columns.len();
        let cell = self
            .rows
            .get_mut(row)
            .ok_or(CellEditError::RowOutOfRange { row, rows })?
            .get_mut(col)
            .ok_or(CellEditError::ColumnOutOfRange { col, cols })?;

        let value = text
            .trim()
            .parse::<f64>()
            .map_err(|_| CellEditError::InvalidNumber(text.to_string()))?;
        *cell = value;
        Ok(value)
    }

    /// Replace a row's timestamp from user-entered text (`MM/DD/YYYY HH:MM`)
    pub fn set_date(&mut self, row: usize, text: &str) -> Result<NaiveDateTime, CellEditError> {
        let rows = self.dates.len();
        let cell = self
            .dates
            .get_mut(row)
            .ok_or(CellEditError::RowOutOfRange { row, rows })?;

        let date = NaiveDateTime::parse_from_str(text.trim(), CELL_DATE_FORMAT)
            .map_err(|_| CellEditError::InvalidDate(text.to_string()))?;
        *cell = date;
        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> TimeSeriesTable {
        let d = NaiveDate::from_ymd_opt(2006, 1, 1).unwrap();
        TimeSeriesTable::from_rows(
            vec!["Flow".to_string(), "Temp".to_string()],
            vec![d.and_hms_opt(0, 0, 0).unwrap(), d.and_hms_opt(1, 0, 0).unwrap()],
            vec![vec![1.0, 10.0], vec![2.0, 11.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_index_name_is_date() {
        assert_eq!(sample().index_name(), "Date");
    }

    #[test]
    fn test_column_lookup() {
        let table = sample();
        assert_eq!(table.column("Temp"), Some(vec![10.0, 11.0]));
        assert_eq!(table.column("Missing"), None);
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = sample();
        let d = NaiveDate::from_ymd_opt(2006, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(matches!(
            table.push_row(d, vec![1.0]),
            Err(W2Error::ColumnMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_from_rows_rejects_row_count_mismatch() {
        let d = NaiveDate::from_ymd_opt(2006, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let result = TimeSeriesTable::from_rows(
            vec!["A".to_string()],
            vec![d],
            vec![vec![1.0], vec![2.0], vec![3.0]],
        );
        assert!(matches!(
            result,
            Err(W2Error::RowCountMismatch { dates: 1, rows: 3 })
        ));

        let result = TimeSeriesTable::from_rows(vec!["A".to_string()], vec![d, d], vec![vec![1.0]]);
        assert!(matches!(
            result,
            Err(W2Error::RowCountMismatch { dates: 2, rows: 1 })
        ));
    }

    #[test]
    fn test_set_value() {
        let mut table = sample();
        assert_eq!(table.set_value(1, 0, " 4.5 "), Ok(4.5));
        assert_eq!(table.value(1, 0), Some(4.5));
    }

    #[test]
    fn test_set_value_bad_text_leaves_table_unchanged() {
        let mut table = sample();
        let before = table.clone();
        assert_eq!(
            table.set_value(0, 1, "warm"),
            Err(CellEditError::InvalidNumber("warm".to_string()))
        );
        assert_eq!(table, before);
    }

    #[test]
    fn test_set_value_out_of_range() {
        let mut table = sample();
        assert!(matches!(
            table.set_value(5, 0, "1"),
            Err(CellEditError::RowOutOfRange { row: 5, rows: 2 })
        ));
        assert!(matches!(
            table.set_value(0, 9, "1"),
            Err(CellEditError::ColumnOutOfRange { col: 9, cols: 2 })
        ));
    }

    #[test]
    fn test_set_date() {
        let mut table = sample();
        let date = table.set_date(0, "03/15/2006 06:00").unwrap();
        assert_eq!(
            date,
            NaiveDate::from_ymd_opt(2006, 3, 15)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap()
        );
        assert_eq!(table.dates()[0], date);
    }

    #[test]
    fn test_set_date_invalid() {
        let mut table = sample();
        assert!(matches!(
            table.set_date(0, "2006-03-15"),
            Err(CellEditError::InvalidDate(_))
        ));
    }
}
