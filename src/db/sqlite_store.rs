use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::db::pool;
use crate::error::W2Error;
use crate::stats::Summary;
use crate::table::TimeSeriesTable;

/// Text format of the Date column in saved tables
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Time series tables stored in a SQLite file, one series per table
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteStore {
    /// Open an existing database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, W2Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(W2Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "database file not found"),
            ));
        }
        let pool = pool::connect(path, false).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Open a database file, creating it if needed
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, W2Error> {
        let path = path.as_ref();
        let pool = pool::connect(path, true).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// User table names in schema order
    pub async fn table_names(&self) -> Result<Vec<String>, W2Error> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Read the first table in the database
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read_first_table(&self) -> Result<TimeSeriesTable, W2Error> {
        let names = self.table_names().await?;
        let first = names.first().ok_or_else(|| W2Error::Format {
            path: self.path.clone(),
            msg: "database contains no tables".to_string(),
        })?;
        self.read_table(first).await
    }

    /// Read a table whose first column holds dates and remaining columns hold values
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read_table(&self, name: &str) -> Result<TimeSeriesTable, W2Error> {
        let column_names = sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        if column_names.is_empty() {
            return Err(self.format_error(format!("table {name:?} not found")));
        }

        let rows = sqlx::query(&format!("SELECT * FROM {}", quote_ident(name)))
            .fetch_all(&self.pool)
            .await?;
        debug!("Fetched {} rows from table {}", rows.len(), name);

        let mut table = TimeSeriesTable::new(column_names[1..].to_vec());
        for (row_idx, row) in rows.iter().enumerate() {
            let date = date_at(row, 0).ok_or_else(|| {
                self.format_error(format!("row {}: invalid date in {}", row_idx + 1, column_names[0]))
            })?;

            let mut values = Vec::with_capacity(column_names.len() - 1);
            for col in 1..column_names.len() {
                let value = value_at(row, col).ok_or_else(|| {
                    self.format_error(format!(
                        "row {}: non-numeric value in {}",
                        row_idx + 1,
                        column_names[col]
                    ))
                })?;
                values.push(value);
            }
            table.push_row(date, values)?;
        }

        info!(
            "Loaded {} rows x {} columns from table {}",
            table.len(),
            table.columns().len(),
            name
        );
        Ok(table.with_source(&self.path))
    }

    /// Save a table, replacing any existing table with the same name
    #[instrument(skip(self, table), fields(path = %self.path.display(), rows = table.len()))]
    pub async fn write_table(&self, name: &str, table: &TimeSeriesTable) -> Result<usize, W2Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .execute(&mut *tx)
            .await?;

        let mut definitions = vec![format!("{} TEXT", quote_ident(table.index_name()))];
        definitions.extend(table.columns().iter().map(|c| format!("{} REAL", quote_ident(c))));
        sqlx::query(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(name),
            definitions.join(", ")
        ))
        .execute(&mut *tx)
        .await?;

        let insert = insert_sql(name, table.columns().len() + 1);
        for (date, row) in table.dates().iter().zip(table.rows()) {
            let mut query = sqlx::query(&insert).bind(date.format(DB_DATETIME_FORMAT).to_string());
            for value in row {
                query = query.bind(finite(*value));
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("Saved {} rows to table {}", table.len(), name);
        Ok(table.len())
    }

    /// Save summary statistics (one row per statistic), replacing any existing table
    pub async fn write_summary(&self, name: &str, summary: &Summary) -> Result<(), W2Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .execute(&mut *tx)
            .await?;

        let mut definitions = vec![format!("{} TEXT", quote_ident("statistic"))];
        definitions.extend(
            summary
                .columns
                .iter()
                .map(|c| format!("{} REAL", quote_ident(&c.column))),
        );
        sqlx::query(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(name),
            definitions.join(", ")
        ))
        .execute(&mut *tx)
        .await?;

        let insert = insert_sql(name, summary.columns.len() + 1);
        for (statistic, values) in summary.rows() {
            let mut query = sqlx::query(&insert).bind(statistic);
            for value in values {
                query = query.bind(finite(value));
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("Saved summary statistics to table {}", name);
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    fn format_error(&self, msg: String) -> W2Error {
        W2Error::Format {
            path: self.path.clone(),
            msg,
        }
    }
}

/// Table name used when saving a series loaded from `path` (the file stem)
pub fn table_name_for(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("timeseries")
        .to_string()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn insert_sql(table: &str, placeholders: usize) -> String {
    format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(table),
        vec!["?"; placeholders].join(", ")
    )
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn parse_db_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    ACCEPTED_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn date_at(row: &SqliteRow, idx: usize) -> Option<NaiveDateTime> {
    let text: Option<String> = row.try_get(idx).ok()?;
    parse_db_datetime(&text?)
}

/// Numeric cell as f64. NULL is a missing value; REAL, INTEGER and numeric TEXT are accepted.
fn value_at(row: &SqliteRow, idx: usize) -> Option<f64> {
    if let Ok(value) = row.try_get::<Option<f64>, _>(idx) {
        return Some(value.unwrap_or(f64::NAN));
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(idx) {
        return Some(value.map(|v| v as f64).unwrap_or(f64::NAN));
    }
    let text: Option<String> = row.try_get(idx).ok()?;
    match text {
        None => Some(f64::NAN),
        Some(t) if t.trim().is_empty() => Some(f64::NAN),
        Some(t) => t.trim().parse().ok(),
    }
}
