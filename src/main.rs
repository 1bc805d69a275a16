use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use w2_timeseries::config::Config;
use w2_timeseries::control::YearResolution;
use w2_timeseries::db::{table_name_for, SqliteStore};
use w2_timeseries::stats::{describe, resample, Aggregation, Frequency, Summary};
use w2_timeseries::writer::{write_w2_csv, CsvExportOptions};
use w2_timeseries::{open_time_series, LoadOptions, TimeSeriesTable};

#[derive(Parser)]
#[command(name = "w2-timeseries")]
#[command(about = "Load a CE-QUAL-W2 time series and summarize, resample, or export it", long_about = None)]
struct Cli {
    /// Time series file (*.npt, *.opt, *.csv, *.xlsx, *.xls, *.db)
    file: PathBuf,

    /// Simulation start year (skips the w2_con control file lookup)
    #[arg(long)]
    year: Option<i32>,

    /// Start year used when no control file provides one
    #[arg(long)]
    default_year: Option<i32>,

    /// Header lines before the first data row (default: through the header row)
    #[arg(long)]
    skiprows: Option<usize>,

    /// Resample before summarizing: hourly, daily, weekly, monthly
    #[arg(long)]
    resample: Option<Frequency>,

    /// Aggregation used with --resample: mean, max, min
    #[arg(long, default_value = "mean")]
    agg: Aggregation,

    /// Print the first N rows of the table
    #[arg(long, default_value = "10")]
    head: usize,

    /// Print summary statistics as JSON
    #[arg(long)]
    json: bool,

    /// Save the (resampled) table to a SQLite database
    #[arg(long)]
    save_db: Option<PathBuf>,

    /// Save summary statistics to a SQLite database
    #[arg(long)]
    save_stats: Option<PathBuf>,

    /// Export the (resampled) table as a W2 CSV input file with a JDAY column
    #[arg(long)]
    export_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let mut options = LoadOptions::new(cli.default_year.unwrap_or(config.default_year));
    options.year = cli.year;
    options.skiprows = cli.skiprows.or(config.skiprows);

    let loaded = match open_time_series(&cli.file, &options).await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    match &loaded.year_resolution {
        Some(YearResolution::Found { year, path }) => {
            info!("Start year {} from {}", year, path.display())
        }
        Some(YearResolution::MarkerMissing { path }) => warn!(
            "No start year in {}, using default {}",
            path.display(),
            options.default_year
        ),
        Some(YearResolution::NoControlFile) => warn!(
            "No control file found, using default year {}",
            options.default_year
        ),
        None => {}
    }

    let table = match cli.resample {
        Some(frequency) => {
            info!("Resampling: {} {}", frequency, cli.agg);
            resample(&loaded.table, frequency, cli.agg)?
        }
        None => loaded.table,
    };

    print_head(&table, cli.head);

    let summary = describe(&table);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    let table_name = table_name_for(&cli.file);

    if let Some(db_path) = &cli.save_db {
        let store = SqliteStore::create(db_path).await?;
        store.write_table(&table_name, &table).await?;
        store.close().await;
    }

    if let Some(db_path) = &cli.save_stats {
        let store = SqliteStore::create(db_path).await?;
        store
            .write_summary(&format!("{table_name}_stats"), &summary)
            .await?;
        store.close().await;
    }

    if let Some(csv_path) = &cli.export_csv {
        let year = loaded.year.unwrap_or(options.default_year);
        write_w2_csv(&table, csv_path, year, &CsvExportOptions::default())?;
    }

    Ok(())
}

fn print_head(table: &TimeSeriesTable, n: usize) {
    if n == 0 {
        return;
    }
    println!("{:<20} {}", table.index_name(), table.columns().join("  "));
    for (date, row) in table.dates().iter().zip(table.rows()).take(n) {
        let values: Vec<String> = row.iter().map(|v| format!("{v:.3}")).collect();
        println!("{:<20} {}", date.format("%Y-%m-%d %H:%M"), values.join("  "));
    }
    println!("[{} rows x {} columns]\n", table.len(), table.columns().len());
}

fn print_summary(summary: &Summary) {
    let names: Vec<&str> = summary.columns.iter().map(|c| c.column.as_str()).collect();
    println!("{:<8} {}", "", names.join("  "));
    for (statistic, values) in summary.rows() {
        let values: Vec<String> = values.iter().map(|v| format!("{v:.3}")).collect();
        println!("{:<8} {}", statistic, values.join("  "));
    }
}
