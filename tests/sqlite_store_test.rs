// Tests for saving and loading tables and summaries in SQLite files

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::Row;
use w2_timeseries::db::{table_name_for, SqliteStore};
use w2_timeseries::stats::describe;
use w2_timeseries::{TimeSeriesTable, W2Error};

fn dt(d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2006, 1, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn flow_table() -> TimeSeriesTable {
    TimeSeriesTable::from_rows(
        vec!["QIN".to_string(), "T(C)".to_string()],
        vec![dt(1, 0), dt(1, 12), dt(2, 0)],
        vec![vec![10.0, 4.0], vec![12.0, 4.5], vec![14.0, 5.0]],
    )
    .unwrap()
}

#[tokio::test]
async fn test_write_then_read_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::create(dir.path().join("w2.db")).await.unwrap();

    let written = store.write_table("qin_br1", &flow_table()).await.unwrap();
    assert_eq!(written, 3);

    let table = store.read_table("qin_br1").await.unwrap();
    assert_eq!(table.index_name(), "Date");
    assert_eq!(table.columns(), ["QIN", "T(C)"]);
    assert_eq!(table.dates(), flow_table().dates());
    assert_eq!(table.rows(), flow_table().rows());
    assert_eq!(table.source(), Some(store.path()));

    store.close().await;
}

#[tokio::test]
async fn test_write_replaces_existing_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::create(dir.path().join("w2.db")).await.unwrap();

    store.write_table("qin_br1", &flow_table()).await.unwrap();
    let smaller = TimeSeriesTable::from_rows(
        vec!["QIN".to_string()],
        vec![dt(3, 0)],
        vec![vec![1.0]],
    )
    .unwrap();
    store.write_table("qin_br1", &smaller).await.unwrap();

    let table = store.read_table("qin_br1").await.unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.columns(), ["QIN"]);
    assert_eq!(store.table_names().await.unwrap(), vec!["qin_br1"]);

    store.close().await;
}

#[tokio::test]
async fn test_read_first_table_in_schema_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::create(dir.path().join("w2.db")).await.unwrap();

    store.write_table("zeta", &flow_table()).await.unwrap();
    let other = TimeSeriesTable::from_rows(vec!["X".to_string()], vec![dt(5, 0)], vec![vec![9.0]])
        .unwrap();
    store.write_table("alpha", &other).await.unwrap();

    let first = store.read_first_table().await.unwrap();
    assert_eq!(first.columns(), ["QIN", "T(C)"]);

    store.close().await;
}

#[tokio::test]
async fn test_null_and_integer_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::create(dir.path().join("w2.db")).await.unwrap();
    store.write_table("seed", &flow_table()).await.unwrap();
    store.close().await;

    // Hand-built table with integer and NULL cells
    let pool = sqlx::SqlitePool::connect(&format!(
        "sqlite://{}",
        dir.path().join("w2.db").display()
    ))
    .await
    .unwrap();
    sqlx::query("DROP TABLE seed").execute(&pool).await.unwrap();
    sqlx::query("CREATE TABLE flows (Date TEXT, Q INTEGER, T REAL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO flows VALUES ('2006-01-01 00:00:00', 7, NULL)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let store = SqliteStore::open(dir.path().join("w2.db")).await.unwrap();
    let table = store.read_first_table().await.unwrap();
    assert_eq!(table.value(0, 0), Some(7.0));
    assert!(table.value(0, 1).unwrap().is_nan());
    store.close().await;
}

#[tokio::test]
async fn test_write_summary() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stats.db");
    let store = SqliteStore::create(&db_path).await.unwrap();

    let summary = describe(&flow_table());
    store.write_summary("qin_br1_stats", &summary).await.unwrap();
    store.close().await;

    let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();
    let rows = sqlx::query("SELECT * FROM qin_br1_stats").fetch_all(&pool).await.unwrap();

    let labels: Vec<String> = rows.iter().map(|r| r.get::<String, _>(0)).collect();
    assert_eq!(
        labels,
        vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
    );
    let mean: f64 = rows[1].get(1);
    assert!((mean - 12.0).abs() < 1e-9);
    let max_temp: f64 = rows[7].get(2);
    assert_eq!(max_temp, 5.0);

    pool.close().await;
}

#[tokio::test]
async fn test_open_missing_database() {
    let dir = tempfile::tempdir().unwrap();
    let result = SqliteStore::open(dir.path().join("missing.db")).await;
    assert!(matches!(result, Err(W2Error::Io { .. })));
}

#[tokio::test]
async fn test_empty_database_has_no_first_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::create(dir.path().join("empty.db")).await.unwrap();

    assert!(matches!(
        store.read_first_table().await,
        Err(W2Error::Format { .. })
    ));
    store.close().await;
}

#[test]
fn test_table_name_for() {
    assert_eq!(table_name_for("/runs/2006_DeerCrk_Cin.npt"), "2006_DeerCrk_Cin");
    assert_eq!(table_name_for("tsr_1_seg2.csv"), "tsr_1_seg2");
}
