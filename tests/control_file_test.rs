// Tests for locating the w2_con control file and reading the start year

mod common;

use common::{sample, write_file};
use std::fs;
use w2_timeseries::control::{
    find_control_file, parse_year_csv, parse_year_npt, resolve_start_year, YearResolution,
};
use w2_timeseries::W2Error;

const CSV_CONTROL: &str = "W2 control file\n\
GRID,NWB,NBR,\n\
,1,1,\n\
TMSTRT,JDAYST,YEAR,\n\
,1.0,2006,\n";

fn npt_control() -> String {
    format!(
        "W2 control file\n\nTMSTRT     JDAYS    JDAYE     YEAR\n{:8}{:>8}{:>8}{:>8}\n",
        "", "1.0", "366.0", "2001"
    )
}

#[test]
fn test_sample_control_file() {
    let resolution = resolve_start_year(sample("")).unwrap();
    assert_eq!(resolution.year(), Some(2006));
}

#[test]
fn test_csv_control_file_in_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let control = write_file(dir.path(), "w2_con.csv", CSV_CONTROL);

    let resolution = resolve_start_year(dir.path()).unwrap();
    assert_eq!(
        resolution,
        YearResolution::Found {
            year: 2006,
            path: control
        }
    );
}

#[test]
fn test_control_file_in_parent_dir() {
    let dir = tempfile::tempdir().unwrap();
    let outputs = dir.path().join("outputs");
    fs::create_dir(&outputs).unwrap();
    write_file(dir.path(), "w2_con.npt", &npt_control());

    let resolution = resolve_start_year(&outputs).unwrap();
    assert_eq!(resolution.year(), Some(2001));
}

#[test]
fn test_csv_preferred_over_npt() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "w2_con.npt", &npt_control());
    write_file(dir.path(), "w2_con.csv", CSV_CONTROL);

    let found = find_control_file(dir.path()).unwrap();
    assert_eq!(found.file_name().and_then(|n| n.to_str()), Some("w2_con.csv"));
    assert_eq!(resolve_start_year(dir.path()).unwrap().year(), Some(2006));
}

#[test]
fn test_parent_csv_preferred_over_local_npt() {
    let dir = tempfile::tempdir().unwrap();
    let outputs = dir.path().join("outputs");
    fs::create_dir(&outputs).unwrap();
    write_file(&outputs, "w2_con.npt", &npt_control());
    write_file(dir.path(), "w2_con.csv", CSV_CONTROL);

    assert_eq!(resolve_start_year(&outputs).unwrap().year(), Some(2006));
}

#[test]
fn test_no_control_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a");
    fs::create_dir(&nested).unwrap();

    let resolution = resolve_start_year(&nested).unwrap();
    assert_eq!(resolution, YearResolution::NoControlFile);
    assert_eq!(resolution.year(), None);
    assert_eq!(resolution.year_or(2023), 2023);
}

#[test]
fn test_marker_missing() {
    let dir = tempfile::tempdir().unwrap();
    let control = write_file(dir.path(), "w2_con.csv", "GRID,NWB\n,1\n");

    let resolution = resolve_start_year(dir.path()).unwrap();
    assert_eq!(resolution, YearResolution::MarkerMissing { path: control });
    assert_eq!(resolution.year_or(2002), 2002);
}

#[test]
fn test_csv_marker_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "w2_con.csv", "tmstrt,jdayst,year\n, 1.0 , 2010 \n");
    assert_eq!(parse_year_csv(&path).unwrap(), Some(2010));
}

#[test]
fn test_csv_unparseable_year_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "w2_con.csv", "TMSTRT,JDAYST,YEAR\n,1.0,twenty\n");
    assert!(matches!(
        parse_year_csv(&path),
        Err(W2Error::ControlFile { .. })
    ));
}

#[test]
fn test_csv_marker_on_last_row_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "w2_con.csv", "TMSTRT,JDAYST,YEAR\n");
    assert!(matches!(
        parse_year_csv(&path),
        Err(W2Error::ControlFile { .. })
    ));
}

#[test]
fn test_npt_year_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "w2_con.npt", &npt_control());
    assert_eq!(parse_year_npt(&path).unwrap(), Some(2001));
}

#[test]
fn test_npt_time_marker() {
    let dir = tempfile::tempdir().unwrap();
    let content = format!("title\n  time con  TMSTRT    TMEND\n{:24}{:>8}\n", "", "1999");
    let path = write_file(dir.path(), "w2_con.npt", &content);
    assert_eq!(parse_year_npt(&path).unwrap(), Some(1999));
}

#[test]
fn test_npt_without_marker() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "w2_con.npt", "GRID     NWB\n          1\n");
    assert_eq!(parse_year_npt(&path).unwrap(), None);
}
