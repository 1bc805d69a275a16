/// CE-QUAL-W2 control file (w2_con) start year lookup
///
/// Day-of-year values are only meaningful with the simulation start year, which lives in
/// the model's control file next to (or one directory above) the time series files.
///
/// CSV layout:
/// ```text
/// TMSTRT,JDAYST,YEAR
/// ,1.0,2006
/// ```
///
/// Fixed-width layout (the year starts at column 25 of the line after the marker):
/// ```text
/// TMSTRT     JDAYS    JDAYE     YEAR
///              1.0    366.0     2006
/// ```
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::W2Error;

pub const CONTROL_FILE_CSV: &str = "w2_con.csv";
pub const CONTROL_FILE_NPT: &str = "w2_con.npt";

/// Characters skipped on the fixed-width line holding the start year
pub const YEAR_OFFSET: usize = 24;

const CSV_MARKER: &str = "TMSTRT";
const NPT_MARKERS: [&str; 2] = ["TMSTR", "TIME"];

/// Outcome of looking for the simulation start year
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearResolution {
    Found { year: i32, path: PathBuf },
    /// A control file exists but has no start time marker
    MarkerMissing { path: PathBuf },
    NoControlFile,
}

impl YearResolution {
    pub fn year(&self) -> Option<i32> {
        match self {
            YearResolution::Found { year, .. } => Some(*year),
            _ => None,
        }
    }

    /// Resolved year, or the caller's default when none was found
    pub fn year_or(&self, default_year: i32) -> i32 {
        self.year().unwrap_or(default_year)
    }
}

/// Candidate control file paths for a data directory, in search order
pub fn control_file_candidates(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let dir = dir.as_ref();
    vec![
        dir.join(CONTROL_FILE_CSV),
        dir.join("..").join(CONTROL_FILE_CSV),
        dir.join(CONTROL_FILE_NPT),
        dir.join("..").join(CONTROL_FILE_NPT),
    ]
}

/// First existing control file for `dir`
pub fn find_control_file(dir: impl AsRef<Path>) -> Option<PathBuf> {
    control_file_candidates(dir)
        .into_iter()
        .find(|path| path.is_file())
}

/// Find the control file for `dir` and read the start year from it
pub fn resolve_start_year(dir: impl AsRef<Path>) -> Result<YearResolution, W2Error> {
    let dir = dir.as_ref();
    let Some(path) = find_control_file(dir) else {
        warn!("No control file found for {}", dir.display());
        return Ok(YearResolution::NoControlFile);
    };

    debug!("Using control file {}", path.display());

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let year = if is_csv {
        parse_year_csv(&path)?
    } else {
        parse_year_npt(&path)?
    };

    match year {
        Some(year) => {
            info!("Model start year {} from {}", year, path.display());
            Ok(YearResolution::Found { year, path })
        }
        None => {
            warn!("No start time marker in control file {}", path.display());
            Ok(YearResolution::MarkerMissing { path })
        }
    }
}

/// Read the start year from a CSV control file.
///
/// The year is the third field of the row after the `TMSTRT` row.
pub fn parse_year_csv(path: impl AsRef<Path>) -> Result<Option<i32>, W2Error> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| control_error(path, e.to_string()))?;

    let mut records = reader.records();
    while let Some(record) = records.next() {
        let record = record.map_err(|e| control_error(path, e.to_string()))?;
        let is_marker = record
            .get(0)
            .is_some_and(|f| f.trim().eq_ignore_ascii_case(CSV_MARKER));
        if !is_marker {
            continue;
        }

        let next = records
            .next()
            .ok_or_else(|| control_error(path, format!("no row after {CSV_MARKER}")))?
            .map_err(|e| control_error(path, e.to_string()))?;
        let field = next
            .get(2)
            .ok_or_else(|| control_error(path, format!("row after {CSV_MARKER} has no year field")))?;

        return parse_year(path, field).map(Some);
    }

    Ok(None)
}

/// Read the start year from a fixed-width control file
pub fn parse_year_npt(path: impl AsRef<Path>) -> Result<Option<i32>, W2Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| W2Error::io(path, e))?;
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let marker = line.trim().to_ascii_uppercase();
        if !NPT_MARKERS.iter().any(|m| marker.starts_with(m)) {
            continue;
        }

        let data_line = lines
            .next()
            .ok_or_else(|| control_error(path, format!("no line after {}", line.trim())))?;
        let year_str: String = data_line.chars().skip(YEAR_OFFSET).collect();
        return parse_year(path, &year_str).map(Some);
    }

    Ok(None)
}

fn parse_year(path: &Path, text: &str) -> Result<i32, W2Error> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| control_error(path, format!("invalid start year {:?}", text.trim())))
}

fn control_error(path: &Path, msg: String) -> W2Error {
    W2Error::ControlFile {
        path: path.to_path_buf(),
        msg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order() {
        let candidates = control_file_candidates("/model/out");
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/model/out/w2_con.csv"),
                PathBuf::from("/model/out/../w2_con.csv"),
                PathBuf::from("/model/out/w2_con.npt"),
                PathBuf::from("/model/out/../w2_con.npt"),
            ]
        );
    }

    #[test]
    fn test_year_or_default() {
        assert_eq!(YearResolution::NoControlFile.year_or(2023), 2023);
        let found = YearResolution::Found {
            year: 2006,
            path: PathBuf::from("w2_con.csv"),
        };
        assert_eq!(found.year_or(2023), 2006);
    }
}
