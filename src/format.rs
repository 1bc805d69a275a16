/// CE-QUAL-W2 file type detection and header column extraction
///
/// W2 time series files come in two text layouts:
/// - Fixed width (`*.npt`, `*.opt`): every field is 8 characters wide
/// - CSV (`*.csv`): comma delimited, often with a trailing comma
///
/// Files whose name starts with `tsr` carry their column header on the first line.
/// Every other W2 file has two title/comment lines before the header.
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::W2Error;

/// Width of every field in a fixed-width W2 file
pub const FIELD_WIDTH: usize = 8;

/// Header row for time series output files (`tsr_*.csv`, `tsr_*.opt`)
pub const TSR_HEADER_ROW: usize = 0;

/// Header row for all other W2 inputs/outputs
pub const DEFAULT_HEADER_ROW: usize = 2;

const TSR_PREFIX: &str = "tsr";

/// Kind of file a time series was stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    FixedWidth,
    Csv,
    Excel,
    Sqlite,
    Unknown,
}

impl FileType {
    /// Guess the file type from the extension (case-insensitive)
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => FileType::Csv,
            Some("npt") | Some("opt") => FileType::FixedWidth,
            Some("xlsx") | Some("xls") => FileType::Excel,
            Some("db") => FileType::Sqlite,
            _ => FileType::Unknown,
        }
    }

    /// Text formats carry a day-of-year index and need a start year
    pub fn is_text(&self) -> bool {
        matches!(self, FileType::FixedWidth | FileType::Csv)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::FixedWidth => "fixed-width",
            FileType::Csv => "CSV",
            FileType::Excel => "Excel",
            FileType::Sqlite => "SQLite",
            FileType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Row index of the column header line, selected by file name
pub fn header_row_index(path: impl AsRef<Path>) -> usize {
    let is_tsr = path
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase().starts_with(TSR_PREFIX))
        .unwrap_or(false);

    if is_tsr {
        TSR_HEADER_ROW
    } else {
        DEFAULT_HEADER_ROW
    }
}

/// Split a line into consecutive chunks of `width` characters. The last chunk may be shorter.
pub fn split_fixed_width_line(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Data column names from the header row of a CSV file (day-of-year column excluded)
pub fn columns_from_csv(path: impl AsRef<Path>) -> Result<Vec<String>, W2Error> {
    let path = path.as_ref();
    let header = read_header_line(path)?;

    let header = header.trim().trim_end_matches(',').trim();
    let columns: Vec<String> = header
        .split(',')
        .skip(1)
        .map(|token| token.trim().to_string())
        .collect();

    debug!("Found {} CSV data columns in {}", columns.len(), path.display());
    Ok(columns)
}

/// Data column names from the header row of a fixed-width file (day-of-year column excluded)
pub fn columns_from_fixed_width(path: impl AsRef<Path>) -> Result<Vec<String>, W2Error> {
    let path = path.as_ref();
    let header = read_header_line(path)?;

    let mut columns: Vec<String> = split_fixed_width_line(&header, FIELD_WIDTH)
        .into_iter()
        .skip(1)
        .map(|field| field.trim().to_string())
        .collect();

    if columns.last().is_some_and(|c| c.is_empty()) {
        columns.pop();
    }

    debug!(
        "Found {} fixed-width data columns in {}",
        columns.len(),
        path.display()
    );
    Ok(columns)
}

/// Determine the file type and, for text formats, the data column names.
///
/// Excel and SQLite files return an empty column list; their loaders read the header
/// themselves. Unknown extensions are rejected before any parsing happens.
pub fn sniff(path: impl AsRef<Path>) -> Result<(FileType, Vec<String>), W2Error> {
    let path = path.as_ref();
    let mut file_type = FileType::from_path(path);

    if file_type == FileType::FixedWidth && first_data_line_has_comma(path)? {
        debug!("{} has comma-delimited data, treating as CSV", path.display());
        file_type = FileType::Csv;
    }

    let columns = match file_type {
        FileType::FixedWidth => columns_from_fixed_width(path)?,
        FileType::Csv => columns_from_csv(path)?,
        FileType::Excel | FileType::Sqlite => Vec::new(),
        FileType::Unknown => return Err(W2Error::UnsupportedFileType(path.to_path_buf())),
    };

    Ok((file_type, columns))
}

/// Legacy `*.npt`/`*.opt` files are sometimes comma delimited
fn first_data_line_has_comma(path: &Path) -> Result<bool, W2Error> {
    let content = fs::read_to_string(path).map_err(|e| W2Error::io(path, e))?;
    Ok(content
        .lines()
        .nth(header_row_index(path) + 1)
        .is_some_and(|line| line.contains(',')))
}

fn read_header_line(path: &Path) -> Result<String, W2Error> {
    let content = fs::read_to_string(path).map_err(|e| W2Error::io(path, e))?;
    let row = header_row_index(path);

    content
        .lines()
        .nth(row)
        .map(|line| line.trim_end_matches('\r').to_string())
        .ok_or_else(|| W2Error::Format {
            path: path.to_path_buf(),
            msg: format!("file is shorter than header row {}", row + 1),
        })
}
