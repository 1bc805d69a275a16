use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum W2Error {
    #[error("Error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid format in {path}: {msg}")]
    Format { path: PathBuf, msg: String },

    #[error("Unsupported file type: {0}. Only *.csv, *.npt, *.opt, *.xlsx, *.xls, and *.db files are supported")]
    UnsupportedFileType(PathBuf),

    #[error("Error reading {path}: {msg}")]
    Unreadable { path: PathBuf, msg: String },

    #[error("Invalid day of year at line {line}: {value:?}")]
    InvalidDayOfYear { line: usize, value: String },

    #[error("Control file {path}: {msg}")]
    ControlFile { path: PathBuf, msg: String },

    #[error("Excel error in {path}: {msg}")]
    Excel { path: PathBuf, msg: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Table has {dates} dates but {rows} rows of values")]
    RowCountMismatch { dates: usize, rows: usize },

    #[error("Table has {expected} columns but row {row} has {found} values")]
    ColumnMismatch {
        expected: usize,
        found: usize,
        row: usize,
    },
}

impl W2Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        W2Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Path of the file the failure relates to, when there is one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            W2Error::Io { path, .. }
            | W2Error::Format { path, .. }
            | W2Error::Unreadable { path, .. }
            | W2Error::ControlFile { path, .. }
            | W2Error::Excel { path, .. } => Some(path),
            W2Error::UnsupportedFileType(path) => Some(path),
            _ => None,
        }
    }
}
