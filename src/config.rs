use std::env;

/// Start year used by the command-line tools when no control file gives one
pub const DEFAULT_YEAR: i32 = 2023;

#[derive(Debug, Clone)]
pub struct Config {
    pub default_year: i32,
    /// Header lines to skip; unset means "derive from the file's header row"
    pub skiprows: Option<usize>,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            default_year: env::var("W2_DEFAULT_YEAR")
                .unwrap_or_else(|_| DEFAULT_YEAR.to_string())
                .parse()
                .unwrap_or(DEFAULT_YEAR),
            skiprows: env::var("W2_SKIPROWS").ok().and_then(|v| v.parse().ok()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_year: DEFAULT_YEAR,
            skiprows: None,
        }
    }
}
