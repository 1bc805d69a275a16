#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Path of a file under sample-data-files/
pub fn sample(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("sample-data-files")
        .join(name)
}

/// Write `content` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Fixed-width line: every field right-aligned in 8 characters
pub fn fixed_width_line(fields: &[&str]) -> String {
    let mut line: String = fields.iter().map(|f| format!("{f:>8}")).collect();
    line.push('\n');
    line
}

pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
