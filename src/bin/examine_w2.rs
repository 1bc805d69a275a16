use std::env;
use std::fs;
use std::path::Path;

use w2_timeseries::control::{find_control_file, resolve_start_year};
use w2_timeseries::format::{header_row_index, sniff, split_fixed_width_line, FileType, FIELD_WIDTH};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 {
        &args[1]
    } else {
        "sample-data-files/2006_DeerCrk_Cin.npt"
    };
    let path = Path::new(file_path);

    println!("Examining W2 file: {file_path}");
    println!("{}", "=".repeat(100));

    let file_type = FileType::from_path(path);
    println!("File type (by extension): {file_type}");
    if !file_type.is_text() {
        let (file_type, _) = sniff(path)?;
        println!("Not a text time series ({file_type}), nothing more to show");
        return Ok(());
    }

    let header_row = header_row_index(path);
    println!("Header row: {} (line {})", header_row, header_row + 1);

    let (_, columns) = sniff(path)?;
    println!("\nData columns ({}):", columns.len());
    for (i, name) in columns.iter().enumerate() {
        println!("  {:3}: {name}", i + 1);
    }

    let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
    match find_control_file(dir) {
        Some(control) => println!("\nControl file: {}", control.display()),
        None => println!("\nControl file: none found"),
    }
    println!("Start year: {:?}", resolve_start_year(dir)?.year());

    // Show the raw layout of the first lines
    let content = fs::read_to_string(path)?;
    println!("\n{}", "=".repeat(100));
    println!("First 10 lines (fixed-width fields in brackets):");
    println!("{}", "=".repeat(100));
    for (i, line) in content.lines().take(10).enumerate() {
        if line.contains(',') {
            println!("Line {:3}: {line}", i + 1);
        } else {
            let fields = split_fixed_width_line(line, FIELD_WIDTH);
            print!("Line {:3}: ", i + 1);
            for field in fields {
                print!("[{field}]");
            }
            println!();
        }
    }

    Ok(())
}
