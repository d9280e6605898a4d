//! CLI tool for bandgrid - builds a virtual grid from a control matrix and
//! outputs its JSON snapshot
//!
//! Usage:
//!   bandgrid_cli <matrix.json>                          # Output JSON to stdout
//!   bandgrid_cli <matrix.json> -o grid.json             # Output JSON to file
//!   bandgrid_cli <matrix.json> --options options.json   # Builder options
//!
//! Set `RUST_LOG=debug` to see the build passes.

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use bandgrid::{BuilderOptions, ControlMatrix, GridBuilder};

const USAGE: &str = "Usage: bandgrid_cli <matrix.json> [-o output.json] [--options options.json]";

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        fail(USAGE);
    }

    let input_path = &args[1];
    let mut output_path = None;
    let mut options_path = None;
    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match (flag.as_str(), rest.next()) {
            ("-o", Some(path)) => output_path = Some(path),
            ("--options", Some(path)) => options_path = Some(path),
            _ => fail(USAGE),
        }
    }

    // Read input file
    let json = fs::read_to_string(input_path)
        .unwrap_or_else(|e| fail(format!("Error reading {input_path}: {e}")));
    let matrix = ControlMatrix::from_json_str(&json)
        .unwrap_or_else(|e| fail(format!("Error parsing control matrix: {e}")));

    let options = match options_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("Error reading {path}: {e}")));
            BuilderOptions::from_json_str(&json)
                .unwrap_or_else(|e| fail(format!("Error parsing options: {e}")))
        }
        None => BuilderOptions::default(),
    };

    // Build
    let grid = GridBuilder::from_options(options)
        .build(&matrix)
        .unwrap_or_else(|e| fail(format!("Error building grid: {e}")));
    log::debug!("grid:\n{grid}");

    let json = grid
        .snapshot()
        .to_json()
        .unwrap_or_else(|e| fail(format!("Error serializing JSON: {e}")));

    // Output
    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                fail(format!("Error writing {path}: {e}"));
            }
            eprintln!("Written: {path}");
        }
        None => {
            io::stdout().write_all(json.as_bytes()).unwrap();
            println!();
        }
    }
}
