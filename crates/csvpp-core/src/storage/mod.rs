//! Reading the spreadsheet section and writing compiled output.

pub mod csv;

pub use csv::{backup_path, parse_csv_line, render_csv, split_csv_records, write_csv, write_csv_file};
