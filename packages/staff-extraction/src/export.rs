//! CSV export of extracted records.
//!
//! Output is `name,role,email` with RFC 4180 quoting. Absent fields are
//! written as empty strings.

use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::types::record::StaffRecord;

/// Directory used when the caller does not pick one.
pub const DEFAULT_OUTPUT_DIR: &str = "results";

/// File name prefix used when the caller does not pick one.
pub const DEFAULT_PREFIX: &str = "staff";

const HEADER: [&str; 3] = ["name", "role", "email"];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[&str]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

/// Write records as CSV (header first) to any writer.
pub fn write_csv<W: Write>(mut w: W, records: &[StaffRecord]) -> io::Result<()> {
    write_row(&mut w, &HEADER)?;
    for record in records {
        write_row(
            &mut w,
            &[
                record.name.as_str(),
                record.role.as_deref().unwrap_or_default(),
                record.email.as_deref().unwrap_or_default(),
            ],
        )?;
    }
    w.flush()
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.csv`, local time.
pub fn timestamped_file_name(prefix: &str) -> String {
    format!("{}_{}.csv", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write records to a new timestamped CSV in `dir`, creating it if needed.
///
/// Returns the absolute path of the written file.
pub fn export_csv(records: &[StaffRecord], dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(timestamped_file_name(prefix));
    let file = File::create(&path)?;
    write_csv(BufWriter::new(file), records)?;

    let path = path.canonicalize()?;
    info!(path = %path.display(), records = records.len(), "Exported CSV");
    Ok(path)
}
