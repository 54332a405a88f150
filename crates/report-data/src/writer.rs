//! CSV output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use report_core::error::{ReportError, Result};
use report_core::models::Table;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `{dir}/{prefix}_cleaned_{timestamp}.csv`
pub fn cleaned_output_path(dir: &Path, prefix: &str, timestamp: &str) -> PathBuf {
    dir.join(format!("{prefix}_cleaned_{timestamp}.csv"))
}

/// Write `table` as UTF-8 CSV with a byte-order mark.
///
/// Data goes to a sibling `.tmp` file first and is renamed into place, so a
/// failed write never leaves a partial file at `path`.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");

    if let Err(e) = write_to(&tmp, table) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path).map_err(|source| ReportError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn write_to(path: &Path, table: &Table) -> Result<()> {
    let write_err = |source: std::io::Error| ReportError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut out = BufWriter::new(File::create(path).map_err(write_err)?);
    out.write_all(UTF8_BOM).map_err(write_err)?;

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }

    let mut out = writer
        .into_inner()
        .map_err(|e| ReportError::FileWrite {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
    out.flush().map_err(write_err)?;
    Ok(())
}
