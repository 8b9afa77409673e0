//! Write-then-rename persistence.
//!
//! Every file is written to a temporary file in the target directory and
//! renamed over the target, so readers never observe a partial table and a
//! rerun replaces earlier output instead of appending to it.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::IoError;

fn write_error(path: &Path, source: std::io::Error) -> IoError {
    IoError::WriteFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Atomically replace `path` with whatever `fill` writes.
pub(crate) fn write_atomic<F>(path: &Path, fill: F) -> Result<(), IoError>
where
    F: FnOnce(&mut NamedTempFile) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_error(path, e))?;
    fill(&mut tmp).map_err(|e| write_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| write_error(path, e))?;
    tmp.persist(path).map_err(|e| write_error(path, e.error))?;
    Ok(())
}

/// Atomically replace `path` with a headerless CSV table produced by `fill`.
///
/// Header rows, where a schema has one, are written by `fill` itself.
pub(crate) fn write_csv_atomic<F>(path: &Path, fill: F) -> Result<(), IoError>
where
    F: FnOnce(&mut csv::Writer<&mut NamedTempFile>) -> csv::Result<()>,
{
    write_atomic(path, |tmp| {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp);
        fill(&mut wtr)?;
        wtr.flush()
    })
}

/// Atomically replace `path` with `contents`.
pub(crate) fn write_text_atomic(path: &Path, contents: &str) -> Result<(), IoError> {
    write_atomic(path, |tmp| tmp.write_all(contents.as_bytes()))
}
