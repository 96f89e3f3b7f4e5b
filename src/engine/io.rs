// src/engine/io.rs
//
// I/O operations: whole-file reads and the raw file passthrough.

use crate::engine::datum::Datum;
use crate::error::DatumError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::error;

type IoResult<T> = std::result::Result<T, DatumError>;

/// Read the whole file at `path`.
///
/// A missing file is reported as `FileNotFound`; any other OS error as
/// `FileReadFailed` carrying the original `io::Error`.
pub fn read_file(path: &Path) -> IoResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        let shown = path.to_string_lossy().into_owned();
        error!(target: "image_datum::io", path = %shown, error = %e, "could not open or find file");
        if e.kind() == ErrorKind::NotFound {
            DatumError::file_not_found(shown)
        } else {
            DatumError::file_read_failed(shown, e)
        }
    })
}

/// Wrap the file's bytes, unmodified, as an encoded Datum.
/// No pixel grid is ever built.
pub fn read_file_to_datum(path: &Path, label: i32) -> IoResult<Datum> {
    Ok(Datum::encoded(label, read_file(path)?))
}
