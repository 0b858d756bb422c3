//! Binary solution files.
//!
//! Layout, little-endian:
//!
//! ```text
//! u32 imax
//! u32 jmax
//! for j in 0..jmax, for i in 0..imax:
//!     f32 x_i, f32 y_j, f32 u[j,i]
//! ```
//!
//! The record loop runs with `i` innermost, so the field is stored as
//! `u[j,i]` and reads back into arrays of shape `(jmax, imax)`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

use crate::grid::{FieldError, Grid, ScalarField};

const HEADER_BYTES: usize = 8;
const RECORD_BYTES: usize = 3 * std::mem::size_of::<f32>();

#[derive(Debug, Error)]
pub enum DataFileError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is too short to hold a header ({len} bytes)")]
    MissingHeader { path: PathBuf, len: usize },

    #[error("'{path}' declares an empty grid ({imax} x {jmax})")]
    EmptyGrid { path: PathBuf, imax: u32, jmax: u32 },

    #[error(
        "'{path}' declares {imax} x {jmax} points ({expected} payload bytes) but holds {found}"
    )]
    ShapeMismatch {
        path: PathBuf,
        imax: u32,
        jmax: u32,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Field(#[from] FieldError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DataFileError + '_ {
    move |source| DataFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_f32(bytes: &[u8]) -> f64 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
}

/// Read a solution file into `x[j,i]`, `y[j,i]` and `u[j,i]`.
///
/// The payload must hold exactly `imax * jmax` records; a truncated file or
/// trailing bytes are rejected rather than reshaped.
pub fn read_data_binary(path: impl AsRef<Path>) -> Result<ScalarField, DataFileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(io_error(path))?;

    if bytes.len() < HEADER_BYTES {
        return Err(DataFileError::MissingHeader {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    let imax = read_u32(&bytes[0..4]);
    let jmax = read_u32(&bytes[4..8]);
    if imax == 0 || jmax == 0 {
        return Err(DataFileError::EmptyGrid {
            path: path.to_path_buf(),
            imax,
            jmax,
        });
    }

    let payload = &bytes[HEADER_BYTES..];
    let expected = (imax as usize)
        .checked_mul(jmax as usize)
        .and_then(|n| n.checked_mul(RECORD_BYTES));
    if expected != Some(payload.len()) {
        return Err(DataFileError::ShapeMismatch {
            path: path.to_path_buf(),
            imax,
            jmax,
            expected: expected.unwrap_or(usize::MAX),
            found: payload.len(),
        });
    }

    let shape = (jmax as usize, imax as usize);
    let mut x = Array2::<f64>::zeros(shape);
    let mut y = Array2::<f64>::zeros(shape);
    let mut u = Array2::<f64>::zeros(shape);

    // records arrive in row-major order, matching the iteration order of the arrays
    for (((record, xv), yv), uv) in payload
        .chunks_exact(RECORD_BYTES)
        .zip(x.iter_mut())
        .zip(y.iter_mut())
        .zip(u.iter_mut())
    {
        *xv = read_f32(&record[0..4]);
        *yv = read_f32(&record[4..8]);
        *uv = read_f32(&record[8..12]);
    }

    debug!(path = %path.display(), imax, jmax, "read solution file");
    Ok(ScalarField::new(x, y, u)?)
}

/// Write `u[j,i]` on `grid` in the layout read by [`read_data_binary`].
///
/// Values are narrowed to `f32`. Missing parent directories are created.
pub fn write_data_binary(
    path: impl AsRef<Path>,
    grid: &Grid,
    u: &Array2<f64>,
) -> Result<(), DataFileError> {
    let path = path.as_ref();
    if u.dim() != grid.shape() {
        return Err(FieldError::ShapeMismatch {
            name: "u",
            expected: grid.shape(),
            found: u.dim(),
        }
        .into());
    }
    if grid.is_empty() {
        return Err(FieldError::Empty.into());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(path))?;
    }
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);

    let mut write = |bytes: &[u8]| writer.write_all(bytes).map_err(io_error(path));
    write(&(grid.imax() as u32).to_le_bytes())?;
    write(&(grid.jmax() as u32).to_le_bytes())?;
    for ((j, i), &value) in u.indexed_iter() {
        write(&(grid.x[i] as f32).to_le_bytes())?;
        write(&(grid.y[j] as f32).to_le_bytes())?;
        write(&(value as f32).to_le_bytes())?;
    }
    writer.flush().map_err(io_error(path))?;

    debug!(
        path = %path.display(),
        imax = grid.imax(),
        jmax = grid.jmax(),
        "wrote solution file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header(imax: u32, jmax: u32) -> Vec<u8> {
        let mut bytes = imax.to_le_bytes().to_vec();
        bytes.extend_from_slice(&jmax.to_le_bytes());
        bytes
    }

    #[test]
    fn test_round_trip_keeps_axis_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin").join("data.bin");

        // non-square so a transposed read would change the shape
        let grid = Grid::linspace(5, 3, [0.0, 1.0], [0.0, 2.0]);
        let u = grid.sample(|x, y| 10.0 * y + x);
        write_data_binary(&path, &grid, &u).unwrap();

        let len = fs::metadata(&path).unwrap().len() as usize;
        assert_eq!(len, HEADER_BYTES + 15 * RECORD_BYTES);

        let field = read_data_binary(&path).unwrap();
        assert_eq!(field.dim(), (3, 5));
        assert_eq!(field.u[[2, 4]], 21.0);
        assert_eq!(field.x[[2, 4]], 1.0);
        assert_eq!(field.y[[2, 4]], 2.0);
        assert_eq!(field.u[[1, 2]], (10.0_f32 + 0.5_f32) as f64);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_data_binary(dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, DataFileError::Io { .. }));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        let mut bytes = header(2, 2);
        bytes.extend(std::iter::repeat(0u8).take(3 * RECORD_BYTES));
        fs::write(&path, bytes).unwrap();

        let err = read_data_binary(&path).unwrap_err();
        assert!(matches!(
            err,
            DataFileError::ShapeMismatch {
                expected: 48,
                found: 36,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_declared_shape_not_reshaped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrong.bin");
        let grid = Grid::linspace(4, 3, [0.0, 1.0], [0.0, 1.0]);
        write_data_binary(&path, &grid, &grid.sample(|x, _| x)).unwrap();

        // 12 records, but claim 5 x 3
        let mut bytes = fs::read(&path).unwrap();
        bytes[0..4].copy_from_slice(&5u32.to_le_bytes());
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            read_data_binary(&path),
            Err(DataFileError::ShapeMismatch { imax: 5, jmax: 3, .. })
        ));
    }

    #[test]
    fn test_short_header_and_empty_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.bin");
        fs::write(&path, [1u8, 0, 0]).unwrap();
        assert!(matches!(
            read_data_binary(&path),
            Err(DataFileError::MissingHeader { len: 3, .. })
        ));

        fs::write(&path, header(0, 4)).unwrap();
        assert!(matches!(
            read_data_binary(&path),
            Err(DataFileError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn test_writer_rejects_shape_mismatch() {
        let dir = tempdir().unwrap();
        let grid = Grid::linspace(4, 3, [0.0, 1.0], [0.0, 1.0]);
        let u = Array2::zeros((4, 3));
        let err = write_data_binary(dir.path().join("x.bin"), &grid, &u).unwrap_err();
        assert!(matches!(err, DataFileError::Field(FieldError::ShapeMismatch { .. })));
    }
}
