//! IDX file reader
//!
//! The MNIST/Fashion-MNIST family ships as IDX files: a big-endian header
//! (magic word, then one u32 per dimension) followed by a u8 payload. Images
//! use magic `0x0000_0803` (three dimensions), labels `0x0000_0801` (one).

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use ndarray::{Array1, Array2};

use super::DataError;

/// Magic word for a 3-dimensional u8 tensor (images)
pub const IMAGES_MAGIC: u32 = 0x0000_0803;
/// Magic word for a 1-dimensional u8 tensor (labels)
pub const LABELS_MAGIC: u32 = 0x0000_0801;

fn open(path: &Path) -> Result<BufReader<File>, DataError> {
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    Ok(BufReader::new(File::open(path)?))
}

fn read_u32_be(reader: &mut impl Read) -> Result<u32, DataError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn check_magic(reader: &mut impl Read, path: &Path, expected: u32) -> Result<(), DataError> {
    let found = read_u32_be(reader)?;
    if found != expected {
        return Err(DataError::BadMagic {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Guard an untrusted header-declared payload size before allocating for it
fn check_payload_len(path: &Path, header_bytes: u64, wanted: usize) -> Result<(), DataError> {
    let available = fs::metadata(path)?.len().saturating_sub(header_bytes);
    if wanted as u64 > available {
        return Err(DataError::Malformed(path.to_path_buf()));
    }
    Ok(())
}

/// Read an IDX images file into a `(n, rows * cols)` matrix scaled to [0, 1]
pub fn read_images(path: &Path) -> Result<Array2<f32>, DataError> {
    let mut reader = open(path)?;
    check_magic(&mut reader, path, IMAGES_MAGIC)?;

    let n = read_u32_be(&mut reader)? as usize;
    let rows = read_u32_be(&mut reader)? as usize;
    let cols = read_u32_be(&mut reader)? as usize;
    let pixels = rows
        .checked_mul(cols)
        .ok_or_else(|| DataError::Malformed(path.to_path_buf()))?;
    let total = n
        .checked_mul(pixels)
        .ok_or_else(|| DataError::Malformed(path.to_path_buf()))?;
    // magic + 3 dimension words
    check_payload_len(path, 16, total)?;

    let mut payload = vec![0u8; total];
    reader.read_exact(&mut payload)?;

    let scaled: Vec<f32> = payload.into_iter().map(|p| f32::from(p) / 255.0).collect();
    Array2::from_shape_vec((n, pixels), scaled)
        .map_err(|_| DataError::Malformed(path.to_path_buf()))
}

/// Read an IDX labels file into a vector of class indices
pub fn read_labels(path: &Path) -> Result<Array1<usize>, DataError> {
    let mut reader = open(path)?;
    check_magic(&mut reader, path, LABELS_MAGIC)?;

    let n = read_u32_be(&mut reader)? as usize;
    // magic + 1 dimension word
    check_payload_len(path, 8, n)?;

    let mut payload = vec![0u8; n];
    reader.read_exact(&mut payload)?;

    Ok(Array1::from_iter(payload.into_iter().map(usize::from)))
}
