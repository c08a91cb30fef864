//! Gzip transcoding for compressed uploads.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::error::StorageError;

/// Content encoding recorded for gzip uploads.
pub(crate) const GZIP_ENCODING: &str = "gzip";

/// Compress `data` with gzip.
pub(crate) fn gzip(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data).map_err(StorageError::Compression)?;
    encoder.finish().map_err(StorageError::Compression)
}

/// Decompress gzip `data`.
pub(crate) fn gunzip(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(StorageError::Compression)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_output_has_magic_header() {
        let compressed = gzip(b"hello hello hello").expect("compress");
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip(&compressed).expect("decompress"), b"hello hello hello");
    }

    #[test]
    fn test_gunzip_rejects_plain_bytes() {
        let err = gunzip(b"not gzip").unwrap_err();
        assert!(matches!(err, StorageError::Compression(_)));
    }
}
