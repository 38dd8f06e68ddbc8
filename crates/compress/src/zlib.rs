//! Sync-flushed raw deflate, trimmed to exactly what snapshot building needs.
//!
//! Upstream rsync compresses each transmitted block independently with
//! `deflateInit2(level, Z_DEFLATED, -15, 8, Z_DEFAULT_STRATEGY)` and flushes
//! with `Z_SYNC_FLUSH` after every block, then drops the resulting 4-byte
//! sync marker before putting the bytes on the wire (the receiver
//! re-appends it before inflating). `-15` window bits is exactly what
//! [`flate2`]'s raw (non-zlib, non-gzip) encoder already produces; memLevel
//! and strategy are not exposed by flate2's portable `Compress` API, so this
//! module relies on its defaults, which match zlib's own defaults.

use std::fmt;
use std::io;
use std::num::NonZeroU8;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use thiserror::Error;

const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Compression levels recognised by [`compress_sync_flushed`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionLevel {
    /// No compression (level 0).
    None,
    /// Favour speed over compression ratio.
    Fast,
    /// zlib's default balance between speed and ratio (level 6).
    Default,
    /// Favour the best possible compression ratio.
    Best,
    /// An explicit zlib level in the range `1..=9`.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Creates a [`CompressionLevel`] from an explicit numeric level.
    ///
    /// # Errors
    ///
    /// Returns [`CompressionLevelError`] when `level` is outside `0..=9`.
    pub fn from_numeric(level: u32) -> Result<Self, CompressionLevelError> {
        if level > 9 {
            return Err(CompressionLevelError { level });
        }
        if level == 0 {
            return Ok(Self::None);
        }
        let as_u8 = u8::try_from(level).map_err(|_| CompressionLevelError { level })?;
        let precise = NonZeroU8::new(as_u8).ok_or(CompressionLevelError { level })?;
        Ok(Self::Precise(precise))
    }
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::None => Compression::none(),
            CompressionLevel::Fast => Compression::fast(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
            CompressionLevel::Precise(value) => Compression::new(u32::from(value.get())),
        }
    }
}

/// A requested compression level fell outside zlib's supported range.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("compression level {level} is outside the supported range 0-9")]
pub struct CompressionLevelError {
    level: u32,
}

impl CompressionLevelError {
    /// Returns the invalid level that triggered the error.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Fast => write!(f, "fast"),
            Self::Default => write!(f, "default"),
            Self::Best => write!(f, "best"),
            Self::Precise(level) => write!(f, "precise({level})"),
        }
    }
}

/// Compresses `input` as one raw-deflate block, `Z_SYNC_FLUSH`-ed and with
/// the resulting sync marker stripped.
///
/// Returns an empty compressed block only if `input` is empty; otherwise
/// the result always carries at least the deflate block header.
pub fn compress_sync_flushed(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut compressor = Compress::new(level.into(), false);
    let mut out = Vec::with_capacity(input.len() + 16);

    loop {
        let consumed_before = compressor.total_in();
        let status = compressor
            .compress_vec(
                &input[consumed_before as usize..],
                &mut out,
                FlushCompress::Sync,
            )
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

        let fully_consumed = compressor.total_in() as usize >= input.len();
        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError if fully_consumed => break,
            _ => {
                let grow = out.capacity().max(256);
                out.reserve(grow);
            }
        }
    }

    if out.ends_with(&SYNC_MARKER) {
        out.truncate(out.len() - SYNC_MARKER.len());
    }
    Ok(out)
}

/// Inverts [`compress_sync_flushed`] by re-appending the sync marker and
/// inflating the result.
pub fn decompress_sync_flushed(block: &[u8]) -> io::Result<Vec<u8>> {
    let mut framed = Vec::with_capacity(block.len() + SYNC_MARKER.len());
    framed.extend_from_slice(block);
    framed.extend_from_slice(&SYNC_MARKER);

    let mut decompressor = Decompress::new(false);
    let mut out = Vec::with_capacity(block.len() * 3 + 32);
    loop {
        let consumed_before = decompressor.total_in();
        let status = decompressor
            .decompress_vec(&framed[consumed_before as usize..], &mut out, FlushDecompress::Sync)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

        match status {
            Status::StreamEnd => break,
            Status::Ok if decompressor.total_in() as usize >= framed.len() => break,
            Status::Ok => {
                let grow = out.capacity().max(256);
                out.reserve(grow);
            }
            Status::BufError => {
                let grow = out.capacity().max(256);
                out.reserve(grow);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_short_payload() {
        let block = compress_sync_flushed(b"hello rsync", CompressionLevel::Default).unwrap();
        assert_eq!(decompress_sync_flushed(&block).unwrap(), b"hello rsync");
    }

    #[test]
    fn round_trips_empty_payload() {
        let block = compress_sync_flushed(b"", CompressionLevel::Default).unwrap();
        assert_eq!(decompress_sync_flushed(&block).unwrap(), b"");
    }

    #[test]
    fn round_trips_repetitive_content_at_every_level() {
        let payload = vec![0u8; 1024];
        for level in 1..=9 {
            let level = CompressionLevel::from_numeric(level).unwrap();
            let block = compress_sync_flushed(&payload, level).unwrap();
            assert_eq!(decompress_sync_flushed(&block).unwrap(), payload);
        }
    }

    #[test]
    fn block_has_no_trailing_sync_marker() {
        let block = compress_sync_flushed(b"payload without a trailer", CompressionLevel::Best).unwrap();
        assert!(!block.ends_with(&SYNC_MARKER));
    }

    #[test]
    fn rejects_level_above_nine() {
        let err = CompressionLevel::from_numeric(10).unwrap_err();
        assert_eq!(err.level, 10);
    }

    #[test]
    fn round_trips_incompressible_data() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i * 31 + 7) as u8).collect();
        let block = compress_sync_flushed(&payload, CompressionLevel::Fast).unwrap();
        assert_eq!(decompress_sync_flushed(&block).unwrap(), payload);
    }
}
