//! rsync's variable-length signed index codec.
//!
//! Generator requests are keyed by a file-list index that is almost always
//! close to the previously sent one, so the wire format favours a 1-byte
//! delta and only spends more bytes when the index jumps. [`IndexReader`]
//! and [`IndexWriter`] are exact inverses of each other and both carry the
//! `previous` index as explicit state rather than relying on any shared
//! session object.

use thiserror::Error;

/// Sentinel value meaning "end of generator list". Encoded on the wire as a
/// single `0` byte; it is the only index value that may be negative.
pub const NDX_DONE: i32 = -1;

const SHORT_FORM_MARKER: u8 = 0xFF;
const LONG_FORM_MARKER: u8 = 0xFE;
const MAX_DELTA: u8 = 0xFD;

/// An index decoded to a negative value other than [`NDX_DONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index decoded to invalid negative value {0}")]
pub struct IndexProtocolError(pub i32);

/// Outcome of attempting to decode one index from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProgress {
    /// A full index was decoded; `consumed` bytes should be dropped.
    Complete { index: i32, consumed: usize },
    /// Not enough bytes have arrived yet.
    Incomplete,
}

/// Decodes rsync's variable-length index encoding.
///
/// Tracks the previously emitted index so single-byte delta forms can be
/// expanded. Restartable: call again with a longer buffer after
/// [`IndexProgress::Incomplete`] and the decision will be identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexReader {
    previous: i32,
}

impl IndexReader {
    /// Creates a reader with no prior index (as at the start of a session).
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: 0 }
    }

    /// Attempts to decode one index from the front of `buf`.
    pub fn read(&mut self, buf: &[u8]) -> Result<IndexProgress, IndexProtocolError> {
        let Some(&first) = buf.first() else {
            return Ok(IndexProgress::Incomplete);
        };

        if first == 0 {
            return Ok(IndexProgress::Complete {
                index: NDX_DONE,
                consumed: 1,
            });
        }

        if first == SHORT_FORM_MARKER {
            let Some(bytes) = buf.get(1..3) else {
                return Ok(IndexProgress::Incomplete);
            };
            let value = u16::from_le_bytes([bytes[0], bytes[1]]);
            let index = i32::from(value);
            self.previous = index;
            return Ok(IndexProgress::Complete { index, consumed: 3 });
        }

        if first == LONG_FORM_MARKER {
            let Some(bytes) = buf.get(1..5) else {
                return Ok(IndexProgress::Incomplete);
            };
            let word: [u8; 4] = bytes.try_into().expect("slice of length 4");
            let index = i32::from_le_bytes(word);
            if index < 0 {
                return Err(IndexProtocolError(index));
            }
            self.previous = index;
            return Ok(IndexProgress::Complete { index, consumed: 5 });
        }

        // `first` is a positive delta in 1..=MAX_DELTA applied to `previous`.
        let index = self.previous + i32::from(first);
        self.previous = index;
        Ok(IndexProgress::Complete { index, consumed: 1 })
    }
}

/// Encodes indices using the most compact of the three wire forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexWriter {
    previous: i32,
}

impl IndexWriter {
    /// Creates a writer with no prior index.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: 0 }
    }

    /// Encodes `index` (or [`NDX_DONE`]) into its wire representation.
    pub fn write(&mut self, index: i32) -> Vec<u8> {
        if index == NDX_DONE {
            return vec![0];
        }

        let delta = i64::from(index) - i64::from(self.previous);
        if (1..=i64::from(MAX_DELTA)).contains(&delta) {
            self.previous = index;
            return vec![delta as u8];
        }

        if (0..=i64::from(u16::MAX)).contains(&index.into()) {
            self.previous = index;
            let mut out = Vec::with_capacity(3);
            out.push(SHORT_FORM_MARKER);
            out.extend_from_slice(&(index as u16).to_le_bytes());
            return out;
        }

        self.previous = index;
        let mut out = Vec::with_capacity(5);
        out.push(LONG_FORM_MARKER);
        out.extend_from_slice(&index.to_le_bytes());
        out
    }
}
