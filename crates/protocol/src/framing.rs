//! Delimited and fixed-width primitives shared by every decode stage.
//!
//! Every helper here is non-destructive: it inspects a borrowed buffer and
//! reports how many leading bytes it consumed, but never mutates or drains
//! the caller's buffer itself. Callers own the single point where consumed
//! bytes are actually dropped, which keeps partial reads restartable —
//! feeding the same tail again after more bytes arrive reproduces the same
//! decision.

use memchr::memchr;
use thiserror::Error;

/// Outcome of a non-destructive framing read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    /// A full token was found; `consumed` is the number of leading bytes
    /// (including any delimiter) the caller should drop from its buffer.
    Complete { value: T, consumed: usize },
    /// Not enough bytes have arrived yet. The buffer is untouched.
    Incomplete,
}

/// Error produced while scanning for a delimited token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delimited token exceeded its {cap}-byte size cap")]
pub struct FramingOverflow {
    /// The size cap that was exceeded.
    pub cap: usize,
}

/// Scans `buf` for `delim` within the first `size_cap` bytes.
///
/// Returns the prefix up to (but excluding) the delimiter, decoded as UTF-8,
/// along with the number of bytes consumed (prefix length plus the
/// delimiter). If `delim` has not appeared and fewer than `size_cap` bytes
/// are buffered, reports [`Progress::Incomplete`] so the caller can wait for
/// more data. If `size_cap` bytes have arrived with no delimiter in sight,
/// fails with [`FramingOverflow`].
pub fn delineated(
    buf: &[u8],
    size_cap: usize,
    delim: u8,
) -> Result<Progress<String>, FramingOverflow> {
    let scan_window = &buf[..buf.len().min(size_cap)];
    match memchr(delim, scan_window) {
        Some(pos) if pos < size_cap => {
            let text = String::from_utf8_lossy(&buf[..pos]).into_owned();
            Ok(Progress::Complete {
                value: text,
                consumed: pos + 1,
            })
        }
        _ if buf.len() < size_cap => Ok(Progress::Incomplete),
        _ => Err(FramingOverflow { cap: size_cap }),
    }
}

/// Reads a 4-byte little-endian `u32` from the front of `buf`.
///
/// Returns `None` when fewer than 4 bytes are available; the rsync wire
/// format is little-endian throughout even though most networking stacks
/// default to big-endian, so every multi-byte read goes through this helper
/// rather than `from_ne_bytes`.
pub fn read_le_u32(buf: &[u8]) -> Option<(u32, usize)> {
    let word: [u8; 4] = buf.get(..4)?.try_into().ok()?;
    Some((u32::from_le_bytes(word), 4))
}

/// Writes `value` as 4 little-endian bytes.
pub fn write_le_u32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delineated_finds_token_within_cap() {
        let buf = b"hello\nworld";
        let result = delineated(buf, 16, b'\n').unwrap();
        assert_eq!(
            result,
            Progress::Complete {
                value: "hello".to_string(),
                consumed: 6,
            }
        );
    }

    #[test]
    fn delineated_reports_incomplete_below_cap() {
        let buf = b"partial";
        assert_eq!(delineated(buf, 16, b'\n').unwrap(), Progress::Incomplete);
    }

    #[test]
    fn delineated_overflows_at_exact_cap_with_no_delimiter() {
        let buf = vec![b'x'; 16];
        let err = delineated(&buf, 16, b'\n').unwrap_err();
        assert_eq!(err.cap, 16);
    }

    #[test]
    fn delineated_accepts_delimiter_at_the_cap_boundary() {
        // 16 bytes total including the delimiter itself must be accepted.
        let mut buf = vec![b'x'; 15];
        buf.push(b'\n');
        let result = delineated(&buf, 16, b'\n').unwrap();
        assert_eq!(
            result,
            Progress::Complete {
                value: "x".repeat(15),
                consumed: 16,
            }
        );
    }

    #[test]
    fn delineated_rejects_delimiter_one_byte_past_the_cap() {
        let mut buf = vec![b'x'; 16];
        buf.push(b'\n');
        let err = delineated(&buf, 16, b'\n').unwrap_err();
        assert_eq!(err.cap, 16);
    }

    #[test]
    fn le_u32_round_trips() {
        let bytes = write_le_u32(0x0102_0304);
        assert_eq!(bytes, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_le_u32(&bytes), Some((0x0102_0304, 4)));
    }

    #[test]
    fn le_u32_needs_more_data() {
        assert_eq!(read_le_u32(&[1, 2, 3]), None);
    }
}
