//! Pluggable accumulation for the bytes that follow a generator index.
//!
//! The concrete byte layout downstream of a `GeneratorMessage` — file-list
//! entries, block signatures, delta instructions — belongs to a companion
//! wire format this crate does not implement.
//! [`SessionCodec`](crate::codec::SessionCodec) still has to know *when* a
//! generator message's payload is complete, so it asks a caller-supplied
//! [`GeneratorPayloadFramer`] rather than hard-coding a format.

/// Outcome of offering more bytes to a [`GeneratorPayloadFramer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerProgress {
    /// More bytes were consumed but the message is not yet complete.
    Consumed(usize),
    /// The message is complete after consuming this many bytes.
    Complete(usize),
}

/// Decides when a `GeneratorMessage` payload is fully accumulated.
pub trait GeneratorPayloadFramer: Send {
    /// Offers currently buffered bytes (already including everything seen
    /// in prior calls for this message) to the framer.
    fn accumulate(&mut self, buf: &[u8]) -> FramerProgress;

    /// Resets any internal state so the framer can be reused for the next
    /// generator message.
    fn reset(&mut self);
}

/// A 4-byte little-endian length prefix followed by that many payload
/// bytes. Usable standalone for simple deployments, or as a template for a
/// real flist/delta framer plugged in by the session handler.
#[derive(Debug, Default)]
pub struct LengthPrefixedFramer;

impl GeneratorPayloadFramer for LengthPrefixedFramer {
    fn accumulate(&mut self, buf: &[u8]) -> FramerProgress {
        let Some(len_bytes) = buf.get(..4) else {
            return FramerProgress::Consumed(0);
        };
        let len = u32::from_le_bytes(len_bytes.try_into().expect("checked above")) as usize;
        if buf.len() >= 4 + len {
            FramerProgress::Complete(4 + len)
        } else {
            FramerProgress::Consumed(0)
        }
    }

    fn reset(&mut self) {}
}
