//! Tag/length demultiplexing for the inbound byte stream.
//!
//! Once the argument list completes, rsync wraps every inbound byte in a
//! 4-byte little-endian header (`(tag + 7) << 24 | length`) so several
//! logical channels — data, informational messages, transfer errors — can
//! share one socket. [`MultiplexDecoder`] unwraps that framing: `MSG_DATA`
//! payloads are forwarded to [`MultiplexDecoder::take_data`] for the
//! higher-level decoder to keep parsing, while every other tag is turned
//! into a [`LogEvent`] for the caller to log and discard.

use std::collections::VecDeque;

use thiserror::Error;

use crate::framing::read_le_u32;

/// The tag carried by a multiplexed frame's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplexTag {
    /// Payload bytes that continue the underlying protocol stream.
    Data,
    /// A transfer error, reported to the user but not fatal to the session.
    ErrorXfer,
    /// An informational message.
    Info,
    /// A fatal error message.
    Error,
    /// Any other tag value; passed through as a log event without
    /// interpretation.
    Other(u8),
}

impl MultiplexTag {
    const fn from_offset(offset: u8) -> Self {
        match offset {
            0 => Self::Data,
            1 => Self::ErrorXfer,
            2 => Self::Info,
            3 => Self::Error,
            other => Self::Other(other),
        }
    }
}

/// A non-data frame surfaced for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// The tag the peer sent.
    pub tag: MultiplexTag,
    /// The frame's payload, interpreted as UTF-8 lossily for display.
    pub text: String,
}

/// Header parse or payload-size failure while demultiplexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MultiplexError {
    /// The tag offset (top byte minus 7) underflowed; rsync never sends a
    /// raw top byte below 7.
    #[error("multiplex header tag offset underflowed (top byte {0:#04x})")]
    InvalidTagOffset(u8),
}

const TAG_OFFSET_BASE: u8 = 7;

/// Demultiplexes inbound multiplexed frames, buffering bytes across calls.
#[derive(Debug, Default)]
pub struct MultiplexDecoder {
    raw: VecDeque<u8>,
    data: VecDeque<u8>,
    log_events: Vec<LogEvent>,
}

impl MultiplexDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly received bytes to the decoder's internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.raw.extend(bytes);
    }

    /// Processes as many complete frames as are currently buffered.
    ///
    /// `MSG_DATA` payloads accumulate in [`Self::take_data`]; every other
    /// tag becomes a [`LogEvent`] retrievable via [`Self::take_log_events`].
    /// Yields (returns `Ok(())` without consuming anything further) once
    /// fewer than 4 header bytes or an incomplete payload remain.
    pub fn step(&mut self) -> Result<(), MultiplexError> {
        loop {
            if self.raw.len() < 4 {
                return Ok(());
            }

            let header_bytes: Vec<u8> = self.raw.iter().take(4).copied().collect();
            let (header, _) = read_le_u32(&header_bytes).expect("checked length above");
            let top_byte = (header >> 24) as u8;
            let length = (header & 0x00FF_FFFF) as usize;

            let Some(offset) = top_byte.checked_sub(TAG_OFFSET_BASE) else {
                return Err(MultiplexError::InvalidTagOffset(top_byte));
            };

            if self.raw.len() < 4 + length {
                return Ok(());
            }

            self.raw.drain(..4);
            let payload: Vec<u8> = self.raw.drain(..length).collect();
            let tag = MultiplexTag::from_offset(offset);

            if tag == MultiplexTag::Data {
                self.data.extend(payload);
            } else {
                self.log_events.push(LogEvent {
                    tag,
                    text: String::from_utf8_lossy(&payload).into_owned(),
                });
            }
        }
    }

    /// Returns a mutable view of the demultiplexed `MSG_DATA` bytes so the
    /// higher-level decoder can parse and drain from it directly.
    pub fn data_mut(&mut self) -> &mut VecDeque<u8> {
        &mut self.data
    }

    /// Drains and returns every log event produced since the last call.
    pub fn take_log_events(&mut self) -> Vec<LogEvent> {
        std::mem::take(&mut self.log_events)
    }
}

/// Encodes a multiplex frame header for outbound use.
#[must_use]
pub fn encode_header(tag_offset: u8, length: u32) -> [u8; 4] {
    let top = u32::from(TAG_OFFSET_BASE + tag_offset);
    (top << 24 | (length & 0x00FF_FFFF)).to_le_bytes()
}
