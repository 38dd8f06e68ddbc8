//! The session state machine: handshake → command → arguments → filters →
//! file transfer, with multiplexed inbound framing engaging partway through.
//!
//! [`SessionCodec::decode`] is a pure step: it appends newly arrived bytes
//! to internal buffers, makes as much progress as the buffered data allows,
//! and returns every [`WireMessage`] it was able to fully parse. Calling it
//! again with the next chunk of the same stream — however it was split —
//! produces the same sequence of messages (the chunking-independence
//! invariant exercised in `tests/chunking.rs`).

use crate::framing::{delineated, read_le_u32, Progress};
use crate::index::{IndexProgress, IndexReader, NDX_DONE};
use crate::message::WireMessage;
use crate::multiplex::{encode_header, LogEvent, MultiplexDecoder};
use crate::payload::{FramerProgress, GeneratorPayloadFramer, LengthPrefixedFramer};
use crate::CodecError;

const HANDSHAKE_CAP: usize = 16;
const COMMAND_CAP: usize = 40;
const ARGUMENT_TOKEN_CAP: usize = 128;
const MAX_ARGUMENTS: usize = 20;

const MSG_DATA_OFFSET: u8 = 0;
const MSG_ERROR_OFFSET: u8 = 3;

/// The session's position in the handshake → ... → file-transfer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the `@RSYNCD: M.m\n` line.
    Handshake,
    /// Waiting for the module/command line.
    Command,
    /// Collecting NUL-terminated argument tokens.
    Arguments,
    /// Collecting length-prefixed filter rules.
    FilterList,
    /// Driving the generator/sender index loop.
    SendFiles,
}

/// Duplex codec for one rsync daemon connection.
pub struct SessionCodec {
    state: SessionState,
    raw: Vec<u8>,
    mux: Option<MultiplexDecoder>,
    demuxed: Vec<u8>,
    multiplexing_out: bool,
    arguments: Vec<String>,
    filters: Vec<String>,
    index_reader: IndexReader,
    pending_generator: Option<i32>,
    payload_framer: Box<dyn GeneratorPayloadFramer>,
    log_events: Vec<LogEvent>,
    supported_major: std::ops::RangeInclusive<u32>,
}

impl SessionCodec {
    /// Creates a fresh session in [`SessionState::Handshake`], accumulating
    /// generator payloads with [`LengthPrefixedFramer`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_payload_framer(Box::new(LengthPrefixedFramer))
    }

    /// Creates a session using a caller-supplied generator payload framer,
    /// for deployments that plug in a real flist/delta codec.
    #[must_use]
    pub fn with_payload_framer(payload_framer: Box<dyn GeneratorPayloadFramer>) -> Self {
        Self {
            state: SessionState::Handshake,
            raw: Vec::new(),
            mux: None,
            demuxed: Vec::new(),
            multiplexing_out: false,
            arguments: Vec::new(),
            filters: Vec::new(),
            index_reader: IndexReader::new(),
            pending_generator: None,
            payload_framer,
            log_events: Vec::new(),
            supported_major: 27..=32,
        }
    }

    /// The session's current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether outbound writes are currently multiplex-framed.
    #[must_use]
    pub const fn is_multiplexing_out(&self) -> bool {
        self.multiplexing_out
    }

    /// Drains and returns log events produced by non-`MSG_DATA` multiplex
    /// frames (`MSG_INFO`, `MSG_ERROR`, `MSG_ERROR_XFER`, or unrecognised
    /// tags) since the last call.
    pub fn take_log_events(&mut self) -> Vec<LogEvent> {
        std::mem::take(&mut self.log_events)
    }

    /// Feeds newly received bytes into the session and returns every
    /// [`WireMessage`] that could be fully parsed from the buffered data.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Vec<WireMessage>, CodecError> {
        self.raw.extend_from_slice(bytes);
        let mut emitted = Vec::new();

        loop {
            if let Some(mux) = &mut self.mux {
                if !self.raw.is_empty() {
                    mux.feed(&self.raw);
                    self.raw.clear();
                }
                mux.step()?;
                self.log_events.extend(mux.take_log_events());
                self.demuxed.extend(mux.data_mut().drain(..));
            }

            let progress = match self.state {
                SessionState::Handshake => self.decode_handshake(),
                SessionState::Command => self.decode_command(),
                SessionState::Arguments => self.decode_arguments(),
                SessionState::FilterList => self.decode_filter_list(),
                SessionState::SendFiles => self.decode_send_files(),
            }?;

            match progress {
                Some(message) => emitted.push(message),
                None => break,
            }
        }

        Ok(emitted)
    }

    fn decode_handshake(&mut self) -> Result<Option<WireMessage>, CodecError> {
        match delineated(&self.raw, HANDSHAKE_CAP, b'\n') {
            Ok(Progress::Incomplete) => Ok(None),
            Ok(Progress::Complete { value, consumed }) => {
                self.raw.drain(..consumed);
                // Always advance, even on failure below: the socket will
                // be closed by the caller, and a stuck HANDSHAKE state
                // would misinterpret subsequent reads.
                self.state = SessionState::Command;
                let (major, minor) = parse_handshake_line(&value)?;
                if !self.supported_major.contains(&major) {
                    return Err(CodecError::IncompatibleVersion { major, minor });
                }
                Ok(Some(WireMessage::Handshake { major, minor }))
            }
            Err(_overflow) => {
                self.state = SessionState::Command;
                Err(CodecError::HandshakeOverflow)
            }
        }
    }

    fn decode_command(&mut self) -> Result<Option<WireMessage>, CodecError> {
        match delineated(&self.raw, COMMAND_CAP, b'\n')? {
            Progress::Incomplete => Ok(None),
            Progress::Complete { value, consumed } => {
                self.raw.drain(..consumed);
                self.state = SessionState::Arguments;
                self.multiplexing_out = true;
                Ok(Some(WireMessage::Command(value)))
            }
        }
    }

    fn decode_arguments(&mut self) -> Result<Option<WireMessage>, CodecError> {
        loop {
            match delineated(&self.raw, ARGUMENT_TOKEN_CAP, 0) {
                Ok(Progress::Incomplete) => return Ok(None),
                Ok(Progress::Complete { value, consumed }) => {
                    self.raw.drain(..consumed);
                    if value.is_empty() {
                        let args = std::mem::take(&mut self.arguments);
                        self.mux = Some(MultiplexDecoder::new());
                        self.state = SessionState::FilterList;
                        return Ok(Some(WireMessage::Arguments(args)));
                    }
                    self.arguments.push(value);
                    if self.arguments.len() > MAX_ARGUMENTS {
                        return Err(CodecError::ArgumentListTooLong { max: MAX_ARGUMENTS });
                    }
                }
                Err(overflow) => {
                    return Err(CodecError::ArgumentTokenOverflow { cap: overflow.cap });
                }
            }
        }
    }

    fn decode_filter_list(&mut self) -> Result<Option<WireMessage>, CodecError> {
        loop {
            let Some((len, _)) = read_le_u32(&self.demuxed) else {
                return Ok(None);
            };
            let len = len as usize;
            if self.demuxed.len() < 4 + len {
                // Rewind: the 4-byte length read is undone implicitly since
                // nothing has been drained from `self.demuxed` yet.
                return Ok(None);
            }
            self.demuxed.drain(..4);
            let payload: Vec<u8> = self.demuxed.drain(..len).collect();

            if len == 0 {
                let filters = std::mem::take(&mut self.filters);
                self.state = SessionState::SendFiles;
                return Ok(Some(WireMessage::Filters(filters)));
            }

            let text = String::from_utf8(payload).map_err(|_| CodecError::InvalidUtf8)?;
            self.filters.push(text);
        }
    }

    fn decode_send_files(&mut self) -> Result<Option<WireMessage>, CodecError> {
        loop {
            if self.pending_generator.is_none() {
                match self.index_reader.read(&self.demuxed)? {
                    IndexProgress::Incomplete => return Ok(None),
                    IndexProgress::Complete { index, consumed } => {
                        self.demuxed.drain(..consumed);
                        if index == NDX_DONE {
                            return Ok(Some(WireMessage::ListDone));
                        }
                        self.payload_framer.reset();
                        self.pending_generator = Some(index);
                    }
                }
            }

            let index = self.pending_generator.expect("checked above");
            match self.payload_framer.accumulate(&self.demuxed) {
                FramerProgress::Consumed(_) => return Ok(None),
                FramerProgress::Complete(consumed) => {
                    let payload: Vec<u8> = self.demuxed.drain(..consumed).collect();
                    self.pending_generator = None;
                    return Ok(Some(WireMessage::Generator { index, payload }));
                }
            }
        }
    }

    /// Serializes an outbound message, applying multiplex framing when
    /// [`Self::is_multiplexing_out`] and the message kind carries one.
    pub fn encode(&self, message: &WireMessage, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match message {
            WireMessage::Handshake { major, minor } => {
                out.extend_from_slice(format!("@RSYNCD: {major}.{minor}\n").as_bytes());
                Ok(())
            }
            WireMessage::Setup { flags, seed } => {
                out.push(*flags);
                out.extend_from_slice(&seed.to_le_bytes());
                Ok(())
            }
            WireMessage::Response(text) => {
                self.write_framed(MSG_ERROR_OFFSET, text.as_bytes(), out);
                Ok(())
            }
            WireMessage::Protocol(payload) => {
                self.write_framed(MSG_DATA_OFFSET, payload, out);
                Ok(())
            }
            WireMessage::Error { code, text } => {
                if self.multiplexing_out {
                    let mut body = text.clone();
                    body.push('\n');
                    self.write_framed(*code, body.as_bytes(), out);
                } else {
                    out.extend_from_slice(b"@ERROR: ");
                    out.extend_from_slice(text.as_bytes());
                    out.push(b'\n');
                }
                Ok(())
            }
            WireMessage::Command(_)
            | WireMessage::Arguments(_)
            | WireMessage::Filters(_)
            | WireMessage::Generator { .. }
            | WireMessage::ListDone => Err(CodecError::UnsupportedOutboundMessage),
        }
    }

    /// Writes `payload` into `out`, composing the multiplex header ahead of
    /// it (when multiplexing) as one chained buffer rather than allocating
    /// an intermediate copy.
    fn write_framed(&self, tag_offset: u8, payload: &[u8], out: &mut Vec<u8>) {
        if self.multiplexing_out {
            out.reserve(4 + payload.len());
            out.extend_from_slice(&encode_header(tag_offset, payload.len() as u32));
        } else {
            out.reserve(payload.len());
        }
        out.extend_from_slice(payload);
    }
}

impl Default for SessionCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_handshake_line(line: &str) -> Result<(u32, u32), CodecError> {
    let rest = line
        .strip_prefix("@RSYNCD: ")
        .ok_or_else(|| CodecError::ProtocolStartupError(format!("malformed handshake: {line:?}")))?;
    let (major_str, minor_str) = rest.split_once('.').ok_or_else(|| {
        CodecError::ProtocolStartupError(format!("malformed handshake version: {rest:?}"))
    })?;
    let major = major_str
        .parse()
        .map_err(|_| CodecError::ProtocolStartupError(format!("bad major version: {major_str:?}")))?;
    let minor = minor_str
        .trim_end_matches('\r')
        .parse()
        .map_err(|_| CodecError::ProtocolStartupError(format!("bad minor version: {minor_str:?}")))?;
    Ok((major, minor))
}
