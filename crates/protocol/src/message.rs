//! The tagged union of messages exchanged across the codec boundary.

/// A decoded or to-be-encoded rsync daemon protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// `@RSYNCD: M.m\n` version negotiation line.
    Handshake {
        /// Major protocol version.
        major: u32,
        /// Minor protocol version.
        minor: u32,
    },
    /// The module/command line sent immediately after the handshake.
    Command(String),
    /// The NUL-terminated rsync argument vector.
    Arguments(Vec<String>),
    /// The length-prefixed filter rule list.
    Filters(Vec<String>),
    /// A generator request for file-list index `index`, carrying whatever
    /// payload the downstream delta/file-list codec attaches to it.
    Generator {
        /// The file-list index this request targets, or [`crate::index::NDX_DONE`].
        index: i32,
        /// Accumulated payload bytes.
        payload: Vec<u8>,
    },
    /// Sentinel marking the end of the generator's index stream.
    ListDone,
    /// The post-argument setup frame: auth flags and the challenge seed.
    Setup {
        /// Authentication flags; credential checking itself is delegated.
        flags: u8,
        /// Challenge seed, opaque to this layer.
        seed: u32,
    },
    /// A plain textual response, muxed under `MSG_ERROR` when multiplexing.
    Response(String),
    /// An opaque `MSG_DATA` payload.
    Protocol(Vec<u8>),
    /// A terminal or informational error, with the wire code the caller
    /// wants attached to the muxed frame.
    Error {
        /// The multiplex tag offset to encode this error under.
        code: u8,
        /// Human-readable diagnostic text.
        text: String,
    },
}
