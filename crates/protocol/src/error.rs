//! Error types surfaced by the codec.

use thiserror::Error;

use crate::framing::FramingOverflow;
use crate::index::IndexProtocolError;
use crate::multiplex::MultiplexError;

/// Everything that can go wrong while decoding or encoding a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A delimited token exceeded its size cap in a state with no
    /// spec-mandated wire text of its own (currently only the COMMAND line).
    #[error(transparent)]
    FramingOverflow(#[from] FramingOverflow),

    /// The handshake line exceeded its 16-byte cap. The wire text is fixed
    /// by the protocol, not derived from the overflow itself.
    #[error("protocol startup error")]
    HandshakeOverflow,

    /// The handshake line was not `@RSYNCD: M.m\n`.
    #[error("protocol startup error: {0}")]
    ProtocolStartupError(String),

    /// The handshake parsed but the announced version is unsupported.
    #[error("incompatible protocol version {major}.{minor}")]
    IncompatibleVersion {
        /// The major version the peer announced.
        major: u32,
        /// The minor version the peer announced.
        minor: u32,
    },

    /// More than the maximum number of arguments were sent.
    #[error("argument list too long")]
    ArgumentListTooLong {
        /// The configured maximum.
        max: usize,
    },

    /// A single argument token exceeded its size cap.
    #[error("argument too long")]
    ArgumentTokenOverflow {
        /// The size cap that was exceeded.
        cap: usize,
    },

    /// A generator index decoded to a negative value other than `NDX_DONE`.
    #[error(transparent)]
    IndexProtocolError(#[from] IndexProtocolError),

    /// A multiplex frame header was malformed.
    #[error(transparent)]
    Multiplex(#[from] MultiplexError),

    /// A filter or argument token was not valid UTF-8.
    #[error("token was not valid UTF-8")]
    InvalidUtf8,

    /// `encode` was asked to serialize a message kind it does not support
    /// in the session's current multiplexing mode.
    #[error("cannot encode unsupported outbound message")]
    UnsupportedOutboundMessage,
}
