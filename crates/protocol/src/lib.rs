#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Wire-level codec for a read-only rsync daemon session.
//!
//! # Overview
//!
//! This crate decodes and encodes the byte stream of a single rsync daemon
//! connection: the `@RSYNCD:` handshake, the module/command line, the
//! NUL-terminated argument vector, the length-prefixed filter list, and the
//! multiplexed generator/sender loop that follows. It does not interpret
//! file contents or build file lists — see the `flist` and `daemon` crates
//! for the layers built on top of it.
//!
//! # Design
//!
//! Every decode primitive ([`framing::delineated`], [`index::IndexReader`],
//! [`multiplex::MultiplexDecoder`]) is non-destructive: it inspects a
//! borrowed buffer and reports how many bytes it consumed without mutating
//! the caller's buffer. [`codec::SessionCodec`] owns the actual buffers and
//! drains them only once a primitive reports completion, which is what lets
//! [`codec::SessionCodec::decode`] be fed bytes in arbitrary chunk sizes and
//! still emit an identical message sequence.
//!
//! # Invariants
//!
//! - The session state machine only moves forward:
//!   `Handshake → Command → Arguments → FilterList → SendFiles`, with
//!   `SendFiles` looping on itself until the peer sends the `NDX_DONE`
//!   sentinel.
//! - Multiplexed framing engages asymmetrically: outbound framing toggles
//!   on as soon as the command line is read (the `Command → Arguments`
//!   transition), one state earlier than inbound, where the
//!   [`multiplex::MultiplexDecoder`] is only installed once the argument
//!   list itself completes (the `Arguments → FilterList` transition).
//! - `decode` never discards buffered bytes on error; the caller is
//!   expected to close the connection, matching the write-then-close
//!   policy described in each error variant's documentation.
//!
//! # Errors
//!
//! [`CodecError`] enumerates every failure this crate can produce. Most
//! variants are terminal: the caller should write the corresponding
//! `@ERROR` or muxed error frame and close the connection rather than
//! retry.
//!
//! # Examples
//!
//! ```
//! use protocol::codec::SessionCodec;
//! use protocol::message::WireMessage;
//!
//! let mut codec = SessionCodec::new();
//! let messages = codec.decode(b"@RSYNCD: 30.0\n").unwrap();
//! assert_eq!(messages, vec![WireMessage::Handshake { major: 30, minor: 0 }]);
//! ```

pub mod codec;
pub mod error;
pub mod framing;
pub mod index;
pub mod message;
pub mod multiplex;
pub mod payload;

pub use error::CodecError;
pub use message::WireMessage;
