//! Per-connection glue between the wire codec and the module cache.

use rand::Rng;
use tracing::{debug, info, warn};

use protocol::codec::SessionCodec;
use protocol::message::WireMessage;
use protocol::CodecError;

use crate::module::ModuleTable;

/// Owns one connection's [`SessionCodec`] and the module lookups its
/// messages trigger.
///
/// This is deliberately thin: it is the minimal glue the protocol's
/// handshake/command/arguments/file-list exchange needs to reach a real
/// [`crate::module::Module`], not a delta-transfer engine. Content
/// streaming downstream of a `GeneratorMessage` is out of scope.
pub struct SessionHandler<'a> {
    codec: SessionCodec,
    modules: &'a ModuleTable,
    requested_module: Option<String>,
    closed: bool,
}

impl<'a> SessionHandler<'a> {
    /// Creates a handler for a fresh connection against a shared module table.
    #[must_use]
    pub fn new(modules: &'a ModuleTable) -> Self {
        Self {
            codec: SessionCodec::new(),
            modules,
            requested_module: None,
            closed: false,
        }
    }

    /// Whether the session has emitted a terminal error or otherwise ended.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feeds newly received bytes through the codec, reacts to every fully
    /// parsed message, and appends the resulting outbound bytes to `out`.
    ///
    /// Returns `false` once the session has ended (a terminal error was
    /// written, or the protocol reached a state with nothing further to
    /// send); the caller should stop reading and close the socket.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] for any framing or protocol violation the
    /// codec detects. The caller should write `out` (if non-empty) and
    /// close the connection; no further bytes should be fed in.
    pub fn handle_bytes(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<bool, CodecError> {
        let messages = match self.codec.decode(input) {
            Ok(messages) => messages,
            Err(err) => {
                self.write_fatal_error(&err, out);
                return Err(err);
            }
        };

        for event in self.codec.take_log_events() {
            debug!(tag = ?event.tag, text = %event.text, "peer log event");
        }

        for message in messages {
            self.handle_message(message, out)?;
            if self.closed {
                break;
            }
        }

        Ok(!self.closed)
    }

    fn handle_message(
        &mut self,
        message: WireMessage,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        match message {
            WireMessage::Handshake { major, minor } => {
                info!(major, minor, "handshake");
                self.codec
                    .encode(&WireMessage::Handshake { major, minor }, out)?;
            }
            WireMessage::Command(name) => {
                info!(module = %name, "module requested");
                self.requested_module = Some(name);
            }
            WireMessage::Arguments(args) => {
                debug!(count = args.len(), "arguments received");
                let seed = rand::rng().random::<u32>();
                self.codec
                    .encode(&WireMessage::Setup { flags: 0, seed }, out)?;
            }
            WireMessage::Filters(filters) => {
                debug!(count = filters.len(), "filter rules received");
            }
            WireMessage::ListDone => {
                self.respond_with_listing(true, out)?;
            }
            WireMessage::Generator { index, payload } => {
                debug!(index, bytes = payload.len(), "generator request");
                self.respond_with_listing(true, out)?;
            }
            WireMessage::Setup { .. }
            | WireMessage::Response(_)
            | WireMessage::Protocol(_)
            | WireMessage::Error { .. } => {
                // These are outbound-only from the daemon's own point of
                // view; the codec never emits them while decoding.
            }
        }
        Ok(())
    }

    fn respond_with_listing(&mut self, recursive: bool, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let Some(module_name) = self.requested_module.clone() else {
            self.write_application_error(out, "no module selected");
            return Ok(());
        };

        let Some(module) = self.modules.get(&module_name) else {
            warn!(module = %module_name, "no such module");
            self.write_application_error(out, &format!("unknown module: {module_name}"));
            return Ok(());
        };

        match module.get_file_list(&module_name, recursive) {
            Ok(list) => {
                let summary = format!("{} entries", list.entries.len());
                let body = list
                    .entries
                    .iter()
                    .map(|entry| entry.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
                    .into_bytes();
                self.codec.encode(&WireMessage::Response(summary), out)?;
                self.codec.encode(&WireMessage::Protocol(body), out)?;
            }
            Err(err) => {
                warn!(module = %module_name, error = %err, "file list lookup failed");
                self.write_application_error(out, &err.to_string());
            }
        }
        Ok(())
    }

    fn write_application_error(&mut self, out: &mut Vec<u8>, text: &str) {
        let message = WireMessage::Error {
            code: 1,
            text: text.to_string(),
        };
        // Encoding a well-formed outbound message cannot fail; if it ever
        // does there is nothing more useful to do than drop the connection.
        let _ = self.codec.encode(&message, out);
        self.closed = true;
    }

    fn write_fatal_error(&mut self, err: &CodecError, out: &mut Vec<u8>) {
        let message = WireMessage::Error {
            code: 1,
            text: err.to_string(),
        };
        let _ = self.codec.encode(&message, out);
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{MemoryCachedModule, Module};
    use crate::repository::FsRepository;
    use compress::zlib::CompressionLevel;
    use protocol::multiplex::encode_header;
    use std::fs;
    use std::sync::Arc;

    /// Wraps `payload` in a `MSG_DATA` multiplex frame: every byte past the
    /// argument list arrives framed this way.
    fn mux_frame(payload: &[u8]) -> Vec<u8> {
        let mut out = encode_header(0, payload.len() as u32).to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn table_with_one_module() -> (tempfile::TempDir, ModuleTable) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let repo = FsRepository::new(dir.path(), "mod").unwrap();
        let module: Arc<dyn Module> =
            Arc::new(MemoryCachedModule::new("mod", None, repo, CompressionLevel::Default).unwrap());
        let mut table = ModuleTable::new();
        table.insert(module);
        (dir, table)
    }

    #[test]
    fn full_exchange_reaches_a_listing_response() {
        let (_dir, table) = table_with_one_module();
        let mut session = SessionHandler::new(&table);
        let mut out = Vec::new();

        session.handle_bytes(b"@RSYNCD: 30.0\n", &mut out).unwrap();
        session.handle_bytes(b"mod\n", &mut out).unwrap();
        session.handle_bytes(b"\0", &mut out).unwrap();

        // filter list terminator (zero-length) then NDX_DONE, multiplex-framed.
        let mut filters_and_done = Vec::new();
        filters_and_done.extend_from_slice(&0u32.to_le_bytes());
        filters_and_done.push(0);
        let still_open = session
            .handle_bytes(&mux_frame(&filters_and_done), &mut out)
            .unwrap();

        assert!(still_open);
        assert!(!session.is_closed());
        assert!(!out.is_empty());
    }

    #[test]
    fn unknown_module_closes_the_session_with_an_error() {
        let (_dir, table) = table_with_one_module();
        let mut session = SessionHandler::new(&table);
        let mut out = Vec::new();

        session.handle_bytes(b"@RSYNCD: 30.0\n", &mut out).unwrap();
        session.handle_bytes(b"missing\n", &mut out).unwrap();
        session.handle_bytes(b"\0", &mut out).unwrap();

        let mut done = Vec::new();
        done.extend_from_slice(&0u32.to_le_bytes());
        done.push(0);
        let still_open = session.handle_bytes(&mux_frame(&done), &mut out).unwrap();

        assert!(!still_open);
        assert!(session.is_closed());
    }

    #[test]
    fn incompatible_version_propagates_as_an_error_and_closes() {
        let (_dir, table) = table_with_one_module();
        let mut session = SessionHandler::new(&table);
        let mut out = Vec::new();

        let result = session.handle_bytes(b"@RSYNCD: 1.0\n", &mut out);
        assert!(result.is_err());
        assert!(session.is_closed());
        assert!(!out.is_empty());
    }
}
