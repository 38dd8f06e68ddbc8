//! End-to-end session scenarios, one per spec-level use case: a full
//! successful transfer, a version rejection, an oversized handshake line,
//! and the unmuxed-vs-muxed error encoding split.

use protocol::codec::{SessionCodec, SessionState};
use protocol::message::WireMessage;
use protocol::multiplex::encode_header;

fn nul_terminate(tokens: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for token in tokens {
        out.extend_from_slice(token.as_bytes());
        out.push(0);
    }
    out.push(0);
    out
}

/// Wraps `payload` in a `MSG_DATA` multiplex frame: every byte past the
/// argument list arrives framed this way.
fn mux_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = encode_header(0, payload.len() as u32).to_vec();
    out.extend_from_slice(payload);
    out
}

#[test]
fn full_successful_session_reaches_send_files_and_drains_indices() {
    let mut codec = SessionCodec::new();

    let handshake = codec.decode(b"@RSYNCD: 30.0\n").unwrap();
    assert_eq!(
        handshake,
        vec![WireMessage::Handshake {
            major: 30,
            minor: 0
        }]
    );

    let command = codec.decode(b"archive\n").unwrap();
    assert_eq!(command, vec![WireMessage::Command("archive".into())]);

    let args = codec
        .decode(&nul_terminate(&["--server", "--sender", "-logDtpre.iLsfxC", "."]))
        .unwrap();
    assert_eq!(
        args,
        vec![WireMessage::Arguments(vec![
            "--server".into(),
            "--sender".into(),
            "-logDtpre.iLsfxC".into(),
            ".".into(),
        ])]
    );

    let mut filter_bytes = Vec::new();
    filter_bytes.extend_from_slice(&4u32.to_le_bytes());
    filter_bytes.extend_from_slice(b"- *~");
    filter_bytes.extend_from_slice(&[0, 0, 0, 0]);
    let filters = codec.decode(&mux_frame(&filter_bytes)).unwrap();
    assert_eq!(filters, vec![WireMessage::Filters(vec!["- *~".into()])]);
    assert_eq!(codec.state(), SessionState::SendFiles);

    // First generator request: index 3 as an absolute short form, with a
    // 2-byte payload under the default length-prefixed framer.
    let mut send_bytes = vec![0xFF, 0x03, 0x00];
    send_bytes.extend_from_slice(&2u32.to_le_bytes());
    send_bytes.extend_from_slice(b"hi");
    // Second request: delta of 1 from the previous index (3 -> 4).
    send_bytes.push(1);
    send_bytes.extend_from_slice(&0u32.to_le_bytes());
    // End of stream.
    send_bytes.push(0);

    let generator_messages = codec.decode(&mux_frame(&send_bytes)).unwrap();
    assert_eq!(
        generator_messages,
        vec![
            WireMessage::Generator {
                index: 3,
                payload: b"hi".to_vec(),
            },
            WireMessage::Generator {
                index: 4,
                payload: Vec::new(),
            },
            WireMessage::ListDone,
        ]
    );
}

#[test]
fn incompatible_version_closes_after_the_handshake_message_attempt() {
    let mut codec = SessionCodec::new();
    let err = codec.decode(b"@RSYNCD: 5.0\n").unwrap_err();
    assert!(matches!(
        err,
        protocol::CodecError::IncompatibleVersion { major: 5, minor: 0 }
    ));
    // Per the write-then-close policy, the state machine still advances so
    // a caller that (incorrectly) kept reading wouldn't reinterpret the
    // next bytes as a handshake line.
    assert_eq!(codec.state(), SessionState::Command);
}

#[test]
fn oversized_command_line_is_a_framing_overflow() {
    let mut codec = SessionCodec::new();
    codec.decode(b"@RSYNCD: 30.0\n").unwrap();
    let oversized = vec![b'm'; 41];
    let err = codec.decode(&oversized).unwrap_err();
    assert!(matches!(err, protocol::CodecError::FramingOverflow(_)));
}

#[test]
fn response_message_round_trips_muxed_under_error_tag() {
    let mut codec = SessionCodec::new();
    codec.decode(b"@RSYNCD: 30.0\n").unwrap();
    codec.decode(b"archive\n").unwrap();
    assert!(codec.is_multiplexing_out());

    let mut out = Vec::new();
    codec
        .encode(&WireMessage::Response("motd line".into()), &mut out)
        .unwrap();

    let header = u32::from_le_bytes(out[..4].try_into().unwrap());
    assert_eq!(header >> 24, 3 + 7); // MSG_ERROR offset is 3
    assert_eq!(&out[4..], b"motd line");
}

#[test]
fn protocol_message_round_trips_muxed_under_data_tag() {
    let mut codec = SessionCodec::new();
    codec.decode(b"@RSYNCD: 30.0\n").unwrap();
    codec.decode(b"archive\n").unwrap();

    let mut out = Vec::new();
    codec
        .encode(&WireMessage::Protocol(vec![1, 2, 3]), &mut out)
        .unwrap();

    let header = u32::from_le_bytes(out[..4].try_into().unwrap());
    assert_eq!(header >> 24, 7); // MSG_DATA offset is 0
    assert_eq!(&out[4..], &[1, 2, 3]);
}

#[test]
fn setup_message_is_never_multiplex_framed() {
    let mut codec = SessionCodec::new();
    codec.decode(b"@RSYNCD: 30.0\n").unwrap();
    codec.decode(b"archive\n").unwrap();
    assert!(codec.is_multiplexing_out());

    let mut out = Vec::new();
    codec
        .encode(
            &WireMessage::Setup {
                flags: 0,
                seed: 0xDEAD_BEEF,
            },
            &mut out,
        )
        .unwrap();
    assert_eq!(out.len(), 5);
    assert_eq!(out[0], 0);
    assert_eq!(u32::from_le_bytes(out[1..5].try_into().unwrap()), 0xDEAD_BEEF);
}
