//! Property: however a byte stream is split into chunks fed to
//! [`SessionCodec::decode`], the emitted message sequence is identical.

use proptest::prelude::*;
use protocol::codec::SessionCodec;
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

fn full_session_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    stream.extend_from_slice(b"@RSYNCD: 30.0\n");
    stream.extend_from_slice(b"public\n");
    stream.extend_from_slice(&nul_terminate(&["--server", "--sender", "-l", "-o", "-g"]));

    let mut muxed = Vec::new();
    muxed.extend_from_slice(&7u32.to_le_bytes());
    muxed.extend_from_slice(b"- *.tmp");
    muxed.extend_from_slice(&[0, 0, 0, 0]); // filter list terminator
    muxed.push(5); // generator index, delta from 0
    muxed.extend_from_slice(&3u32.to_le_bytes());
    muxed.extend_from_slice(b"abc");
    muxed.push(0); // NDX_DONE
    stream.extend_from_slice(&mux_frame(&muxed));
    stream
}

fn split_into_chunks(bytes: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    for &size in sizes {
        if offset >= bytes.len() {
            break;
        }
        let end = (offset + size.max(1)).min(bytes.len());
        chunks.push(bytes[offset..end].to_vec());
        offset = end;
    }
    if offset < bytes.len() {
        chunks.push(bytes[offset..].to_vec());
    }
    chunks
}

proptest! {
    #[test]
    fn chunking_does_not_change_emitted_messages(sizes in prop::collection::vec(1usize..11, 1..40)) {
        let stream = full_session_stream();

        let mut reference = SessionCodec::new();
        let expected = reference.decode(&stream).unwrap();

        let mut chunked = SessionCodec::new();
        let mut actual = Vec::new();
        for chunk in split_into_chunks(&stream, &sizes) {
            actual.extend(chunked.decode(&chunk).unwrap());
        }

        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn byte_at_a_time_matches_whole_buffer(_seed in 0u8..1) {
        let stream = full_session_stream();

        let mut reference = SessionCodec::new();
        let expected = reference.decode(&stream).unwrap();

        let mut chunked = SessionCodec::new();
        let mut actual = Vec::new();
        for byte in &stream {
            actual.extend(chunked.decode(std::slice::from_ref(byte)).unwrap());
        }

        prop_assert_eq!(actual, expected);
    }
}
