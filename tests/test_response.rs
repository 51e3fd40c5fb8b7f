use bytes::BytesMut;
use tether::http::header::HeaderMap;
use tether::http::response::{decide_framing, Framing, StatusCode};
use tether::http::writer::{clean_header_value, encode_chunk, render_head, LAST_CHUNK};
use tether::http::Version;

/// Decodes a chunked body, returning the payload and the bytes after the
/// terminating chunk.
fn decode_chunked(mut input: &[u8]) -> (Vec<u8>, &[u8]) {
    let mut out = Vec::new();
    loop {
        let line_end = input.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(std::str::from_utf8(&input[..line_end]).unwrap(), 16).unwrap();
        input = &input[line_end + 2..];
        if size == 0 {
            assert_eq!(&input[..2], b"\r\n");
            return (out, &input[2..]);
        }
        out.extend_from_slice(&input[..size]);
        assert_eq!(&input[size..size + 2], b"\r\n");
        input = &input[size + 2..];
    }
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    assert_eq!(StatusCode::NOT_FOUND.reason_phrase(), "Not Found");
    assert_eq!(StatusCode::NOT_MODIFIED.reason_phrase(), "Not Modified");
    assert_eq!(
        StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode(799).reason_phrase(), "");
    assert_eq!(StatusCode::NOT_FOUND.to_string(), "404 Not Found");
}

#[test]
fn test_framing_explicit_length_is_identity() {
    let mut headers = HeaderMap::from_pairs([("Content-Length", "2")]);
    let decision = decide_framing(StatusCode::OK, &mut headers, Version::HTTP_11, false);

    assert_eq!(decision.framing, Framing::Identity(2));
    assert!(!decision.close_after_response);
    assert!(!headers.contains("Transfer-Encoding"));
    assert!(!headers.contains("Connection"));
}

#[test]
fn test_framing_unknown_length_http11_is_chunked() {
    let mut headers = HeaderMap::new();
    let decision = decide_framing(StatusCode::OK, &mut headers, Version::HTTP_11, false);

    assert_eq!(decision.framing, Framing::Chunked);
    assert_eq!(headers.get("Transfer-Encoding"), Some("chunked"));
}

#[test]
fn test_framing_unknown_length_http10_closes() {
    let mut headers = HeaderMap::new();
    let decision = decide_framing(StatusCode::OK, &mut headers, Version::HTTP_10, false);

    assert_eq!(decision.framing, Framing::CloseDelimited);
    assert!(decision.close_after_response);
    assert_eq!(headers.get("Connection"), Some("close"));
    assert!(!headers.contains("Transfer-Encoding"));
}

#[test]
fn test_framing_close_disables_chunking() {
    let mut headers = HeaderMap::new();
    let decision = decide_framing(StatusCode::OK, &mut headers, Version::HTTP_11, true);

    assert_eq!(decision.framing, Framing::CloseDelimited);
    assert_eq!(headers.get("Connection"), Some("close"));
    assert!(!headers.contains("Transfer-Encoding"));
}

#[test]
fn test_framing_close_keeps_known_length() {
    let mut headers = HeaderMap::from_pairs([("Content-Length", "5")]);
    let decision = decide_framing(StatusCode::OK, &mut headers, Version::HTTP_11, true);

    assert_eq!(decision.framing, Framing::Identity(5));
    assert_eq!(headers.get("Connection"), Some("close"));
}

#[test]
fn test_framing_not_modified_has_no_body() {
    let mut headers = HeaderMap::from_pairs([
        ("Content-Length", "10"),
        ("Content-Type", "text/html"),
        ("ETag", "\"x\""),
    ]);
    let decision = decide_framing(StatusCode::NOT_MODIFIED, &mut headers, Version::HTTP_11, false);

    assert_eq!(decision.framing, Framing::Identity(0));
    assert!(!decision.close_after_response);
    assert!(!headers.contains("Content-Length"));
    assert!(!headers.contains("Content-Type"));
    assert!(!headers.contains("Transfer-Encoding"));
    assert_eq!(headers.get("Etag"), Some("\"x\""));
}

#[test]
fn test_render_head() {
    let headers = HeaderMap::from_pairs([("Content-Length", "2"), ("X-Evil", "a\r\nSet-Cookie: x")]);
    let mut out = BytesMut::new();
    render_head(&mut out, Version::HTTP_11, StatusCode::OK, &headers);
    assert_eq!(
        &out[..],
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nX-Evil: a  Set-Cookie: x\r\n\r\n"
    );

    let mut out = BytesMut::new();
    render_head(&mut out, Version::new(0, 9), StatusCode::NOT_FOUND, &HeaderMap::new());
    assert_eq!(&out[..], b"HTTP/1.0 404 Not Found\r\n\r\n");
}

#[test]
fn test_clean_header_value() {
    assert_eq!(clean_header_value("plain"), "plain");
    assert_eq!(clean_header_value("a\rb\nc"), "a b c");
}

#[test]
fn test_chunked_output_round_trips() {
    let writes: [&[u8]; 5] = [b"hello", b"", b" ", &[0xAB; 300], b"world\r\n0\r\n"];

    let mut out = BytesMut::new();
    let mut expected = Vec::new();
    for w in writes {
        encode_chunk(&mut out, w);
        expected.extend_from_slice(w);
    }
    out.extend_from_slice(LAST_CHUNK);

    let (decoded, rest) = decode_chunked(&out);
    assert_eq!(decoded, expected);
    assert!(rest.is_empty());
}

#[test]
fn test_empty_write_produces_no_chunk() {
    let mut out = BytesMut::new();
    encode_chunk(&mut out, b"");
    assert!(out.is_empty());

    encode_chunk(&mut out, &[0u8; 26]);
    assert!(out.starts_with(b"1a\r\n"));
}
