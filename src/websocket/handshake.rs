use std::io;

use bytes::{BufMut, BytesMut};
use md5::{Digest, Md5};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::http::header::{self, HeaderMap};
use crate::http::request::{Method, RequestHead};
use crate::http::Request;
use crate::websocket::{Error, ReplayReader, WebSocket};

/// Number encoded in a key header: its decimal digits read as one number,
/// divided by its count of spaces.
///
/// ```
/// # use tether::websocket::key_number;
/// assert_eq!(key_number("4 @1  46546xW%0l 1 5"), Some(829309203));
/// assert_eq!(key_number("12345"), None);
/// ```
pub fn key_number(value: &str) -> Option<u32> {
    let mut number: u32 = 0;
    let mut spaces: u32 = 0;
    for b in value.bytes() {
        if b == b' ' {
            spaces += 1;
        } else if b.is_ascii_digit() {
            number = number.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
        }
    }
    if spaces == 0 || number % spaces != 0 {
        return None;
    }
    Some(number / spaces)
}

/// MD5 over both key numbers, big-endian, followed by the nonce.
pub fn challenge_response(key1: u32, key2: u32, nonce: &[u8; 8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(key1.to_be_bytes());
    hasher.update(key2.to_be_bytes());
    hasher.update(nonce);
    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Path and query of a request target as written, without any scheme or
/// authority.
fn request_path(target: &str) -> &str {
    match target.split_once("://") {
        Some((_, rest)) if !target.starts_with('/') => {
            &rest[rest.find(['/', '?']).unwrap_or(rest.len())..]
        }
        _ => target,
    }
}

fn key_header(headers: &HeaderMap, name: &'static str) -> Result<u32, Error> {
    let value = headers.get(name).ok_or(Error::MissingKey(name))?;
    key_number(value).ok_or(Error::BadKey(name))
}

/// Upgrades the request's connection to a WebSocket.
///
/// The connection is hijacked first, so from here on there is no HTTP
/// error response to fall back to: on any failure the socket is shut down
/// and the error returned.
pub async fn upgrade(req: Request<'_>) -> Result<WebSocket, Error> {
    let head = req.head().clone();

    let hijacked = req.hijack().map_err(|e| {
        tracing::error!(peer = %head.remote_addr, error = %e, "hijack failed during websocket upgrade");
        Error::Hijack(e)
    })?;

    let (read_half, write_half) = tokio::io::split(hijacked.io);
    let replay: Box<dyn AsyncRead + Unpin + Send> =
        Box::new(io::Cursor::new(hijacked.buffered).chain(read_half));
    let mut reader: ReplayReader = BufReader::new(replay);
    let mut writer = BufWriter::new(write_half);

    match handshake(&head, &mut reader, &mut writer).await {
        Ok(()) => Ok(WebSocket::new(reader, writer)),
        Err(e) => {
            tracing::debug!(peer = %head.remote_addr, error = %e, "websocket handshake failed");
            let _ = writer.shutdown().await;
            Err(e)
        }
    }
}

async fn handshake<W>(head: &RequestHead, reader: &mut ReplayReader, writer: &mut W) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    if head.method != Method::GET {
        return Err(Error::BadMethod);
    }

    let origin = head.header(header::ORIGIN).ok_or(Error::MissingOrigin)?;

    let connection = head.header(header::CONNECTION).unwrap_or("");
    if !connection.eq_ignore_ascii_case("upgrade") {
        return Err(Error::BadConnection);
    }

    let upgrade = head.header(header::UPGRADE).unwrap_or("");
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::BadUpgrade);
    }

    let key1 = key_header(&head.headers, header::SEC_WEBSOCKET_KEY1)?;
    let key2 = key_header(&head.headers, header::SEC_WEBSOCKET_KEY2)?;

    let mut nonce = [0u8; 8];
    reader.read_exact(&mut nonce).await?;
    let response = challenge_response(key1, key2, &nonce);

    // TLS is not supported here, the scheme is always ws.
    let location = format!("ws://{}{}", head.host, request_path(&head.target));

    let mut out = BytesMut::new();
    out.put_slice(b"HTTP/1.1 101 WebSocket Protocol Handshake");
    out.put_slice(b"\r\nUpgrade: WebSocket");
    out.put_slice(b"\r\nConnection: Upgrade");
    out.put_slice(format!("\r\nSec-WebSocket-Location: {}", location).as_bytes());
    out.put_slice(format!("\r\nSec-WebSocket-Origin: {}", origin).as_bytes());
    if let Some(protocol) = head.header(header::SEC_WEBSOCKET_PROTOCOL).filter(|p| !p.is_empty()) {
        out.put_slice(format!("\r\nSec-WebSocket-Protocol: {}", protocol).as_bytes());
    }
    out.put_slice(b"\r\n\r\n");
    out.put_slice(&response);

    writer.write_all(&out).await?;
    writer.flush().await?;
    Ok(())
}
