use std::borrow::Cow;
use std::io;

use bytes::{BufMut, BytesMut};

use crate::http::body::StreamState;
use crate::http::connection::Session;
use crate::http::header::HeaderMap;
use crate::http::request::Version;
use crate::http::response::{Framing, StatusCode};

/// Staged response bytes are written out once they reach this size.
pub(crate) const FLUSH_THRESHOLD: usize = 8192;

/// Terminates a chunked body.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Replaces CR and LF in a header value with spaces so a value can never
/// start a new header line or end the head early.
pub fn clean_header_value(value: &str) -> Cow<'_, str> {
    if value.bytes().any(|b| b == b'\r' || b == b'\n') {
        Cow::Owned(value.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// Renders the status line, headers and the blank line ending the head.
pub fn render_head(out: &mut BytesMut, version: Version, status: StatusCode, headers: &HeaderMap) {
    let proto = if version >= Version::HTTP_11 {
        "HTTP/1.1"
    } else {
        "HTTP/1.0"
    };
    out.put_slice(
        format!("{} {} {}\r\n", proto, status.as_u16(), status.reason_phrase()).as_bytes(),
    );
    for (name, value) in headers.iter() {
        out.put_slice(name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(clean_header_value(value).as_bytes());
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"\r\n");
}

/// Frames `data` as one chunk. Empty input writes nothing, since a zero
/// length chunk would end the body.
pub fn encode_chunk(out: &mut BytesMut, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    out.put_slice(format!("{:x}\r\n", data.len()).as_bytes());
    out.put_slice(data);
    out.put_slice(b"\r\n");
}

/// Write side of the response in progress.
#[derive(Debug)]
pub(crate) struct ResponseState {
    pub framing: Framing,
    /// Identity framing only: declared bytes not yet written.
    remaining: u64,
    /// Identity framing only: the handler wrote more than it declared.
    overflow: bool,
    pub out: BytesMut,
    pub stream: StreamState,
}

impl ResponseState {
    pub fn new(framing: Framing) -> Self {
        let remaining = match framing {
            Framing::Identity(n) => n,
            _ => 0,
        };
        Self {
            framing,
            remaining,
            overflow: false,
            out: BytesMut::with_capacity(FLUSH_THRESHOLD),
            stream: StreamState::Open,
        }
    }

    /// Frames body bytes into the staging buffer. Identity bodies drop
    /// bytes past the declared length and remember the overflow.
    pub fn stage(&mut self, data: &[u8]) {
        match self.framing {
            Framing::Identity(_) => {
                let allowed = data.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
                if allowed < data.len() {
                    self.overflow = true;
                }
                self.out.put_slice(&data[..allowed]);
                self.remaining -= allowed as u64;
            }
            Framing::Chunked => encode_chunk(&mut self.out, data),
            Framing::CloseDelimited => self.out.put_slice(data),
        }
    }

    /// True when an identity body did not match its Content-Length.
    pub fn length_mismatch(&self) -> bool {
        matches!(self.framing, Framing::Identity(_)) && (self.remaining != 0 || self.overflow)
    }
}

/// Body sink returned by [`Request::respond`](crate::http::Request::respond).
///
/// Writes are framed according to the response framing and staged; they
/// reach the socket when enough has accumulated, on [`flush`](Self::flush),
/// or when the handler returns.
pub struct ResponseBody<'a> {
    session: &'a mut Session,
}

impl<'a> ResponseBody<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    pub async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.session.write_body(data).await
    }

    pub async fn write_str(&mut self, data: &str) -> io::Result<()> {
        self.write(data.as_bytes()).await
    }

    /// Sends everything staged so far to the peer.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.session.flush_response().await
    }
}
