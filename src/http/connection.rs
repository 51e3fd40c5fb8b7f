use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use url::Url;

use crate::config::Limits;
use crate::http::body::{BodyReader, StreamState};
use crate::http::header::{self, HeaderMap};
use crate::http::parser;
use crate::http::request::{Method, Request, RequestHead, Version};
use crate::http::response::{self, Framing, StatusCode};
use crate::http::writer::{self, ResponseBody, ResponseState};
use crate::http::Error;
use crate::server::Handler;

/// Any byte stream the engine can serve HTTP over.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> Io for T {}

pub type BoxedIo = Box<dyn Io>;

/// A connection taken over with [`Request::hijack`].
pub struct Hijacked {
    pub io: BoxedIo,
    /// Bytes already read off the wire but not consumed by the HTTP layer.
    /// They belong to whatever protocol runs next.
    pub buffered: Bytes,
    pub remote_addr: SocketAddr,
}

/// Per-listener settings shared by every connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Host for request URLs that name none and carry no `Host` header.
    pub server_name: String,
    /// Reports `https` URLs. Encryption itself belongs to the listener.
    pub secure: bool,
    pub limits: Limits,
}

impl ConnectionConfig {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            secure: false,
            limits: Limits::default(),
        }
    }
}

pub enum ConnectionState {
    Idle,
    Dispatched(RequestHead),
    Responded,
    Hijacked,
    Closed,
}

/// Socket and per-request protocol state shared between the keep-alive
/// loop and the [`Request`] handed to the handler.
pub(crate) struct Session {
    /// `None` once the connection was hijacked or closed.
    io: Option<BufReader<BoxedIo>>,
    remote_addr: SocketAddr,
    version: Version,
    close_after_response: bool,
    body: BodyReader,
    response: Option<ResponseState>,
}

impl Session {
    fn new(io: BoxedIo, remote_addr: SocketAddr) -> Self {
        Self {
            io: Some(BufReader::new(io)),
            remote_addr,
            version: Version::HTTP_11,
            close_after_response: false,
            body: BodyReader::new(0, false),
            response: None,
        }
    }

    fn begin(&mut self, version: Version, content_length: u64, expect_continue: bool, close: bool) {
        self.version = version;
        self.close_after_response = close;
        self.body = BodyReader::new(content_length, expect_continue);
        self.response = None;
    }

    fn is_hijacked(&self) -> bool {
        self.io.is_none()
    }

    fn io_mut(&mut self) -> io::Result<&mut BufReader<BoxedIo>> {
        self.io
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection hijacked"))
    }

    pub(crate) async fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let io = self
            .io
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection hijacked"))?;
        self.body.read(io, buf).await
    }

    pub(crate) async fn respond(
        &mut self,
        status: StatusCode,
        mut headers: HeaderMap,
    ) -> Result<ResponseBody<'_>, Error> {
        if self.response.is_some() {
            tracing::warn!(peer = %self.remote_addr, status = status.as_u16(), "multiple calls to respond");
            return Err(Error::AlreadyResponded);
        }

        if headers.remove(header::TRANSFER_ENCODING).is_some() {
            tracing::warn!(peer = %self.remote_addr, "transfer encoding set by handler, removed");
        }

        // Unread body bytes would be parsed as the next request.
        if self.body.remaining() > 0 {
            self.close_after_response = true;
        }
        self.body.close();

        let decision =
            response::decide_framing(status, &mut headers, self.version, self.close_after_response);
        self.close_after_response = decision.close_after_response;

        let mut state = ResponseState::new(decision.framing);
        writer::render_head(&mut state.out, self.version, status, &headers);
        self.response = Some(state);

        if decision.framing == Framing::Chunked {
            // A failure here is sticky and surfaces on the next write.
            let _ = self.flush_response().await;
        }

        Ok(ResponseBody::new(self))
    }

    pub(crate) async fn write_body(&mut self, data: &[u8]) -> io::Result<()> {
        let state = self
            .response
            .as_mut()
            .ok_or_else(|| io::Error::other("response not started"))?;
        state.stream.check()?;
        state.stage(data);
        if state.out.len() >= writer::FLUSH_THRESHOLD {
            self.flush_response().await?;
        }
        Ok(())
    }

    pub(crate) async fn flush_response(&mut self) -> io::Result<()> {
        let (Some(io), Some(state)) = (self.io.as_mut(), self.response.as_mut()) else {
            return Err(io::Error::other("response not started"));
        };
        state.stream.check()?;

        let result = match io.write_all(&state.out).await {
            Ok(()) => io.flush().await,
            Err(e) => Err(e),
        };
        state.out.clear();
        if let Err(e) = &result {
            state.stream.record(e);
        }
        result
    }

    pub(crate) fn hijack(&mut self) -> Result<Hijacked, Error> {
        if self.response.is_some() {
            tracing::warn!(peer = %self.remote_addr, "hijack called after respond");
            return Err(Error::AlreadyResponded);
        }
        let reader = self
            .io
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection hijacked"))?;
        let buffered = Bytes::copy_from_slice(reader.buffer());
        self.body.close();

        Ok(Hijacked {
            io: reader.into_inner(),
            buffered,
            remote_addr: self.remote_addr,
        })
    }

    /// Completes the current response: answers for a silent handler, ends
    /// the body framing and pushes everything to the socket.
    async fn finish(&mut self) -> Result<(), Error> {
        if self.response.is_none() {
            let mut headers = HeaderMap::new();
            headers.set(header::CONTENT_TYPE, "text/html; charset=utf-8");
            self.respond(StatusCode::OK, headers).await?;
        }

        let Some(state) = self.response.as_mut() else {
            return Ok(());
        };
        if state.length_mismatch() {
            tracing::debug!(peer = %self.remote_addr, "response length mismatch, closing after response");
            self.close_after_response = true;
        }
        if state.framing == Framing::Chunked && state.stream == StreamState::Open {
            state.out.extend_from_slice(writer::LAST_CHUNK);
        }

        self.flush_response().await?;
        Ok(())
    }
}

/// One accepted connection, served request after request until keep-alive
/// ends or a handler hijacks the socket.
pub struct Connection {
    session: Session,
    config: Arc<ConnectionConfig>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(io: impl Io + 'static, remote_addr: SocketAddr, config: Arc<ConnectionConfig>) -> Self {
        Self {
            session: Session::new(Box::new(io), remote_addr),
            config,
            state: ConnectionState::Idle,
        }
    }

    /// Serves the connection to completion.
    ///
    /// A peer closing the connection between requests ends the loop with
    /// `Ok`. Parse and write failures close the connection and are
    /// returned for the caller to log. A hijacked socket is left open.
    pub async fn run<H: Handler>(mut self, handler: &H) -> Result<(), Error> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Idle => match self.prepare().await {
                    Ok(Some(head)) => ConnectionState::Dispatched(head),
                    Ok(None) => ConnectionState::Closed,
                    Err(e) => {
                        self.close().await;
                        return Err(e);
                    }
                },

                ConnectionState::Dispatched(head) => {
                    tracing::debug!(
                        peer = %self.session.remote_addr,
                        method = %head.method,
                        url = %head.url,
                        "request received"
                    );
                    handler.serve(Request::new(head, &mut self.session)).await;
                    if self.session.is_hijacked() {
                        ConnectionState::Hijacked
                    } else {
                        ConnectionState::Responded
                    }
                }

                ConnectionState::Responded => {
                    if let Err(e) = self.session.finish().await {
                        self.close().await;
                        return Err(e);
                    }
                    if self.session.close_after_response {
                        ConnectionState::Closed
                    } else {
                        ConnectionState::Idle
                    }
                }

                ConnectionState::Hijacked => return Ok(()),

                ConnectionState::Closed => {
                    self.close().await;
                    return Ok(());
                }
            };
        }
    }

    async fn close(&mut self) {
        if let Some(mut io) = self.session.io.take() {
            let _ = io.shutdown().await;
        }
        self.state = ConnectionState::Closed;
    }

    /// Reads the next request head and arms the per-request state.
    async fn prepare(&mut self) -> Result<Option<RequestHead>, Error> {
        let config = Arc::clone(&self.config);
        let io = self.session.io_mut()?;

        let Some(line) = parser::read_request_line(io, &config.limits).await? else {
            return Ok(None);
        };
        let headers = parser::read_header(io, &config.limits).await?;

        let url = resolve_url(&line.target, &headers, &config.server_name, config.secure)?;
        let host = match absolute_authority(&line.target) {
            Some(authority) => authority.to_string(),
            None => host_header(&headers).unwrap_or(&config.server_name).to_string(),
        };
        let content_length = parse_content_length(&headers)?;
        let version = line.version;

        let expect_continue = headers
            .get(header::EXPECT)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("100-continue"));

        let connection = headers
            .get(header::CONNECTION)
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        let mut close = if version >= Version::HTTP_11 {
            connection == "close"
        } else if version == Version::HTTP_10 && content_length.is_some() {
            connection != "keep-alive"
        } else {
            true
        };
        // Request bodies are only delimited by Content-Length.
        if headers.contains(header::TRANSFER_ENCODING) {
            close = true;
        }

        self.session
            .begin(version, content_length.unwrap_or(0), expect_continue, close);

        Ok(Some(RequestHead {
            method: Method::from_token(&line.method),
            target: line.target,
            host,
            url,
            version,
            headers,
            content_length,
            remote_addr: self.session.remote_addr,
        }))
    }
}

/// Builds the absolute request URL. A target without a host takes the
/// `Host` header, then `server_name`; the scheme follows `secure`.
pub fn resolve_url(
    target: &str,
    headers: &HeaderMap,
    server_name: &str,
    secure: bool,
) -> Result<Url, Error> {
    let scheme = if secure { "https" } else { "http" };

    let mut url = match Url::parse(target) {
        Ok(url) if url.has_host() => url,
        _ => {
            let host = host_header(headers).unwrap_or(server_name);
            Url::parse(&format!("{}://{}/", scheme, host))?.join(target)?
        }
    };

    if url.scheme() != scheme {
        url.set_scheme(scheme).map_err(|_| Error::BadRequestLine)?;
    }
    if !url.has_host() {
        return Err(Error::BadRequestLine);
    }
    Ok(url)
}

fn host_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::HOST)
        .map(str::trim)
        .filter(|h| !h.is_empty())
}

/// Authority of an absolute-form target, as written.
///
/// ```
/// # use tether::http::connection::absolute_authority;
/// assert_eq!(absolute_authority("http://Example.com:80/a?b"), Some("Example.com:80"));
/// assert_eq!(absolute_authority("/a"), None);
/// ```
pub fn absolute_authority(target: &str) -> Option<&str> {
    if target.starts_with('/') {
        return None;
    }
    let (_, rest) = target.split_once("://")?;
    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    Some(&rest[..end]).filter(|a| !a.is_empty())
}

/// Declared request body length. Repeated values must agree.
///
/// A negative length is ignored, leaving the body length unknown; any
/// other non-numeric value is rejected.
pub fn parse_content_length(headers: &HeaderMap) -> Result<Option<u64>, Error> {
    let mut length = None;
    for value in headers.get_all(header::CONTENT_LENGTH) {
        let value = value.trim();
        if let Some(digits) = value.strip_prefix('-') {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
        }
        let n: u64 = value.parse().map_err(|_| Error::InvalidContentLength)?;
        if length.is_some_and(|prev| prev != n) {
            return Err(Error::InvalidContentLength);
        }
        length = Some(n);
    }
    Ok(length)
}
