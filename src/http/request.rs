use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::http::connection::{Hijacked, Session};
use crate::http::header::{self, HeaderMap};
use crate::http::response::StatusCode;
use crate::http::writer::ResponseBody;
use crate::http::Error;

/// HTTP request methods.
///
/// The common verbs get their own variant; any other token is carried
/// verbatim in `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
    Extension(String),
}

impl Method {
    /// Maps a request-line token to a method. Matching is case-sensitive.
    ///
    /// ```
    /// # use tether::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Method::GET);
    /// assert_eq!(Method::from_token("get"), Method::Extension("get".into()));
    /// ```
    pub fn from_token(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Extension(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Extension(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version as an ordered `(major, minor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const HTTP_10: Version = Version::new(1, 0);
    pub const HTTP_11: Version = Version::new(1, 1);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Everything parsed from a request head.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    /// Request target exactly as sent on the request line.
    pub target: String,
    /// Authority as received: from an absolute target, else the `Host`
    /// header, else the configured server name.
    pub host: String,
    /// Absolute URL; the scheme reflects the listener's secure flag.
    pub url: Url,
    pub version: Version,
    pub headers: HeaderMap,
    /// Declared body length, `None` when absent.
    pub content_length: Option<u64>,
    pub remote_addr: SocketAddr,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

/// A parsed request bound to the connection it arrived on.
///
/// The request is valid for one turn of the keep-alive loop. It carries
/// the capability to read the body, to respond once, or to take over the
/// socket with [`Request::hijack`].
pub struct Request<'a> {
    head: RequestHead,
    session: &'a mut Session,
}

impl<'a> Request<'a> {
    pub(crate) fn new(head: RequestHead, session: &'a mut Session) -> Self {
        Self { head, session }
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn url(&self) -> &Url {
        &self.head.url
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.head.remote_addr
    }

    /// Reads request body bytes into `buf`. Returns `Ok(0)` once the
    /// declared Content-Length has been consumed.
    pub async fn read_body(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.session.read_body(buf).await
    }

    pub async fn read_body_to_end(&mut self) -> std::io::Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = self.read_body(&mut chunk).await?;
            if n == 0 {
                return Ok(body);
            }
            body.extend_from_slice(&chunk[..n]);
        }
    }

    /// Starts the response: writes the status line and headers and returns
    /// the body sink. A second call fails with [`Error::AlreadyResponded`]
    /// and leaves the first response untouched.
    pub async fn respond(
        &mut self,
        status: StatusCode,
        headers: HeaderMap,
    ) -> Result<ResponseBody<'_>, Error> {
        self.session.respond(status, headers).await
    }

    /// Responds with a complete body and a matching Content-Length.
    pub async fn respond_with(
        &mut self,
        status: StatusCode,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), Error> {
        let mut headers = HeaderMap::new();
        headers.set(header::CONTENT_TYPE, content_type);
        headers.set(header::CONTENT_LENGTH, body.len().to_string());
        let mut sink = self.respond(status, headers).await?;
        sink.write(body).await?;
        Ok(())
    }

    /// Takes the raw connection away from the HTTP engine.
    ///
    /// Fails with [`Error::AlreadyResponded`] once a response has started.
    /// On success the session ends without closing the socket; bytes
    /// already read off the wire are returned in [`Hijacked::buffered`].
    pub fn hijack(self) -> Result<Hijacked, Error> {
        self.session.hijack()
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request").field("head", &self.head).finish_non_exhaustive()
    }
}
