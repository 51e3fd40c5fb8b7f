use std::fmt;

use crate::http::header::{self, HeaderMap};
use crate::http::request::Version;

/// HTTP status code.
///
/// Any three-digit code can be sent; the named constants cover the codes
/// with a known reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const CONTINUE: StatusCode = StatusCode(100);
    pub const SWITCHING_PROTOCOLS: StatusCode = StatusCode(101);
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    pub const FOUND: StatusCode = StatusCode(302);
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Standard reason phrase, empty for unknown codes.
    ///
    /// ```
    /// # use tether::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    /// assert_eq!(StatusCode(299).reason_phrase(), "");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Requested Range Not Satisfiable",
            417 => "Expectation Failed",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            _ => "",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// How the response body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Raw bytes, exactly this many, announced by Content-Length.
    Identity(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// Raw bytes until the connection closes.
    CloseDelimited,
}

/// Result of [`decide_framing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingDecision {
    pub framing: Framing,
    pub close_after_response: bool,
}

/// Chooses the response framing and rewrites `headers` to announce it.
///
/// The caller must already have removed any Transfer-Encoding header.
/// In order: 304 carries no body and loses its length and type headers; an
/// explicit Content-Length gives identity framing; a pre-1.1 peer forces
/// close. A closing connection is close-delimited unless a length is
/// known and gets `Connection: close`; otherwise the body is chunked.
pub fn decide_framing(
    status: StatusCode,
    headers: &mut HeaderMap,
    version: Version,
    close_after_response: bool,
) -> FramingDecision {
    let mut close = close_after_response;
    let mut length = None;

    if status == StatusCode::NOT_MODIFIED {
        headers.remove(header::CONTENT_TYPE);
        headers.remove(header::CONTENT_LENGTH);
        length = Some(0);
    } else if let Some(value) = headers.get(header::CONTENT_LENGTH) {
        // An unparsable length counts as zero so any body written becomes a
        // length mismatch and closes the connection.
        length = Some(value.trim().parse().unwrap_or(0));
    } else if version < Version::HTTP_11 {
        close = true;
    }

    if close {
        headers.set(header::CONNECTION, "close");
    }

    let framing = match length {
        Some(n) => Framing::Identity(n),
        None if close => Framing::CloseDelimited,
        None => {
            headers.set(header::TRANSFER_ENCODING, "chunked");
            Framing::Chunked
        }
    };

    FramingDecision {
        framing,
        close_after_response: close,
    }
}
