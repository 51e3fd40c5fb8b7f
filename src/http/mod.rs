//! HTTP/1.x protocol engine.
//!
//! This module owns everything between the raw socket and the application
//! handler: parsing request heads, bounding request bodies, choosing the
//! response framing and driving keep-alive.
//!
//! # Architecture
//!
//! - **`parser`**: reads the request line and header block under size limits
//! - **`header`**: canonical, multi-valued header mapping
//! - **`request`**: the request value handed to handlers, with its responder
//! - **`body`**: request body reader bounded by Content-Length
//! - **`response`**: status codes and the response framing decision
//! - **`writer`**: renders the response head and frames body bytes
//! - **`connection`**: the per-connection keep-alive state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← Parse the next request head
//!        └──────┬──────┘
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatched     │ ← Handler runs, may respond or hijack
//!        └──────┬───────────┘
//!               │
//!               ├─ Hijacked → socket handed to the handler, session ends
//!               ▼
//!        ┌──────────────────┐
//!        │   Responded      │ ← Finalize framing, flush
//!        └──────┬───────────┘
//!               ├─ Keep-Alive → Idle (same connection)
//!               └─ Close → Closed
//! ```

use std::io;

pub mod body;
pub mod connection;
pub mod header;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use connection::{BoxedIo, Connection, Hijacked, Io};
pub use header::HeaderMap;
pub use request::{Method, Request, Version};
pub use response::StatusCode;
pub use writer::ResponseBody;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not parse request line")]
    BadRequestLine,

    #[error("request line or header line too long")]
    LineTooLong,

    #[error("could not parse header line")]
    BadHeaderLine,

    #[error("header value too long")]
    HeaderTooLong,

    #[error("too many headers")]
    TooManyHeaders,

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("invalid Content-Length")]
    InvalidContentLength,

    #[error("invalid request target: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("response already started")]
    AlreadyResponded,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
