//! Legacy WebSocket handshake and text framing.
//!
//! Implements the key-challenge opening handshake that predates RFC 6455:
//! two `Sec-WebSocket-Key` headers and an 8-byte nonce produce an MD5
//! digest sent back after the `101` head. Messages are framed as `0x00`,
//! payload, `0xFF`.
//!
//! # Data Flow
//! ```text
//! Handler ── hijack ──→ upgrade() ── handshake ──→ WebSocket (send / receive)
//! ```

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter, WriteHalf};

use crate::http::parser::{self, Segment};
use crate::http::BoxedIo;

mod handshake;

pub use handshake::{challenge_response, key_number, upgrade};

pub const DEFAULT_MAX_MESSAGE_LEN: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("hijack failed: {0}")]
    Hijack(#[source] crate::http::Error),

    #[error("bad request method")]
    BadMethod,

    #[error("origin missing")]
    MissingOrigin,

    #[error("connection header missing or wrong value")]
    BadConnection,

    #[error("upgrade header missing or wrong value")]
    BadUpgrade,

    #[error("missing key header {0}")]
    MissingKey(&'static str),

    #[error("bad key header {0}")]
    BadKey(&'static str),

    #[error("unexpected frame type {0:#04x}")]
    UnexpectedFraming(u8),

    #[error("message exceeds {0} bytes")]
    MessageTooLong(usize),

    #[error("connection closed mid-message")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Reader that replays bytes the HTTP layer had already buffered before
/// continuing with the socket.
pub(crate) type ReplayReader = BufReader<Box<dyn AsyncRead + Unpin + Send>>;

/// An upgraded connection exchanging text-framed messages.
pub struct WebSocket {
    reader: ReplayReader,
    writer: BufWriter<WriteHalf<BoxedIo>>,
    max_message_len: usize,
}

impl WebSocket {
    pub(crate) fn new(reader: ReplayReader, writer: BufWriter<WriteHalf<BoxedIo>>) -> Self {
        Self {
            reader,
            writer,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }

    pub fn set_max_message_len(&mut self, max: usize) {
        self.max_message_len = max;
    }

    /// Sends one message. The payload must not contain `0xFF`; this
    /// framing has no escape for it.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.writer.write_u8(0x00).await?;
        self.writer.write_all(payload).await?;
        self.writer.write_u8(0xFF).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receives one message, without its framing bytes. Only text frames
    /// are supported.
    pub async fn receive(&mut self) -> Result<Vec<u8>, Error> {
        let frame_type = match self.reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(Error::UnexpectedEof),
            Err(e) => return Err(e.into()),
        };
        if frame_type != 0x00 {
            return Err(Error::UnexpectedFraming(frame_type));
        }

        match parser::read_segment(&mut self.reader, 0xFF, self.max_message_len).await? {
            Segment::Complete(payload) => Ok(payload),
            Segment::TooLong => Err(Error::MessageTooLong(self.max_message_len)),
            Segment::Eof | Segment::Truncated => Err(Error::UnexpectedEof),
        }
    }

    /// Shuts down the write side and drops the connection.
    pub async fn close(mut self) -> Result<(), Error> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
