//! Request body reader bounded by Content-Length.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Terminal state of one direction of a connection.
///
/// Once a stream leaves `Open` every later call sees the same outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    /// Clean end of data.
    Eof,
    /// No longer usable, e.g. the request body after a response started.
    Closed,
    Failed(io::ErrorKind),
}

impl StreamState {
    /// `Ok(true)` while open, `Ok(false)` at a clean end, an error otherwise.
    pub fn check(&self) -> io::Result<bool> {
        match self {
            StreamState::Open => Ok(true),
            StreamState::Eof => Ok(false),
            StreamState::Closed => Err(io::Error::other("stream closed")),
            StreamState::Failed(kind) => Err(io::Error::from(*kind)),
        }
    }

    pub fn record(&mut self, err: &io::Error) {
        *self = StreamState::Failed(err.kind());
    }
}

/// Read side of one request body.
///
/// Never reads past the declared length, so bytes of a pipelined next
/// request stay in the connection buffer.
#[derive(Debug)]
pub struct BodyReader {
    remaining: u64,
    continue_pending: bool,
    state: StreamState,
}

impl BodyReader {
    pub fn new(content_length: u64, expect_continue: bool) -> Self {
        Self {
            remaining: content_length,
            continue_pending: expect_continue,
            state: StreamState::Open,
        }
    }

    /// Declared body bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Makes every later read fail. Failures already recorded are kept.
    pub fn close(&mut self) {
        if !matches!(self.state, StreamState::Failed(_)) {
            self.state = StreamState::Closed;
        }
    }

    /// Reads body bytes from `io` into `buf`.
    ///
    /// The first call sends the deferred `100 Continue` if the client asked
    /// for one.
    pub async fn read<S>(&mut self, io: &mut S, buf: &mut [u8]) -> io::Result<usize>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.state.check()? {
            return Ok(0);
        }

        if self.continue_pending {
            self.continue_pending = false;
            let sent = match io.write_all(CONTINUE_RESPONSE).await {
                Ok(()) => io.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                self.state.record(&e);
                return Err(e);
            }
        }

        if self.remaining == 0 {
            self.state = StreamState::Eof;
            return Ok(0);
        }

        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        if max == 0 {
            return Ok(0);
        }

        match io.read(&mut buf[..max]).await {
            Ok(0) => {
                let err = io::Error::from(io::ErrorKind::UnexpectedEof);
                self.state.record(&err);
                Err(err)
            }
            Ok(n) => {
                self.remaining -= n as u64;
                Ok(n)
            }
            Err(e) => {
                self.state.record(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_at_declared_length() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"helloGET / HTTP/1.1\r\n").await.unwrap();

        let mut body = BodyReader::new(5, false);
        let mut buf = [0u8; 64];
        let mut got = Vec::new();
        loop {
            let n = body.read(&mut server, &mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, b"hello");
        assert_eq!(body.state(), StreamState::Eof);

        // End of body is sticky.
        assert_eq!(body.read(&mut server, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sends_continue_once() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(b"ab").await.unwrap();

        let mut body = BodyReader::new(2, true);
        let mut buf = [0u8; 1];
        body.read(&mut server, &mut buf).await.unwrap();
        body.read(&mut server, &mut buf).await.unwrap();
        drop(server);

        let mut written = Vec::new();
        client.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, CONTINUE_RESPONSE);
    }

    #[tokio::test]
    async fn closed_body_rejects_reads() {
        let (_client, mut server) = tokio::io::duplex(64);
        let mut body = BodyReader::new(3, false);
        body.close();
        let mut buf = [0u8; 4];
        assert!(body.read(&mut server, &mut buf).await.is_err());
    }
}
