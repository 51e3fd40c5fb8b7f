use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use tether::http::{Request, StatusCode};
use tether::server::{Handler, Listener, Server};

/// Answers with the request URL, or panics on `/panic`.
struct UrlOrPanic;

impl Handler for UrlOrPanic {
    async fn serve(&self, mut req: Request<'_>) {
        if req.url().path() == "/panic" {
            panic!("handler failure");
        }
        let body = req.url().to_string();
        let _ = req
            .respond_with(StatusCode::OK, "text/plain", body.as_bytes())
            .await;
    }
}

async fn roundtrip(stream: &mut TcpStream, request: &[u8]) -> String {
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    let _ = timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server closed the connection");
    String::from_utf8_lossy(&out).into_owned()
}

#[tokio::test]
async fn test_tcp_listener_serves_requests() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        Server::new("localhost")
            .serve(listener, Arc::new(UrlOrPanic))
            .await
    });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let out = roundtrip(
        &mut stream,
        b"GET /hello HTTP/1.1\r\nHost: tether.test\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("\r\n\r\nhttp://tether.test/hello"));

    server.abort();
}

#[tokio::test]
async fn test_handler_panic_is_isolated() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        Server::new("localhost")
            .serve(listener, Arc::new(UrlOrPanic))
            .await
    });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let out = roundtrip(&mut stream, b"GET /panic HTTP/1.1\r\nHost: h\r\n\r\n").await;
    assert!(out.is_empty());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let out = roundtrip(&mut stream, b"GET /ok HTTP/1.1\r\nHost: h\r\nConnection: close\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(!server.is_finished());

    server.abort();
}

/// Hands out in-memory connections pushed through a channel.
struct ChannelListener {
    rx: mpsc::Receiver<DuplexStream>,
}

impl Listener for ChannelListener {
    type Io = DuplexStream;

    async fn accept(&mut self) -> io::Result<(DuplexStream, SocketAddr)> {
        match self.rx.recv().await {
            Some(stream) => Ok((stream, SocketAddr::from(([10, 0, 0, 1], 4000)))),
            None => Err(io::Error::new(io::ErrorKind::ConnectionAborted, "listener closed")),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([10, 0, 0, 254], 443)))
    }
}

#[tokio::test]
async fn test_custom_listener_secure_and_accept_failure() {
    let (tx, rx) = mpsc::channel(4);
    let server = tokio::spawn(async move {
        Server::new("secure.test")
            .secure(true)
            .serve(ChannelListener { rx }, Arc::new(UrlOrPanic))
            .await
    });

    let (mut client, remote) = tokio::io::duplex(4096);
    tx.send(remote).await.unwrap();
    client
        .write_all(b"GET /s HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut out = Vec::new();
    timeout(Duration::from_secs(5), client.read_to_end(&mut out))
        .await
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&out).ends_with("\r\n\r\nhttps://secure.test/s"));

    // Closing the channel makes accept fail, which ends the loop.
    drop(tx);
    let result = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(result.is_err());
}
