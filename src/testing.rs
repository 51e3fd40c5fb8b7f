//! Helpers for driving a handler without a network.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::http::connection::{Connection, ConnectionConfig};
use crate::server::Handler;

/// Address reported as the peer of in-memory connections.
pub fn test_peer() -> SocketAddr {
    SocketAddr::from(([1, 2, 3, 4], 5678))
}

/// Runs one connection over an in-memory pipe.
///
/// Writes `input` as the client, half-closes the client side and returns
/// everything the server wrote before closing. Keep-alive sessions end
/// when the server reads the half-close.
pub async fn exchange<H: Handler>(handler: Arc<H>, input: &[u8]) -> Vec<u8> {
    exchange_with(ConnectionConfig::new("localhost"), handler, input).await
}

pub async fn exchange_with<H: Handler>(
    config: ConnectionConfig,
    handler: Arc<H>,
    input: &[u8],
) -> Vec<u8> {
    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let peer = test_peer();

    let config = Arc::new(config);
    let task = tokio::spawn(async move {
        let conn = Connection::new(server, peer, config);
        let _ = conn.run(&*handler).await;
    });

    // The server may close before reading all of `input`; whatever it
    // wrote is still collected.
    let mut output = Vec::new();
    let _ = client.write_all(input).await;
    let _ = client.shutdown().await;
    let _ = client.read_to_end(&mut output).await;
    let _ = task.await;
    output
}
