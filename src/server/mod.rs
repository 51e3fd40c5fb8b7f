//! Accepting connections and handing requests to the application.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::http::{Io, Request};

pub mod listener;

pub use listener::{listen_and_serve, serve, Server};

/// Application entry point, called once per parsed request.
///
/// A handler responds at most once or hijacks the connection. Returning
/// without responding sends an empty `200 OK`.
///
/// ```ignore
/// struct Hello;
///
/// impl Handler for Hello {
///     async fn serve(&self, mut req: Request<'_>) {
///         let _ = req.respond_with(StatusCode::OK, "text/plain", b"hello").await;
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, req: Request<'_>) -> impl Future<Output = ()> + Send;
}

/// Source of accepted connections.
///
/// Implemented for [`TcpListener`]; wrap it to serve TLS or other
/// transports.
pub trait Listener: Send {
    type Io: Io + 'static;

    fn accept(&mut self) -> impl Future<Output = std::io::Result<(Self::Io, SocketAddr)>> + Send;

    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

impl Listener for TcpListener {
    type Io = TcpStream;

    async fn accept(&mut self) -> std::io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}
