use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::{Config, Limits};
use crate::http::connection::{Connection, ConnectionConfig};
use crate::server::{Handler, Listener};

/// Serves HTTP over a listener with one task per connection.
#[derive(Debug, Clone)]
pub struct Server {
    config: ConnectionConfig,
}

impl Server {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            config: ConnectionConfig::new(server_name),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.server.server_name.clone()).limits(cfg.limits)
    }

    /// Marks request URLs as `https`. Does not encrypt anything.
    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Accepts connections until `accept` fails, which is returned.
    ///
    /// Each connection runs in its own task. A handler that panics takes
    /// down only its own connection; the panic is logged here. Connections
    /// still open when the loop ends keep running.
    pub async fn serve<L, H>(&self, mut listener: L, handler: Arc<H>) -> anyhow::Result<()>
    where
        L: Listener,
        H: Handler,
    {
        let config = Arc::new(self.config.clone());
        let mut tasks = JoinSet::new();

        let result = loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => break Err(e).context("accept failed"),
                    };
                    debug!("Accepted connection from {}", peer);

                    let config = Arc::clone(&config);
                    let handler = Arc::clone(&handler);
                    tasks.spawn(async move {
                        let conn = Connection::new(socket, peer, config);
                        if let Err(e) = conn.run(&*handler).await {
                            error!("Connection error from {}: {}", peer, e);
                        }
                    });
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Connection task panicked: {}", e);
                        }
                    }
                }
            }
        };

        tasks.detach_all();
        result
    }
}

/// Serves connections from `listener`, creating a task for each. Returns
/// only when accepting fails.
pub async fn serve<L, H>(
    server_name: &str,
    secure: bool,
    handler: Arc<H>,
    listener: L,
) -> anyhow::Result<()>
where
    L: Listener,
    H: Handler,
{
    Server::new(server_name).secure(secure).serve(listener, handler).await
}

/// Binds a TCP listener on `addr` and serves it without TLS.
pub async fn listen_and_serve<H: Handler>(
    server_name: &str,
    addr: &str,
    handler: Arc<H>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);
    serve(server_name, false, handler, listener).await
}
