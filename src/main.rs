use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tether::config::Config;
use tether::http::{Request, StatusCode};
use tether::server::{Handler, Server};
use tether::websocket;

/// Pages rendered once at startup and shared read-only by every request.
struct Pages {
    by_path: HashMap<&'static str, String>,
}

impl Pages {
    fn build(server_name: &str) -> Self {
        let mut by_path = HashMap::new();
        by_path.insert(
            "/",
            format!(
                "<!DOCTYPE html><html><head><title>{name}</title></head>\
                 <body><h1>{name}</h1><p>Connect a WebSocket to <code>/ws</code> for echo.</p></body></html>",
                name = server_name
            ),
        );
        Self { by_path }
    }
}

struct Demo {
    pages: Pages,
}

impl Demo {
    async fn echo(req: Request<'_>) {
        let peer = req.remote_addr();
        let mut ws = match websocket::upgrade(req).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "websocket upgrade failed");
                return;
            }
        };
        loop {
            match ws.receive().await {
                Ok(msg) => {
                    if let Err(e) = ws.send(&msg).await {
                        tracing::debug!(peer = %peer, error = %e, "websocket send failed");
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "websocket closed");
                    break;
                }
            }
        }
        let _ = ws.close().await;
    }
}

impl Handler for Demo {
    async fn serve(&self, mut req: Request<'_>) {
        if req.url().path() == "/ws" {
            return Self::echo(req).await;
        }

        let result = match self.pages.by_path.get(req.url().path()) {
            Some(page) => {
                req.respond_with(StatusCode::OK, "text/html; charset=utf-8", page.as_bytes())
                    .await
            }
            None => {
                req.respond_with(StatusCode::NOT_FOUND, "text/plain", b"404 Not Found")
                    .await
            }
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "response failed");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let handler = Arc::new(Demo {
        pages: Pages::build(&cfg.server.server_name),
    });

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;
    tracing::info!("Listening on {}", cfg.server.listen_addr);

    let server = Server::from_config(&cfg);

    tokio::select! {
        res = server.serve(listener, handler) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
