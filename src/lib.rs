//! Tether - HTTP/1.x server engine
//!
//! Core library: the connection state machine, request parsing, response
//! framing, connection hijacking and the legacy WebSocket upgrade built on it.

pub mod config;
pub mod http;
pub mod server;
pub mod testing;
pub mod websocket;
