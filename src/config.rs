//! Server configuration.
//!
//! Values come from an optional YAML file named by `TETHER_CONFIG`, then
//! from the `LISTEN` and `SERVER_NAME` environment variables, which win.

use anyhow::Context;
use serde::Deserialize;

/// Default header size limits.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;
pub const DEFAULT_MAX_VALUE_LEN: usize = 4096;
pub const DEFAULT_MAX_HEADERS: usize = 256;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Host used for request URLs when neither the target nor a `Host`
    /// header names one.
    pub server_name: String,
}

/// Size limits enforced while parsing a request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Longest request line or header line, terminator excluded.
    pub max_line_len: usize,
    /// Longest header value, including folded continuation lines.
    pub max_value_len: usize,
    /// Most header lines accepted per request.
    pub max_headers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            server_name: "localhost".to_string(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            max_headers: DEFAULT_MAX_HEADERS,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("TETHER_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }
        if let Ok(server_name) = std::env::var("SERVER_NAME") {
            cfg.server.server_name = server_name;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("invalid config file {}", path))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        if cfg.limits.max_line_len == 0 || cfg.limits.max_value_len == 0 {
            anyhow::bail!("header size limits must be non-zero");
        }
        Ok(cfg)
    }
}
