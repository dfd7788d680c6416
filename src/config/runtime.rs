use serde::Deserialize;

/// Default runtime endpoint.
pub const DEFAULT_RUNTIME_ENDPOINT: &str = "http://localhost:50053";

/// Runtime connection configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// `host:port`, `http(s)://host:port`, or a Unix socket path (`/…` or `./…`).
    pub endpoint: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RUNTIME_ENDPOINT.to_string(),
        }
    }
}
