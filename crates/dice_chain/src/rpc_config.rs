use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default gateway of a locally running deployment toolkit.
pub const DEFAULT_RPC_URL: &str = "http://localhost:42069/rpc";

/// Default per-request timeout of the gateway client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint of the toolkit gateway that signs and broadcasts messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl RpcConfig {
    /// Build a config, rejecting URLs that are not http(s) or a zero timeout.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let url = url.into();
        if !validate_url(&url) {
            anyhow::bail!("invalid RPC URL: {url}");
        }
        if timeout_secs == 0 {
            anyhow::bail!("RPC timeout must be at least one second");
        }
        Ok(Self { url, timeout_secs })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
