use std::env;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::SdkError;

pub const DEFAULT_RPC_ADDRESS: &str = "http://localhost:20336";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

const ADDRESSES_VAR: &str = "DNA_RPC_ADDRESSES";
const TIMEOUT_VAR: &str = "DNA_RPC_TIMEOUT_SECS";
const POLL_INTERVAL_VAR: &str = "DNA_RPC_POLL_INTERVAL_MS";

/// Connection settings for [`crate::rpc::RpcClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    /// Node endpoints, tried in order until one is reachable.
    pub addresses: Vec<String>,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            addresses: vec![DEFAULT_RPC_ADDRESS.to_string()],
            timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl RpcConfig {
    pub fn from_env() -> Result<Self, SdkError> {
        let addresses = parse_addresses(&env_var_or_default(ADDRESSES_VAR, DEFAULT_RPC_ADDRESS));
        let timeout_secs = parse_u64_env(TIMEOUT_VAR, DEFAULT_RPC_TIMEOUT_SECS)?;
        let poll_interval_ms = parse_u64_env(POLL_INTERVAL_VAR, DEFAULT_POLL_INTERVAL_MS)?;

        Ok(Self {
            addresses,
            timeout_secs,
            poll_interval_ms,
        })
    }

    /// Replace the endpoint list with a `;`-separated address string.
    #[must_use]
    pub fn with_addresses(mut self, addresses: &str) -> Self {
        self.addresses = parse_addresses(addresses);
        self
    }

    pub fn validate(&self) -> Result<(), SdkError> {
        if self.addresses.is_empty() {
            return Err(SdkError::Config(format!(
                "{ADDRESSES_VAR} must list at least one address"
            )));
        }

        for address in &self.addresses {
            let url = Url::parse(address).map_err(|e| {
                SdkError::Config(format!("rpc address '{address}' is not a valid URL: {e}"))
            })?;

            match url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(SdkError::Config(format!(
                        "rpc address '{address}' scheme must be http or https; got '{other}'"
                    )));
                }
            }

            if url.host_str().is_none() {
                return Err(SdkError::Config(format!(
                    "rpc address '{address}' must include a host"
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(SdkError::Config(format!("{TIMEOUT_VAR} must be > 0")));
        }

        if self.poll_interval_ms == 0 {
            return Err(SdkError::Config(format!("{POLL_INTERVAL_VAR} must be > 0")));
        }

        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The endpoint tried first.
    #[must_use]
    pub fn primary_address(&self) -> &str {
        self.addresses
            .first()
            .map_or(DEFAULT_RPC_ADDRESS, String::as_str)
    }
}

fn parse_addresses(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn env_var_or_default(key: &str, default_value: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_value.to_string())
}

fn parse_u64_env(key: &str, default_value: u64) -> Result<u64, SdkError> {
    let raw = env_var_or_default(key, &default_value.to_string());
    u64::from_str(raw.trim())
        .map_err(|_| SdkError::Config(format!("{key} must be a valid u64 integer")))
}
