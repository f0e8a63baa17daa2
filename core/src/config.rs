//! Client configuration.
//!
//! `ClientConfig` can be built in code, deserialized from a host
//! application's config file, or read from `BANGUMI_*` environment
//! variables.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_HOST: &str = "https://api.bgm.tv";
pub const DEFAULT_USER_AGENT: &str = concat!("bangumi-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Free-form label of the calling component, used in log events.
    pub caller: String,
    /// Base URL, e.g. `https://api.bgm.tv`.
    pub host: String,
    pub proxy: Option<String>,
    /// Maximum number of requests in flight; `None` means unbounded.
    pub max_concurrency: Option<usize>,
    /// Reject every call without touching the network.
    pub skip: bool,
    pub user_agent: String,
    #[serde(with = "duration_secs")]
    pub timeout: Option<Duration>,
    /// Total tries per request on transport failure.
    pub attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            caller: String::new(),
            host: DEFAULT_HOST.to_string(),
            proxy: None,
            max_concurrency: None,
            skip: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(30)),
            attempts: 1,
        }
    }
}

impl ClientConfig {
    /// Config bound to one host and proxy. An empty proxy means none.
    pub fn new(caller: &str, host: &str, proxy: &str) -> Self {
        Self {
            caller: caller.to_string(),
            host: host.to_string(),
            proxy: (!proxy.is_empty()).then(|| proxy.to_string()),
            ..Self::default()
        }
    }

    /// Read `BANGUMI_*` variables on top of the defaults. Unparseable
    /// numbers and booleans are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup("BANGUMI_HOST").filter(|v| !v.is_empty()) {
            config.host = host;
        }
        config.proxy = lookup("BANGUMI_PROXY").filter(|v| !v.is_empty());
        if let Some(caller) = lookup("BANGUMI_CALLER") {
            config.caller = caller;
        }
        if let Some(n) = lookup("BANGUMI_MAX_CONCURRENCY").and_then(|v| v.parse().ok()) {
            config.max_concurrency = Some(n);
        }
        if let Some(skip) = lookup("BANGUMI_SKIP").and_then(|v| parse_bool(&v)) {
            config.skip = skip;
        }
        if let Some(secs) = lookup("BANGUMI_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(attempts) = lookup("BANGUMI_ATTEMPTS").and_then(|v| v.parse().ok()) {
            config.attempts = attempts;
        }
        config
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<u64>::deserialize(d)?;
        Ok(secs.filter(|s| *s > 0).map(Duration::from_secs))
    }
}
