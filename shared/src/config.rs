//! Raw configuration model
//!
//! These are the shapes found in the YAML config file and the `--endpoints`
//! flag. They carry no behaviour; the proxy validates them into its own rule
//! types at startup.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::errors::{ConfigError, ConfigResult};

/// Route path to endpoint definition, ordered for stable startup logs
pub type EndpointTable = BTreeMap<String, EndpointConfig>;

/// Everything that can be configured for one route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    /// Mock response returned instead of forwarding
    #[serde(default)]
    pub response: Option<ResponseConfig>,

    /// Latency range applied before anything else
    #[serde(default)]
    pub delay: Option<DelayConfig>,

    /// Simulated failures
    #[serde(default)]
    pub error: Option<ErrorConfig>,
}

/// Canned HTTP answer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseConfig {
    #[serde(default, rename = "contenttype", alias = "content_type")]
    pub content_type: Option<String>,

    /// 0 or missing lets the caller pick the status
    #[serde(default, alias = "statuscode")]
    pub status: Option<u16>,

    #[serde(default)]
    pub body: Option<String>,
}

/// Error injection block
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorConfig {
    /// Probability in [0, 1]
    #[serde(default)]
    pub chance: Option<f64>,

    #[serde(default)]
    pub every: Option<EveryConfig>,

    #[serde(default)]
    pub response: Option<ResponseConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EveryConfig {
    pub nth: u32,

    #[serde(default = "default_amount")]
    pub amount: u32,
}

fn default_amount() -> u32 {
    1
}

/// `[lower, upper]` pair, e.g. `["100ms", "2s"]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayConfig {
    pub lower: Duration,
    pub upper: Duration,
}

impl<'de> Deserialize<'de> for DelayConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<DurationValue>::deserialize(deserializer)?;
        if values.len() != 2 {
            return Err(de::Error::invalid_length(values.len(), &"a [lower, upper] pair"));
        }
        let lower = values[0].to_duration().map_err(de::Error::custom)?;
        let upper = values[1].to_duration().map_err(de::Error::custom)?;
        Ok(DelayConfig { lower, upper })
    }
}

/// A duration written either as text (`"1.5s"`, `"150ms"`) or as bare milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Millis(u64),
    Text(String),
}

impl DurationValue {
    pub fn to_duration(&self) -> Result<Duration, String> {
        match self {
            DurationValue::Millis(ms) => Ok(Duration::from_millis(*ms)),
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}

/// Parse a human readable duration such as `5s` or `250ms`
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    humantime::parse_duration(text.trim()).map_err(|e| format!("invalid duration {text:?}: {e}"))
}

/// Parse a raw YAML mapping of route path to endpoint definition
pub fn parse_endpoints(raw: &str) -> ConfigResult<EndpointTable> {
    if raw.trim().is_empty() {
        return Ok(EndpointTable::new());
    }
    Ok(serde_yaml::from_str(raw)?)
}

/// Upstream domain to URL; `https` is assumed when no scheme is given
pub fn parse_domain(domain: &str) -> ConfigResult<Url> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ConfigError::MissingDomain);
    }

    let with_scheme = if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| ConfigError::InvalidDomain {
        domain: domain.to_string(),
        reason: e.to_string(),
    })?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ConfigError::InvalidDomain {
            domain: domain.to_string(),
            reason: "missing host".to_string(),
        }),
    }
}

/// Contents of the optional YAML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub insecure: Option<bool>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub colors: Option<bool>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub drain_timeout: Option<DurationValue>,
    #[serde(default)]
    pub endpoints: Option<EndpointTable>,
}

impl FileConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> ConfigResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}
