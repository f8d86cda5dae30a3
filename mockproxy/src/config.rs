//! Command line, environment and config file settings
//!
//! Precedence: command line and `MOCKPROXY_*` variables, then the YAML config
//! file, then built-in defaults.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ProxyResult;
use shared::logging::resolve_level;
use shared::{
    ConfigError, EndpointTable, FileConfig, parse_domain, parse_duration, parse_endpoints,
};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A proxy whose purpose is to test the behavior of a web application
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mockproxy")]
#[command(about = "A simple tester proxy: forwards, delays, fails or mocks requests per route")]
pub struct Args {
    /// Upstream domain to proxy to (https is assumed when no scheme is given)
    #[arg(env = "MOCKPROXY_DOMAIN")]
    pub domain: Option<String>,

    /// YAML config file
    #[arg(short, long, env = "MOCKPROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on [default: 8080]
    #[arg(long, env = "MOCKPROXY_PORT")]
    pub port: Option<u16>,

    /// Skip TLS verification towards the upstream
    #[arg(long, env = "MOCKPROXY_INSECURE")]
    pub insecure: bool,

    /// Enable debug logging, including request/response dumps
    #[arg(long, env = "MOCKPROXY_DEBUG")]
    pub debug: bool,

    /// Enable info logging
    #[arg(long, env = "MOCKPROXY_VERBOSE")]
    pub verbose: bool,

    /// Use terminal colors
    #[arg(long, value_name = "BOOL", env = "MOCKPROXY_COLORS")]
    pub colors: Option<bool>,

    /// Log level (trace, debug, info, warn, error); overrides --debug and --verbose
    #[arg(long, env = "MOCKPROXY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Raw YAML endpoints configuration; replaces the file's endpoints
    #[arg(long, env = "MOCKPROXY_ENDPOINTS")]
    pub endpoints: Option<String>,

    /// How long in-flight requests may drain on shutdown [default: 5s]
    #[arg(long, env = "MOCKPROXY_DRAIN_TIMEOUT", value_parser = parse_duration)]
    pub drain_timeout: Option<Duration>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub upstream: Url,
    pub port: u16,
    pub insecure: bool,
    pub log_level: String,
    pub colors: bool,
    pub drain_timeout: Duration,
    pub endpoints: EndpointTable,
}

impl Settings {
    /// Load the config file named by `args` (if any) and merge
    pub fn resolve(args: Args) -> ProxyResult<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: Args, file: FileConfig) -> ProxyResult<Self> {
        let domain = args
            .domain
            .or(file.domain)
            .ok_or(ConfigError::MissingDomain)?;
        let upstream = parse_domain(&domain)?;

        let endpoints = match args.endpoints.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_endpoints(raw)?,
            _ => file.endpoints.unwrap_or_default(),
        };

        let drain_timeout = match (args.drain_timeout, file.drain_timeout) {
            (Some(timeout), _) => timeout,
            (None, Some(value)) => value.to_duration().map_err(|reason| {
                ConfigError::InvalidDuration {
                    field: "drain_timeout".to_string(),
                    reason,
                }
            })?,
            (None, None) => DEFAULT_DRAIN_TIMEOUT,
        };

        let explicit_level = args.log_level.or(file.log_level);
        let log_level = resolve_level(
            explicit_level.as_deref(),
            args.debug || file.debug.unwrap_or(false),
            args.verbose || file.verbose.unwrap_or(false),
        )
        .to_string();

        Ok(Self {
            upstream,
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            insecure: args.insecure || file.insecure.unwrap_or(false),
            log_level,
            colors: args.colors.or(file.colors).unwrap_or(true),
            drain_timeout,
            endpoints,
        })
    }

    /// Listen on every interface
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
