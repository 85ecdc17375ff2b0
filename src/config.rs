//! Process configuration sourced from CLI flags with environment fallbacks.

// std
use std::{net::SocketAddr, path::PathBuf, time::Duration as StdDuration};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	proxy::{DEFAULT_ROUTE_PREFIX, DEFAULT_UPSTREAM_BASE},
};

/// Environment variable naming the credentials file.
pub const CREDENTIALS_ENV: &str = "WEATHER_PROXY_CREDENTIALS";

/// Runtime settings for the proxy server.
#[derive(Clone, Debug, Parser)]
#[command(name = "weather-proxy", version, about = "Caching reverse proxy for a weather API.")]
pub struct ProxyConfig {
	/// Port to listen on.
	#[arg(long, env = "PORT", default_value_t = 8080)]
	pub port: u16,
	/// API key callers must send in `X-API-Key`.
	#[arg(long, env = "PROXY_API_KEY", hide_env_values = true)]
	pub api_key: Option<String>,
	/// Upstream weather API base URL.
	#[arg(long, env = "WEATHER_PROXY_UPSTREAM", default_value = DEFAULT_UPSTREAM_BASE)]
	pub upstream_base: String,
	/// Routing prefix stripped before forwarding.
	#[arg(long, env = "WEATHER_PROXY_PREFIX", default_value = DEFAULT_ROUTE_PREFIX)]
	pub route_prefix: String,
	/// JSON `client_credentials` file (`client_id`, `client_secret`, `token_uri`) for the
	/// upstream token endpoint.
	#[arg(long, env = CREDENTIALS_ENV)]
	pub credentials_file: Option<PathBuf>,
	/// Seconds between cache sweeps.
	#[arg(long, env = "WEATHER_PROXY_SWEEP_SECS", default_value_t = 300)]
	pub sweep_interval_secs: u64,
	/// Seconds before an upstream call is abandoned.
	#[arg(long, env = "WEATHER_PROXY_TIMEOUT_SECS", default_value_t = 30)]
	pub upstream_timeout_secs: u64,
}
impl ProxyConfig {
	/// Address the listener binds to.
	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::from(([0, 0, 0, 0], self.port))
	}

	/// Parsed upstream base URL.
	pub fn upstream_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.upstream_base).map_err(|source| ConfigError::InvalidUpstreamBase { source })
	}

	/// Interval between cache sweeps; zero is bumped to one second.
	pub fn sweep_interval(&self) -> StdDuration {
		StdDuration::from_secs(self.sweep_interval_secs.max(1))
	}

	/// Client-level timeout for upstream calls.
	pub fn upstream_timeout(&self) -> StdDuration {
		StdDuration::from_secs(self.upstream_timeout_secs)
	}

	/// Configured API key, ignoring an empty value.
	pub fn api_key(&self) -> Option<&str> {
		self.api_key.as_deref().filter(|key| !key.is_empty())
	}
}
