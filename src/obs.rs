//! Optional observability helpers for the proxy pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `weather_proxy.request` with the `category` and
//!   `stage` fields, plus events for cache hits, misses, stores, sweeps, and upstream failures.
//! - Enable `metrics` to increment `weather_proxy_cache_total` (labeled by `category` +
//!   `outcome`) and `weather_proxy_upstream_total` (labeled by `category` + `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Cache decisions recorded per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
	/// Served from the cache.
	Hit,
	/// Not in the cache; the upstream is called.
	Miss,
	/// Upstream 200 body written to the cache.
	Stored,
	/// Upstream answered with a non-200 status; nothing cached.
	Bypassed,
}
impl CacheOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheOutcome::Hit => "hit",
			CacheOutcome::Miss => "miss",
			CacheOutcome::Stored => "stored",
			CacheOutcome::Bypassed => "bypassed",
		}
	}
}
impl Display for CacheOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Upstream call results recorded per miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpstreamOutcome {
	/// Upstream answered 200.
	Success,
	/// Upstream answered with any other status.
	NonSuccess,
	/// No usable answer (credential, transport, or body failure).
	Failure,
}
impl UpstreamOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			UpstreamOutcome::Success => "success",
			UpstreamOutcome::NonSuccess => "non_success",
			UpstreamOutcome::Failure => "failure",
		}
	}
}
impl Display for UpstreamOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
