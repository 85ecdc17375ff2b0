//! Endpoint classification, TTL policy, and cache key derivation.

// self
use crate::_prelude::*;

/// Upstream endpoint family used to pick a cache TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
	/// Current conditions.
	Current,
	/// Hourly or daily forecasts.
	Forecast,
	/// Weather alerts.
	Alerts,
	/// Anything else.
	Unknown,
}
impl EndpointCategory {
	/// Classifies an upstream path; the first matching marker wins.
	pub fn classify(path: &str) -> Self {
		if path.contains("/current") {
			Self::Current
		} else if path.contains("/forecast") {
			Self::Forecast
		} else if path.contains("/alerts") {
			Self::Alerts
		} else {
			Self::Unknown
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Current => "current",
			Self::Forecast => "forecast",
			Self::Alerts => "alerts",
			Self::Unknown => "unknown",
		}
	}
}
impl Display for EndpointCategory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cache lifetime per [`EndpointCategory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlPolicy {
	/// TTL for current conditions.
	pub current: Duration,
	/// TTL for forecasts.
	pub forecast: Duration,
	/// TTL for alerts.
	pub alerts: Duration,
	/// TTL for unclassified endpoints.
	pub unknown: Duration,
}
impl TtlPolicy {
	/// TTL applied to responses of `category`.
	pub const fn ttl_for(&self, category: EndpointCategory) -> Duration {
		match category {
			EndpointCategory::Current => self.current,
			EndpointCategory::Forecast => self.forecast,
			EndpointCategory::Alerts => self.alerts,
			EndpointCategory::Unknown => self.unknown,
		}
	}
}
impl Default for TtlPolicy {
	fn default() -> Self {
		Self {
			current: Duration::minutes(15),
			forecast: Duration::hours(1),
			alerts: Duration::minutes(5),
			unknown: Duration::minutes(5),
		}
	}
}

/// Cache key for an upstream path and its raw query string.
///
/// The query is used verbatim, so parameter order matters, and the `?` separator is kept
/// even when the query is empty.
pub fn cache_key(upstream_path: &str, raw_query: &str) -> String {
	let mut key = String::with_capacity(upstream_path.len() + raw_query.len() + 1);

	key.push_str(upstream_path);
	key.push('?');
	key.push_str(raw_query);

	key
}
