// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	obs::{self, CacheOutcome, UpstreamOutcome},
	proxy::EndpointCategory,
};

/// Records a cache decision via tracing and the global metrics recorder (when enabled).
pub fn record_cache_outcome(category: EndpointCategory, outcome: CacheOutcome) {
	obs::trace_cache_outcome(category, outcome);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"weather_proxy_cache_total",
			"category" => category.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
}

/// Records that an upstream body was cached for `ttl`.
pub fn record_cache_store(category: EndpointCategory, ttl: Duration) {
	obs::trace_cache_store(category, ttl);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"weather_proxy_cache_total",
			"category" => category.as_str(),
			"outcome" => CacheOutcome::Stored.as_str()
		)
		.increment(1);
	}
}

/// Records an upstream answer (any status).
pub fn record_upstream_outcome(
	category: EndpointCategory,
	outcome: UpstreamOutcome,
	status: StatusCode,
) {
	obs::trace_upstream(category, outcome, Some(status), None);
	increment_upstream(category, outcome);
}

/// Records an upstream call that produced no usable answer.
pub fn record_upstream_failure(category: EndpointCategory, error: &Error) {
	obs::trace_upstream(category, UpstreamOutcome::Failure, None, Some(error));
	increment_upstream(category, UpstreamOutcome::Failure);
}

/// Records one background sweep.
pub fn record_sweep(removed: usize, remaining: usize) {
	obs::trace_sweep(removed, remaining);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!("weather_proxy_cache_swept_total").increment(removed as u64);
		metrics::gauge!("weather_proxy_cache_entries").set(remaining as f64);
	}
}

fn increment_upstream(category: EndpointCategory, outcome: UpstreamOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"weather_proxy_upstream_total",
			"category" => category.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (category, outcome);
	}
}
