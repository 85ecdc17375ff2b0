// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	obs::{CacheOutcome, UpstreamOutcome},
	proxy::EndpointCategory,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by the forwarding engine.
#[derive(Clone, Debug)]
pub struct ProxySpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl ProxySpan {
	/// Creates a new span tagged with the endpoint category + stage.
	pub fn new(category: EndpointCategory, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("weather_proxy.request", category = category.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (category, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn trace_cache_outcome(category: EndpointCategory, outcome: CacheOutcome) {
	#[cfg(feature = "tracing")]
	match outcome {
		CacheOutcome::Hit => tracing::info!(%category, "Cache hit."),
		CacheOutcome::Miss => tracing::info!(%category, "Cache miss, proxying upstream."),
		CacheOutcome::Stored => tracing::debug!(%category, "Cached upstream response."),
		CacheOutcome::Bypassed => tracing::debug!(%category, "Upstream response not cacheable."),
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (category, outcome);
	}
}

pub(crate) fn trace_cache_store(category: EndpointCategory, ttl: Duration) {
	#[cfg(feature = "tracing")]
	tracing::info!(%category, ttl_secs = ttl.whole_seconds(), "Cached upstream response.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (category, ttl);
	}
}

pub(crate) fn trace_upstream(
	category: EndpointCategory,
	outcome: UpstreamOutcome,
	status: Option<StatusCode>,
	error: Option<&Error>,
) {
	#[cfg(feature = "tracing")]
	match (outcome, error) {
		(UpstreamOutcome::Failure, Some(e)) =>
			tracing::error!(%category, error = %e, "Upstream call failed."),
		_ => tracing::debug!(
			%category,
			outcome = outcome.as_str(),
			status = status.map(|code| code.as_u16()),
			"Upstream responded."
		),
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (category, outcome, status, error);
	}
}

pub(crate) fn trace_sweep(removed: usize, remaining: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(removed, remaining, "Swept expired cache entries.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (removed, remaining);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = ProxySpan::new(EndpointCategory::Forecast, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
