//! Forwarding engine: cache lookup, credentialed upstream call, conditional caching.
//!
//! [`Forwarder::handle`] walks one request through
//! `method check -> key -> cache lookup -> (hit | upstream call -> store on 200)` and
//! answers exactly once. Nothing is retried, concurrent misses on the same key are not
//! coalesced, and failed or non-200 fetches never reach the cache.

pub mod endpoint;
pub mod headers;

pub use endpoint::*;
pub use headers::*;

// crates.io
use bytes::Bytes;
use http::request::Parts;
use reqwest::{
	Method, Request, StatusCode,
	header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	cache::TtlCache,
	error::ConfigError,
	obs::{self, CacheOutcome, ProxySpan, UpstreamOutcome},
	transport::CredentialedTransport,
};

/// Routing prefix stripped from inbound paths unless configured otherwise.
pub const DEFAULT_ROUTE_PREFIX: &str = "/api/weather";
/// Upstream base URL used unless configured otherwise.
pub const DEFAULT_UPSTREAM_BASE: &str = "https://weather.googleapis.com/v1";

/// Whether a response body was served from the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
	/// Served from the cache without contacting the upstream.
	Hit,
	/// Fetched from the upstream.
	Miss,
}
impl CacheStatus {
	/// Header value reported in `X-Cache`.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Hit => "HIT",
			Self::Miss => "MISS",
		}
	}
}
impl Display for CacheStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Response produced by the engine, ready to be written to the caller.
#[derive(Clone, Debug)]
pub struct ProxyResponse {
	/// Status code to send.
	pub status: StatusCode,
	/// Headers to send, including `X-Cache`.
	pub headers: HeaderMap,
	/// Body bytes.
	pub body: Bytes,
	/// Cache outcome for this request.
	pub cache_status: CacheStatus,
}
impl ProxyResponse {
	fn hit(body: Bytes) -> Self {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Self::with_cache_status(StatusCode::OK, headers, body, CacheStatus::Hit)
	}

	fn miss(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
		Self::with_cache_status(status, headers, body, CacheStatus::Miss)
	}

	fn with_cache_status(
		status: StatusCode,
		mut headers: HeaderMap,
		body: Bytes,
		cache_status: CacheStatus,
	) -> Self {
		headers.insert(
			HeaderName::from_static(CACHE_STATUS_HEADER),
			HeaderValue::from_static(cache_status.as_str()),
		);

		Self { status, headers, body, cache_status }
	}
}

/// Caching forwarder in front of a single upstream base URL.
#[derive(Clone, Debug)]
pub struct Forwarder {
	cache: Arc<TtlCache>,
	transport: CredentialedTransport,
	upstream_base: String,
	route_prefix: String,
	ttl_policy: TtlPolicy,
}
impl Forwarder {
	/// Creates a forwarder with the default route prefix and TTL policy.
	pub fn new(cache: Arc<TtlCache>, transport: CredentialedTransport, upstream_base: Url) -> Self {
		let upstream_base = upstream_base.as_str().trim_end_matches('/').to_owned();

		Self {
			cache,
			transport,
			upstream_base,
			route_prefix: DEFAULT_ROUTE_PREFIX.into(),
			ttl_policy: TtlPolicy::default(),
		}
	}

	/// Replaces the routing prefix stripped from inbound paths.
	pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Result<Self, ConfigError> {
		let prefix = prefix.into();

		validate_route_prefix(&prefix)?;

		self.route_prefix = prefix;

		Ok(self)
	}

	/// Replaces the per-category TTL policy.
	pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
		self.ttl_policy = policy;

		self
	}

	/// Cache shared with this forwarder.
	pub fn cache(&self) -> &Arc<TtlCache> {
		&self.cache
	}

	/// Routing prefix stripped from inbound paths.
	pub fn route_prefix(&self) -> &str {
		&self.route_prefix
	}

	/// Serves one inbound request.
	pub async fn handle(&self, parts: &Parts) -> Result<ProxyResponse> {
		if parts.method != Method::GET {
			return Err(Error::MethodNotAllowed { method: parts.method.to_string() });
		}

		let path = parts.uri.path();
		let upstream_path = path.strip_prefix(self.route_prefix.as_str()).unwrap_or(path);
		let raw_query = parts.uri.query().unwrap_or_default();
		let category = EndpointCategory::classify(upstream_path);
		let key = cache_key(upstream_path, raw_query);
		let span = ProxySpan::new(category, "handle");

		span.instrument(async move {
			if let Some(payload) = self.cache.get(&key) {
				obs::record_cache_outcome(category, CacheOutcome::Hit);

				return Ok(ProxyResponse::hit(payload));
			}

			obs::record_cache_outcome(category, CacheOutcome::Miss);

			let request = self.upstream_request(upstream_path, raw_query, &parts.headers)?;
			let response = self
				.transport
				.execute(&request)
				.await
				.inspect_err(|e| obs::record_upstream_failure(category, e))?;
			let status = response.status();
			let headers = downstream_response_headers(response.headers());
			let body = response
				.bytes()
				.await
				.map_err(|source| Error::UpstreamBodyUnreadable { source })
				.inspect_err(|e| obs::record_upstream_failure(category, e))?;

			if status == StatusCode::OK {
				let ttl = self.ttl_policy.ttl_for(category);

				self.cache.set(key, body.clone(), ttl);
				obs::record_cache_store(category, ttl);
				obs::record_upstream_outcome(category, UpstreamOutcome::Success, status);
			} else {
				obs::record_cache_outcome(category, CacheOutcome::Bypassed);
				obs::record_upstream_outcome(category, UpstreamOutcome::NonSuccess, status);
			}

			Ok(ProxyResponse::miss(status, headers, body))
		})
		.await
	}

	fn upstream_request(
		&self,
		upstream_path: &str,
		raw_query: &str,
		inbound: &HeaderMap,
	) -> Result<Request> {
		let mut target = format!("{}{upstream_path}", self.upstream_base);

		if !raw_query.is_empty() {
			target.push('?');
			target.push_str(raw_query);
		}

		let url =
			Url::parse(&target).map_err(|source| Error::UpstreamRequest { url: target, source })?;
		let mut request = Request::new(Method::GET, url);

		*request.headers_mut() = upstream_request_headers(inbound);

		Ok(request)
	}
}

/// Checks that `prefix` starts with `/` and does not end with one.
pub fn validate_route_prefix(prefix: &str) -> Result<(), ConfigError> {
	if prefix.starts_with('/') && !prefix.ends_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidRoutePrefix { prefix: prefix.to_owned() })
	}
}
