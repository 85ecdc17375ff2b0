//! Header filtering between the caller, the proxy, and the upstream.

// crates.io
use reqwest::header::HeaderMap;

/// Inbound API key header checked by the gate and never forwarded upstream.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Response header reporting whether the body came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

const HOP_BY_HOP: [&str; 9] = [
	"connection",
	"keep-alive",
	"proxy-authenticate",
	"proxy-authorization",
	"proxy-connection",
	"te",
	"trailer",
	"transfer-encoding",
	"upgrade",
];
// Cache hits are served without `content-encoding`, so upstream bodies must arrive uncompressed.
const REQUEST_EXCLUDED: [&str; 5] =
	["authorization", API_KEY_HEADER, "host", "accept-encoding", "content-length"];
const RESPONSE_EXCLUDED: [&str; 1] = ["content-length"];

/// Inbound headers that may travel upstream.
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
	copy_filtered(inbound, &REQUEST_EXCLUDED)
}

/// Upstream response headers passed back to the caller.
pub fn downstream_response_headers(upstream: &HeaderMap) -> HeaderMap {
	copy_filtered(upstream, &RESPONSE_EXCLUDED)
}

fn copy_filtered(source: &HeaderMap, excluded: &[&str]) -> HeaderMap {
	let mut filtered = HeaderMap::with_capacity(source.len());

	for (name, value) in source {
		let name_str = name.as_str();

		if HOP_BY_HOP.contains(&name_str) || excluded.contains(&name_str) {
			continue;
		}

		filtered.append(name.clone(), value.clone());
	}

	filtered
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	#[test]
	fn request_filter_strips_credentials_and_keeps_repeated_values() {
		let mut inbound = HeaderMap::new();

		inbound.insert("x-api-key", HeaderValue::from_static("client-key"));
		inbound.insert("authorization", HeaderValue::from_static("Bearer caller"));
		inbound.insert("host", HeaderValue::from_static("localhost:8080"));
		inbound.insert("connection", HeaderValue::from_static("keep-alive"));
		inbound.append("accept-language", HeaderValue::from_static("en"));
		inbound.append("accept-language", HeaderValue::from_static("de"));

		let outbound = upstream_request_headers(&inbound);

		assert!(outbound.get("x-api-key").is_none());
		assert!(outbound.get("authorization").is_none());
		assert!(outbound.get("host").is_none());
		assert!(outbound.get("connection").is_none());
		assert_eq!(outbound.get_all("accept-language").iter().count(), 2);
	}

	#[test]
	fn response_filter_drops_framing_headers() {
		let mut upstream = HeaderMap::new();

		upstream.insert("content-type", HeaderValue::from_static("application/json"));
		upstream.insert("content-length", HeaderValue::from_static("2"));
		upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));

		let downstream = downstream_response_headers(&upstream);

		assert_eq!(downstream.len(), 1);
		assert_eq!(
			downstream.get("content-type").and_then(|value| value.to_str().ok()),
			Some("application/json")
		);
	}
}
