//! Proxy-level error types shared across the cache, transport, token sources, and server.

// std
use std::path::PathBuf;
// crates.io
use reqwest::StatusCode;
// self
use crate::_prelude::*;

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical proxy error exposed by public APIs.
///
/// Upstream responses with a non-200 status are not errors; they are forwarded verbatim as a
/// [`ProxyResponse`](crate::proxy::ProxyResponse).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Bearer credential could not be obtained for the outbound call.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Transport failure (DNS, TCP, TLS, timeout) while calling the upstream.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Only GET is proxied.
	#[error("Method {method} is not allowed; only GET is proxied.")]
	MethodNotAllowed {
		/// Method received from the caller.
		method: String,
	},
	/// Upstream URL could not be assembled from the base, path, and query.
	#[error("Upstream URL `{url}` is invalid.")]
	UpstreamRequest {
		/// Assembled URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP server stopped with an IO failure.
	#[error("HTTP server terminated unexpectedly.")]
	Serve {
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Upstream answered but its body could not be read.
	#[error("Upstream response body could not be read.")]
	UpstreamBodyUnreadable {
		/// Transport failure raised while streaming the body.
		#[source]
		source: ReqwestError,
	},
}
impl Error {
	/// HTTP status reported to the caller for this failure.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
			Self::Transport(_) | Self::Credential(_) => StatusCode::BAD_GATEWAY,
			Self::Config(_)
			| Self::Serve { .. }
			| Self::UpstreamRequest { .. }
			| Self::UpstreamBodyUnreadable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Caller-facing message that never includes upstream or credential internals.
	pub fn public_message(&self) -> &'static str {
		match self {
			Self::MethodNotAllowed { .. } => "Method not allowed",
			Self::Transport(_) | Self::Credential(_) => "Failed to proxy request",
			Self::UpstreamRequest { .. } => "Failed to create request",
			Self::UpstreamBodyUnreadable { .. } => "Failed to read response",
			Self::Config(_) | Self::Serve { .. } => "Server misconfigured",
		}
	}
}

/// Configuration and validation failures raised while assembling the proxy.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Upstream base URL cannot be parsed.
	#[error("Upstream base URL is invalid.")]
	InvalidUpstreamBase {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Route prefix must start with `/` and must not end with one.
	#[error("Route prefix `{prefix}` must start with `/` and must not end with `/`.")]
	InvalidRoutePrefix {
		/// Rejected prefix.
		prefix: String,
	},
	/// No credentials file was configured.
	#[error("No credentials file configured; set WEATHER_PROXY_CREDENTIALS.")]
	MissingCredentials,
	/// Credentials file could not be read.
	#[error("Credentials file {} could not be read.", path.display())]
	CredentialsRead {
		/// Path that failed.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Credentials file contains malformed JSON.
	#[error("Credentials file {} is malformed.", path.display())]
	CredentialsParse {
		/// Path that failed.
		path: PathBuf,
		/// Structured parsing failure naming the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint in the credentials is not a valid URL.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Listener could not be bound.
	#[error("Failed to bind {addr}.")]
	Bind {
		/// Address that failed.
		addr: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while obtaining a bearer credential.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Token endpoint rejected the request or answered unexpectedly.
	#[error("Token endpoint returned an error: {message}.")]
	Endpoint {
		/// Provider-supplied or locally derived message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint could not be reached.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive or out-of-range `expires_in`.
	#[error("The expires_in value must be a positive number of seconds.")]
	InvalidExpiresIn,
	/// Access token contains bytes that cannot travel in an HTTP header.
	#[error("Access token cannot be encoded as an Authorization header.")]
	MalformedToken,
	/// Credential source has nothing to hand out.
	#[error("Credential source is unavailable: {reason}.")]
	Unavailable {
		/// Source-supplied reason string.
		reason: String,
	},
}
impl CredentialError {
	/// Wraps a token endpoint network failure.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO) while calling the upstream.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Upstream did not answer within the client timeout.
	#[error("Upstream request timed out.")]
	Timeout {
		/// Underlying reqwest failure.
		#[source]
		source: ReqwestError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Outbound request could not be duplicated before credential injection.
	#[error("Outbound request body cannot be cloned.")]
	UnclonableRequest,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: e } } else { Self::network(e) }
	}
}
