//! Refreshing token source backed by the OAuth 2.0 `client_credentials` grant.
//!
//! [`ClientCredentialsSource`] keeps the last issued token in memory and only calls the
//! token endpoint when the token is missing or within the preemptive window of its expiry.
//! Concurrent callers that observe a stale token queue on a single-flight guard, so one
//! refresh serves all of them instead of stampeding the endpoint.

// std
use std::{path::Path, time::Duration as StdDuration};
// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenFuture, TokenSecret, TokenSource},
	clock::{Clock, SystemClock},
	error::{ConfigError, CredentialError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type TokenEndpointClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Scope requested when the credentials file does not list any.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// How the client secret is presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic authentication header.
	#[default]
	Basic,
	/// `client_id` + `client_secret` form fields.
	RequestBody,
}

/// Service credentials loaded from a JSON credentials file.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
	/// Token endpoint URL.
	pub token_uri: String,
	/// Scopes requested with every grant.
	#[serde(default = "default_scopes")]
	pub scopes: Vec<String>,
	/// Client authentication style.
	#[serde(default)]
	pub client_auth: ClientAuthMethod,
}
impl ServiceCredentials {
	/// Reads and parses a credentials file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let bytes = std::fs::read(path)
			.map_err(|source| ConfigError::CredentialsRead { path: path.to_owned(), source })?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::CredentialsParse { path: path.to_owned(), source })
	}
}

fn default_scopes() -> Vec<String> {
	vec![DEFAULT_SCOPE.to_owned()]
}

/// [`TokenSource`] that mints tokens through the `client_credentials` grant.
pub struct ClientCredentialsSource {
	oauth_client: TokenEndpointClient,
	http_client: ReqwestHttpClient,
	scopes: Vec<String>,
	preemptive_window: Duration,
	clock: Arc<dyn Clock>,
	current: RwLock<Option<AccessToken>>,
	refresh_guard: AsyncMutex<()>,
}
impl ClientCredentialsSource {
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);
	const TOKEN_ENDPOINT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

	/// Creates a source with its own redirect-free reqwest client.
	pub fn new(credentials: ServiceCredentials) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::token_endpoint(Self::TOKEN_ENDPOINT_TIMEOUT)?;

		Self::with_http_client(credentials, http_client)
	}

	/// Creates a source that reuses the caller-provided HTTP client.
	pub fn with_http_client(
		credentials: ServiceCredentials,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(credentials.token_uri)
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(credentials.client_id))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_token_uri(token_url);

		if matches!(credentials.client_auth, ClientAuthMethod::RequestBody) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			http_client,
			scopes: credentials.scopes,
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
			clock: Arc::new(SystemClock),
			current: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
		})
	}

	/// Overrides the preemptive refresh window (defaults to 60 seconds).
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Overrides the clock used for issue and freshness decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	fn fresh_token(&self) -> Option<AccessToken> {
		let now = self.clock.now();

		self.current
			.read()
			.as_ref()
			.filter(|token| !token.expires_within(self.preemptive_window, now))
			.cloned()
	}

	async fn exchange(&self) -> Result<AccessToken, CredentialError> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(self.clock.now(), response)
	}
}
impl TokenSource for ClientCredentialsSource {
	fn fetch_token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			if let Some(token) = self.fresh_token() {
				return Ok(token);
			}

			let _singleflight = self.refresh_guard.lock().await;

			if let Some(token) = self.fresh_token() {
				return Ok(token);
			}

			let token = self.exchange().await?;

			*self.current.write() = Some(token.clone());

			Ok(token)
		})
	}
}
impl Debug for ClientCredentialsSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsSource")
			.field("scopes", &self.scopes)
			.field("preemptive_window", &self.preemptive_window)
			.field("token_cached", &self.current.read().is_some())
			.finish()
	}
}

fn map_token_response(
	issued_at: OffsetDateTime,
	response: BasicTokenResponse,
) -> Result<AccessToken, CredentialError> {
	let expires_in = response.expires_in().ok_or(CredentialError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| CredentialError::InvalidExpiresIn)?;

	if expires_in <= 0 {
		return Err(CredentialError::InvalidExpiresIn);
	}

	Ok(AccessToken::issued_at(
		response.access_token().secret().to_owned(),
		issued_at,
		Duration::seconds(expires_in),
	))
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> CredentialError {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => description.to_owned(),
				None => response.error().as_ref().to_owned(),
			};

			CredentialError::Endpoint { message, status }
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			CredentialError::transport(*inner),
		RequestTokenError::Request(other) => CredentialError::transport(other),
		RequestTokenError::Parse(source, _body) => CredentialError::ResponseParse { source, status },
		RequestTokenError::Other(message) => CredentialError::Endpoint { message, status },
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credentials_default_scope_and_auth() {
		let json = r#"{"client_id":"svc","client_secret":"s3cr3t","token_uri":"https://auth.example.com/token"}"#;
		let credentials: ServiceCredentials =
			serde_json::from_str(json).expect("Minimal credentials should parse.");

		assert_eq!(credentials.scopes, vec![DEFAULT_SCOPE.to_owned()]);
		assert_eq!(credentials.client_auth, ClientAuthMethod::Basic);
		assert!(!format!("{credentials:?}").contains("s3cr3t"));
	}

	#[test]
	fn invalid_token_uri_is_a_config_error() {
		let credentials = ServiceCredentials {
			client_id: "svc".into(),
			client_secret: TokenSecret::new("secret"),
			token_uri: "not a url".into(),
			scopes: default_scopes(),
			client_auth: ClientAuthMethod::RequestBody,
		};
		let err = ClientCredentialsSource::with_http_client(credentials, Default::default())
			.expect_err("Unparseable token endpoint should be rejected.");

		assert!(matches!(err, ConfigError::InvalidTokenEndpoint { .. }));
	}
}
