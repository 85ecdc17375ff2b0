//! Outbound execution with bearer credential injection.

// crates.io
use reqwest::{
	Request, Response,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSource,
	error::{CredentialError, TransportError},
	http::ReqwestHttpClient,
};

/// Executes upstream requests with a freshly fetched bearer token.
///
/// A token is requested from the source on every call; the transport never keeps one.
/// The caller's request is cloned before the `Authorization` header is set, so the original
/// stays untouched for logging or another attempt.
#[derive(Clone)]
pub struct CredentialedTransport {
	http_client: ReqwestHttpClient,
	token_source: Arc<dyn TokenSource>,
}
impl CredentialedTransport {
	/// Pairs an HTTP client with the token source consulted before each call.
	pub fn new(http_client: ReqwestHttpClient, token_source: Arc<dyn TokenSource>) -> Self {
		Self { http_client, token_source }
	}

	/// Sends a credentialed copy of `request`.
	///
	/// Token failures abort the call before anything reaches the network.
	pub async fn execute(&self, request: &Request) -> Result<Response> {
		let token = self.token_source.fetch_token().await?;
		let mut authorization =
			HeaderValue::from_str(&token.bearer()).map_err(|_| CredentialError::MalformedToken)?;

		authorization.set_sensitive(true);

		let mut outbound = request.try_clone().ok_or(TransportError::UnclonableRequest)?;

		outbound.headers_mut().insert(AUTHORIZATION, authorization);

		let response = self.http_client.execute(outbound).await.map_err(TransportError::from)?;

		Ok(response)
	}
}
impl Debug for CredentialedTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialedTransport").field("http_client", &self.http_client).finish()
	}
}
