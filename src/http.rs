//! Reqwest plumbing shared by the upstream transport and the token endpoint exchange.
//!
//! [`ReqwestHttpClient`] owns the pooled [`ReqwestClient`]. Upstream calls go through it
//! directly (see [`CredentialedTransport`](crate::transport::CredentialedTransport)), while
//! token exchanges borrow an [`InstrumentedHandle`] that implements the `oauth2` crate's
//! [`AsyncHttpClient`] and records the HTTP status of the last response in a
//! [`ResponseMetadataSlot`] so failures can be reported with it.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Client-level timeout bounding every upstream call unless configured otherwise.
pub const DEFAULT_UPSTREAM_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Captures metadata from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if any response arrived.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the upstream client; every call is bounded by `timeout`.
	pub fn upstream(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).build()?;

		Ok(Self(client))
	}

	/// Builds a client for token exchanges, which must not follow redirects.
	pub fn token_endpoint(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Returns an `oauth2`-compatible handle that records outcomes in `slot`.
	pub fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle { client: self.0.clone(), slot }
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// [`AsyncHttpClient`] adapter handed to the `oauth2` request builders.
#[derive(Clone, Debug)]
pub struct InstrumentedHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.take();

			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
