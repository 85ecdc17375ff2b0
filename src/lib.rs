//! Caching reverse proxy for a weather API: bearer credential injection, a TTL response cache
//! with a cancellable background sweep, and API-key gated routes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
#[cfg(feature = "server")] pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod proxy;
#[cfg(feature = "server")] pub mod server;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	pub use bytes::Bytes;
	// self
	use crate::{
		auth::{AccessToken, StaticTokenSource, TokenSource},
		cache::TtlCache,
		clock::ManualClock,
		http::ReqwestHttpClient,
		proxy::Forwarder,
		transport::CredentialedTransport,
	};

	/// Token handed out by [`static_token_source`].
	pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

	/// Token source that always returns [`TEST_ACCESS_TOKEN`], valid for an hour.
	pub fn static_token_source() -> Arc<dyn TokenSource> {
		let token = AccessToken::issued_at(
			TEST_ACCESS_TOKEN,
			OffsetDateTime::now_utc(),
			Duration::hours(1),
		);

		Arc::new(StaticTokenSource::new(token))
	}

	/// Builds an inbound request head for the engine.
	pub fn request_parts(method: &str, uri: &str) -> ::http::request::Parts {
		::http::Request::builder()
			.method(method)
			.uri(uri)
			.body(())
			.expect("Failed to build test request.")
			.into_parts()
			.0
	}

	/// Constructs a [`Forwarder`] pointed at `upstream_base`, backed by a manually driven cache
	/// clock and the provided token source.
	pub fn build_test_forwarder(
		upstream_base: &str,
		token_source: Arc<dyn TokenSource>,
	) -> (Forwarder, ManualClock) {
		build_test_forwarder_with_timeout(
			upstream_base,
			token_source,
			std::time::Duration::from_secs(5),
		)
	}

	/// Same as [`build_test_forwarder`], with every upstream call bounded by `timeout`.
	pub fn build_test_forwarder_with_timeout(
		upstream_base: &str,
		token_source: Arc<dyn TokenSource>,
		timeout: std::time::Duration,
	) -> (Forwarder, ManualClock) {
		let clock = ManualClock::default();
		let cache = Arc::new(TtlCache::with_clock(Arc::new(clock.clone())));
		let http_client = ReqwestHttpClient::upstream(timeout)
			.expect("Failed to build upstream client for tests.");
		let transport = CredentialedTransport::new(http_client, token_source);
		let upstream = Url::parse(upstream_base).expect("Failed to parse test upstream URL.");

		(Forwarder::new(cache, transport, upstream), clock)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(feature = "server")] use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
