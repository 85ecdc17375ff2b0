// std
use std::{
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use httpmock::prelude::*;
// self
use weather_proxy::{
	_preludet::*,
	auth::{AccessToken, TokenFuture, TokenSource},
	http::ReqwestHttpClient,
	reqwest::{Method, Request, StatusCode, header::AUTHORIZATION},
	transport::CredentialedTransport,
};

/// Mints `token-1`, `token-2`, ... and counts how often it was asked.
#[derive(Debug, Default)]
struct CountingTokenSource {
	calls: AtomicUsize,
}
impl TokenSource for CountingTokenSource {
	fn fetch_token(&self) -> TokenFuture<'_> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		let token =
			AccessToken::issued_at(format!("token-{n}"), OffsetDateTime::now_utc(), Duration::hours(1));

		Box::pin(async move { Ok(token) })
	}
}

#[tokio::test]
async fn token_is_fetched_for_every_call_and_original_request_untouched() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/currentConditions:lookup")
				.header("authorization", "Bearer token-1");
			then.status(200).body("one");
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/currentConditions:lookup")
				.header("authorization", "Bearer token-2");
			then.status(200).body("two");
		})
		.await;
	let source = Arc::new(CountingTokenSource::default());
	let http_client = ReqwestHttpClient::upstream(StdDuration::from_secs(5))
		.expect("Upstream client should build.");
	let transport = CredentialedTransport::new(http_client, source.clone());
	let url = Url::parse(&server.url("/v1/currentConditions:lookup"))
		.expect("Mock URL should parse.");
	let request = Request::new(Method::GET, url);

	for expected in ["one", "two"] {
		let response =
			transport.execute(&request).await.expect("Credentialed call should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.text().await.expect("Body should be readable."), expected);
		assert!(request.headers().get(AUTHORIZATION).is_none());
	}

	assert_eq!(source.calls.load(Ordering::SeqCst), 2);

	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/missing");
			then.status(404).body("not found");
		})
		.await;
	let transport = CredentialedTransport::new(
		ReqwestHttpClient::upstream(StdDuration::from_secs(5)).expect("Upstream client should build."),
		static_token_source(),
	);
	let url = Url::parse(&server.url("/v1/missing")).expect("Mock URL should parse.");
	let response = transport
		.execute(&Request::new(Method::GET, url))
		.await
		.expect("Upstream 404 is not a transport failure.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
