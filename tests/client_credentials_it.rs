// std
use std::path::PathBuf;
// crates.io
use httpmock::prelude::*;
// self
use weather_proxy::{
	_preludet::*,
	auth::{
		ClientAuthMethod, ClientCredentialsSource, DEFAULT_SCOPE, ServiceCredentials, TokenSecret,
		TokenSource,
	},
	clock::{Clock, ManualClock},
	error::{ConfigError, CredentialError},
};

const TOKEN_BODY: &str =
	r#"{"access_token":"cc-token","token_type":"bearer","expires_in":3600}"#;

fn credentials(server: &MockServer) -> ServiceCredentials {
	ServiceCredentials {
		client_id: "weather-proxy".into(),
		client_secret: TokenSecret::new("proxy-secret"),
		token_uri: server.url("/token"),
		scopes: vec![DEFAULT_SCOPE.to_owned()],
		client_auth: ClientAuthMethod::RequestBody,
	}
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
	let path = std::env::temp_dir().join(format!("weather-proxy-{}-{name}", std::process::id()));

	std::fs::write(&path, contents).expect("Scratch file should be writable.");

	path
}

#[tokio::test]
async fn token_is_reused_while_fresh() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let source = ClientCredentialsSource::new(credentials(&server))
		.expect("Client credentials source should build.");
	let first = source.fetch_token().await.expect("First fetch should mint a token.");
	let second = source.fetch_token().await.expect("Second fetch should reuse the token.");

	assert_eq!(first.secret.expose(), "cc-token");
	assert_eq!(first, second);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_is_refreshed_inside_the_preemptive_window() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let clock = ManualClock::default();
	let source = ClientCredentialsSource::new(credentials(&server))
		.expect("Client credentials source should build.")
		.with_clock(Arc::new(clock.clone()));
	let first = source.fetch_token().await.expect("First fetch should mint a token.");

	assert_eq!(first.expires_at, clock.now() + Duration::hours(1));

	clock.advance(Duration::seconds(3_539));
	source.fetch_token().await.expect("Token outside the window should be reused.");
	mock.assert_calls_async(1).await;

	clock.advance(Duration::seconds(2));

	let refreshed = source.fetch_token().await.expect("Token inside the window should refresh.");

	assert_eq!(refreshed.expires_at, clock.now() + Duration::hours(1));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn concurrent_fetches_share_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(TOKEN_BODY);
		})
		.await;
	let source = ClientCredentialsSource::new(credentials(&server))
		.expect("Client credentials source should build.");
	let (a, b) = tokio::join!(source.fetch_token(), source.fetch_token());

	assert_eq!(a.expect("First caller should succeed."), b.expect("Second caller should succeed."));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn endpoint_rejection_is_reported_with_status() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client","error_description":"Client authentication failed."}"#);
		})
		.await;
	let source = ClientCredentialsSource::new(credentials(&server))
		.expect("Client credentials source should build.");
	let err = source.fetch_token().await.expect_err("Rejected grant should fail.");

	match err {
		CredentialError::Endpoint { message, status } => {
			assert_eq!(message, "Client authentication failed.");
			assert_eq!(status, Some(400));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn missing_expires_in_is_rejected() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"cc-token","token_type":"bearer"}"#);
		})
		.await;
	let source = ClientCredentialsSource::new(credentials(&server))
		.expect("Client credentials source should build.");
	let err = source.fetch_token().await.expect_err("Tokens without a lifetime are unusable.");

	assert!(matches!(err, CredentialError::MissingExpiresIn));
}

#[test]
fn credentials_file_is_loaded_and_parse_errors_name_the_field() {
	let valid = scratch_file(
		"valid.json",
		r#"{"client_id":"svc","client_secret":"s","token_uri":"https://auth.example.com/token","client_auth":"request_body"}"#,
	);
	let loaded = ServiceCredentials::from_path(&valid).expect("Valid credentials should load.");

	assert_eq!(loaded.client_id, "svc");
	assert_eq!(loaded.client_auth, ClientAuthMethod::RequestBody);

	let malformed = scratch_file("malformed.json", r#"{"client_id":"svc","client_secret":42}"#);
	let err = ServiceCredentials::from_path(&malformed).expect_err("Malformed file should fail.");

	match err {
		ConfigError::CredentialsParse { source, .. } =>
			assert_eq!(source.path().to_string(), "client_secret"),
		other => panic!("Unexpected error: {other:?}."),
	}

	let missing = std::env::temp_dir().join("weather-proxy-does-not-exist.json");

	assert!(matches!(
		ServiceCredentials::from_path(missing),
		Err(ConfigError::CredentialsRead { .. })
	));

	let _ = std::fs::remove_file(valid);
	let _ = std::fs::remove_file(malformed);
}
