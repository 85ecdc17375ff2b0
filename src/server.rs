//! HTTP surface: health check, API-key gate, proxied routes, and graceful shutdown.

// crates.io
use axum::{
	Json, Router,
	body::Body,
	extract::{Request, State},
	http::StatusCode,
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{any, get},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentialsSource, ServiceCredentials, TokenSource},
	cache::TtlCache,
	config::ProxyConfig,
	error::ConfigError,
	http::ReqwestHttpClient,
	proxy::{API_KEY_HEADER, Forwarder, ProxyResponse, validate_route_prefix},
	transport::CredentialedTransport,
};

const UNAVAILABLE_MESSAGE: &str = "Proxy service not available - credentials not configured";

/// JSON body attached to every locally generated error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Caller-facing message.
	pub error: String,
}
impl ErrorBody {
	fn response(status: StatusCode, message: &str) -> Response {
		(status, Json(Self { error: message.to_owned() })).into_response()
	}
}

#[derive(Serialize)]
struct HealthBody {
	status: &'static str,
}

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
	forwarder: Option<Arc<Forwarder>>,
	api_key: Option<Arc<str>>,
}
impl AppState {
	/// Bundles the forwarder (absent when credentials failed to load) with the expected API key.
	pub fn new(forwarder: Option<Arc<Forwarder>>, api_key: Option<&str>) -> Self {
		Self { forwarder, api_key: api_key.filter(|key| !key.is_empty()).map(Arc::from) }
	}
}

impl IntoResponse for ProxyResponse {
	fn into_response(self) -> Response {
		let mut response = Response::new(Body::from(self.body));

		*response.status_mut() = self.status;
		*response.headers_mut() = self.headers;

		response
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		ErrorBody::response(self.status_code(), self.public_message())
	}
}

/// Builds the router.
///
/// With a forwarder, `<prefix>/*` is gated by the API key. Without one, `<prefix>/*` answers
/// 503 to everyone while `/health` keeps working.
pub fn router(state: AppState, route_prefix: &str) -> Router {
	let proxy_path = format!("{route_prefix}/{{*path}}");
	let proxy_routes = if state.forwarder.is_some() {
		Router::new()
			.route(&proxy_path, any(proxy))
			.route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
	} else {
		Router::new().route(&proxy_path, any(unavailable))
	};

	Router::new().route("/health", get(health)).merge(proxy_routes).with_state(state)
}

async fn health() -> Json<HealthBody> {
	Json(HealthBody { status: "ok" })
}

async fn unavailable() -> Response {
	ErrorBody::response(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_MESSAGE)
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
	let Some(expected) = state.api_key.as_deref() else {
		tracing::error!("PROXY_API_KEY is not set; rejecting request.");

		return ErrorBody::response(StatusCode::INTERNAL_SERVER_ERROR, "Server misconfigured");
	};

	let rejection = match request.headers().get(API_KEY_HEADER) {
		Some(provided) if provided.as_bytes() == expected.as_bytes() => None,
		Some(provided) if !provided.is_empty() => Some("Invalid API key"),
		_ => Some("Missing X-API-Key header"),
	};

	match rejection {
		None => next.run(request).await,
		Some(message) => {
			tracing::warn!(path = %request.uri().path(), reason = message, "Rejected request.");

			ErrorBody::response(StatusCode::UNAUTHORIZED, message)
		},
	}
}

async fn proxy(State(state): State<AppState>, request: Request) -> Response {
	let Some(forwarder) = state.forwarder else {
		return unavailable().await;
	};
	let (parts, _body) = request.into_parts();

	match forwarder.handle(&parts).await {
		Ok(response) => response.into_response(),
		Err(e) => e.into_response(),
	}
}

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG` (defaults to `info`).
pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Assembles the forwarder from the configured credentials file and upstream settings.
pub fn build_forwarder(config: &ProxyConfig, cache: Arc<TtlCache>) -> Result<Forwarder> {
	let path = config.credentials_file.as_ref().ok_or(ConfigError::MissingCredentials)?;
	let credentials = ServiceCredentials::from_path(path)?;
	let token_source: Arc<dyn TokenSource> = Arc::new(ClientCredentialsSource::new(credentials)?);
	let http_client = ReqwestHttpClient::upstream(config.upstream_timeout())?;
	let transport = CredentialedTransport::new(http_client, token_source);
	let forwarder = Forwarder::new(cache, transport, config.upstream_url()?)
		.with_route_prefix(config.route_prefix.clone())?;

	Ok(forwarder)
}

/// Runs the server until Ctrl-C, then stops the cache sweeper.
///
/// A forwarder that cannot be built is logged and replaced by the 503 fallback so `/health`
/// stays reachable.
pub async fn run(config: ProxyConfig) -> Result<()> {
	validate_route_prefix(&config.route_prefix)?;

	let cache = Arc::new(TtlCache::new());
	let shutdown = CancellationToken::new();
	let sweeper = cache.spawn_sweeper(config.sweep_interval(), shutdown.clone());

	tracing::info!(sweep_interval = ?config.sweep_interval(), "Cache initialized.");

	let forwarder = match build_forwarder(&config, Arc::clone(&cache)) {
		Ok(forwarder) => {
			tracing::info!(upstream = %config.upstream_base, "Proxy handler initialized.");

			Some(Arc::new(forwarder))
		},
		Err(e) => {
			tracing::warn!(error = %e, "Proxy handler unavailable; proxy routes will answer 503.");

			None
		},
	};

	if config.api_key().is_none() {
		tracing::warn!("PROXY_API_KEY is not set; proxied routes will answer 500.");
	}

	let app = router(AppState::new(forwarder, config.api_key()), &config.route_prefix);
	let addr = config.listen_addr();
	let listener = TcpListener::bind(addr)
		.await
		.map_err(|source| ConfigError::Bind { addr: addr.to_string(), source })?;

	tracing::info!(%addr, "Starting server.");

	let signal = shutdown.clone();
	let served = axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "Failed to listen for Ctrl-C.");
			}

			signal.cancel();
		})
		.await;

	shutdown.cancel();

	if let Err(e) = sweeper.await {
		tracing::warn!(error = %e, "Cache sweeper ended abnormally.");
	}

	tracing::info!("Server stopped.");

	served.map_err(|source| Error::Serve { source })
}
