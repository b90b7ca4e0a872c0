//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, account attachment)
//! - Run the filter chain for every matched request
//! - Forward requests to upstreams and stream responses back

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::account::{attach_account, AccountResolver, AccountStore, RequestAccountResolver, StaticAccountStore};
use crate::config::ProxyConfig;
use crate::filter::{FilterChain, FilterStage, RequestContext};
use crate::forwarding::FieldPolicy;
use crate::http::me::current_account;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response;
use crate::lifecycle::shutdown;
use crate::lifecycle::startup::{build_filter_chain, StartupError};
use crate::observability::metrics;
use crate::routing::Router as ProxyRouter;

type UpstreamClient = Client<HttpConnector, Body>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub chain: Arc<FilterChain>,
    pub accounts: Arc<dyn AccountResolver>,
    pub me_policy: Arc<FieldPolicy>,
    pub client: UpstreamClient,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let chain = build_filter_chain(&config, Arc::new(RequestAccountResolver))?;
        Ok(Self::with_filter_chain(config, chain))
    }

    /// Create a server that runs `chain` instead of the one described by
    /// `config.forwarded_account` and `config.security`.
    pub fn with_filter_chain(config: ProxyConfig, chain: FilterChain) -> Self {
        let accounts: Arc<dyn AccountResolver> = Arc::new(RequestAccountResolver);
        let store: Arc<dyn AccountStore> = Arc::new(StaticAccountStore::new(config.accounts.clone()));

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            router: Arc::new(ProxyRouter::from_config(&config.routes)),
            chain: Arc::new(chain),
            accounts,
            me_policy: Arc::new(config.me.field_policy()),
            client,
        };

        let router = Self::build_router(&config, state, store);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, store: Arc<dyn AccountStore>) -> Router {
        let mut router = Router::new();
        if config.me.enabled {
            router = router.route(&config.me.path, get(current_account));
        }

        router
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(store, attach_account))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Looks up route, runs the filter chain and forwards the request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %parts.uri.path(),
        "Proxying request"
    );

    // 1. Match Route
    let route = match state.router.match_request(&parts) {
        Some(r) => r,
        None => {
            tracing::warn!(request_id = %request_id, path = %parts.uri.path(), "No route matched");
            metrics::record_request(&method, 404, "none", start_time);
            return (StatusCode::NOT_FOUND, "No matching route found").into_response();
        }
    };

    // 2. Filter chain
    let mut ctx = RequestContext::new(parts, Some(addr)).with_route(route.clone());
    for stage in [FilterStage::Pre, FilterStage::Route] {
        if let Err(e) = state.chain.run(stage, &mut ctx) {
            tracing::error!(request_id = %request_id, route = %route.name, error = %e, "Request rejected by filter chain");
            metrics::record_request(&method, 502, &route.name, start_time);
            return (StatusCode::BAD_GATEWAY, "Request could not be prepared for forwarding").into_response();
        }
        if let Some(status) = ctx.short_circuit_status() {
            tracing::debug!(request_id = %request_id, %status, "Request short-circuited by filter chain");
            metrics::record_request(&method, status.as_u16(), &route.name, start_time);
            return status.into_response();
        }
    }

    // 3. Build upstream request
    let (parts, mut headers) = ctx.into_parts();
    let uri = match route.upstream_uri(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.name, error = %e, "Invalid upstream URI");
            metrics::record_request(&method, 502, &route.name, start_time);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };

    headers.remove(header::HOST);
    if !headers.contains_key(X_REQUEST_ID) {
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(X_REQUEST_ID, value);
        }
    }

    let mut upstream = Request::new(body);
    *upstream.method_mut() = parts.method;
    *upstream.uri_mut() = uri;
    *upstream.headers_mut() = headers;

    // 4. Forward
    match forward(&state.client, upstream).await {
        Ok(res) => {
            metrics::record_request(&method, res.status().as_u16(), &route.name, start_time);
            response::from_upstream(res)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.name, error = %e, "Upstream error");
            metrics::record_request(&method, 502, &route.name, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

async fn forward(
    client: &UpstreamClient,
    request: Request<Body>,
) -> Result<Response<Incoming>, hyper_util::client::legacy::Error> {
    client.request(request).await
}
