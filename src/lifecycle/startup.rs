//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the collaborators of the forwarding path from configuration
//! - Start the metrics exporter
//! - Bind the listener and serve until a shutdown signal arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Collaborators are constructed once here and never re-wired

use axum::http::header::{HeaderName, InvalidHeaderName};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::account::AccountResolver;
use crate::config::{ConfigError, ProxyConfig};
use crate::filter::{FilterChain, ProxyFilter};
use crate::forwarding::{AccountHeaderValueResolver, AsciiJson, ForwardedAccountHeaderFilter};
use crate::http::HttpServer;
use crate::lifecycle::{shutdown_signal, Shutdown};
use crate::observability::metrics;
use crate::security::ForwardedHeadersFilter;

/// Fatal errors while bringing the gateway up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialise logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("invalid forwarded account header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Builds the request filter chain described by `config`.
pub fn build_filter_chain(
    config: &ProxyConfig,
    accounts: Arc<dyn AccountResolver>,
) -> Result<FilterChain, StartupError> {
    let mut filters: Vec<Arc<dyn ProxyFilter>> = Vec::new();

    if config.security.add_forwarded_headers {
        filters.push(Arc::new(ForwardedHeadersFilter));
    }

    let fwd = &config.forwarded_account;
    if fwd.enabled {
        let header_name = HeaderName::from_bytes(fwd.header_name.as_bytes())?;
        for name in fwd.included_properties.iter().filter(|n| fwd.excluded_properties.contains(n)) {
            tracing::warn!(property = %name, "Property is both included and excluded; exclusion wins");
        }
        let values = AccountHeaderValueResolver::new(accounts, fwd.field_policy(), Arc::new(AsciiJson));
        let filter = ForwardedAccountHeaderFilter::new(header_name, Arc::new(values))
            .with_stage(fwd.filter_type)
            .with_order(fwd.filter_order)
            .with_missing_account(fwd.on_missing_account)
            .with_on_error(fwd.on_error);
        filters.push(Arc::new(filter));
    }

    let chain = FilterChain::new(filters);
    tracing::info!(filters = ?chain.names(), "Filter chain built");
    Ok(chain)
}

/// Runs the gateway until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let server = HttpServer::new(config)?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, server_shutdown).await.map_err(StartupError::Serve)
}
