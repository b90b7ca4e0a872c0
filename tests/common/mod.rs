//! Shared utilities for integration testing.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use account_gateway::account::{Account, AccountEntry};
use account_gateway::config::{ProxyConfig, RouteConfig};
use account_gateway::{HttpServer, Shutdown};

/// Start a mock upstream that answers every request with a JSON document
/// describing what it received: `{"path": "...", "headers": {name: [values]}}`.
pub async fn start_echo_backend() -> SocketAddr {
    start_counting_echo_backend().await.0
}

/// Like [`start_echo_backend`], also counting accepted connections.
#[allow(dead_code)]
pub async fn start_counting_echo_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 4096];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let head = String::from_utf8_lossy(&buf).to_string();
                        let mut lines = head.split("\r\n");
                        let path = lines
                            .next()
                            .and_then(|l| l.split(' ').nth(1))
                            .unwrap_or("")
                            .to_string();

                        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
                        for line in lines.take_while(|l| !l.is_empty()) {
                            if let Some((name, value)) = line.split_once(':') {
                                headers
                                    .entry(name.trim().to_lowercase())
                                    .or_default()
                                    .push(value.trim().to_string());
                            }
                        }

                        let body = serde_json::json!({ "path": path, "headers": headers }).to_string();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, connections)
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config with one catch-all route to `upstream` and the sample account
/// reachable with token `t1`.
pub fn gateway_config(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.observability.metrics_enabled = false;
    config.routes.push(RouteConfig {
        name: "default".into(),
        host: None,
        path_prefix: "/".into(),
        url: format!("http://{}", upstream),
        strip_prefix: true,
        priority: 0,
    });
    config.accounts.push(AccountEntry {
        token: "t1".into(),
        account: sample_account(),
    });
    config
}

/// `{id: "acc1", groups: ["admins"], customData: {"k": "v"}, email: "a@b.com"}`
pub fn sample_account() -> Account {
    let mut account = Account::new("acc1");
    account.email = Some("a@b.com".into());
    account.groups = vec!["admins".into()];
    account.custom_data.insert("k".into(), serde_json::json!("v"));
    account
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(mut config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = bind_ephemeral(&mut config).await;
    let server = HttpServer::new(config).unwrap();
    start_server(listener, server)
}

/// Binds an ephemeral port and records it as the listener address.
pub async fn bind_ephemeral(config: &mut ProxyConfig) -> TcpListener {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    config.listener.bind_address = listener.local_addr().unwrap().to_string();
    listener
}

/// Serve `server` on an already bound `listener`.
pub fn start_server(listener: TcpListener, server: HttpServer) -> (SocketAddr, Shutdown) {
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
