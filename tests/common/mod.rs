//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use wrr_proxy::admin::{setup_admin_router, AdminState};
use wrr_proxy::config::parse_config;
use wrr_proxy::{HttpServer, ServiceManager, Shutdown};

pub const ADMIN_KEY: &str = "test-key";

/// Start a mock backend that answers every request with its own name,
/// after `delay`.
pub async fn start_mock_backend(name: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut request = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => request.extend_from_slice(&buf[..n]),
                            }
                        }
                        tokio::time::sleep(delay).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            name.len(),
                            name
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A running proxy with its admin API.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub manager: Arc<ServiceManager>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.admin_addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build the service tree from `config` and serve it on ephemeral ports.
pub async fn start_proxy(config: &str) -> TestProxy {
    let config = parse_config(config).unwrap();
    let manager = Arc::new(ServiceManager::new(&config).unwrap());
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config.listener, manager.entry());
    tokio::spawn(server.run(listener, shutdown.signalled()));

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();
    let router = setup_admin_router(AdminState::new(manager.clone(), ADMIN_KEY));
    let stop = shutdown.signalled();
    tokio::spawn(async move {
        let _ = axum::serve(admin_listener, router).with_graceful_shutdown(stop).await;
    });

    TestProxy { addr, admin_addr, manager, shutdown }
}

/// Client without connection reuse, so every request is a fresh pick.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
