//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tcp_balancer::{BalancerConfig, LoadBalancer};

/// Start an echo backend: every byte received on a connection is
/// written straight back until the peer hangs up.
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that greets every connection with a fixed tag and
/// closes. Lets a test see which backend a connection was routed to.
#[allow(dead_code)]
pub async fn start_tagged_backend(addr: SocketAddr, tag: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let _ = socket.write_all(tag.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Build a balancer for `backends`, spawn its accept loop, and give it
/// a moment to bind.
pub async fn spawn_balancer(port: u16, backends: &[&str]) -> Arc<LoadBalancer> {
    spawn_balancer_with_config(config_for(port, backends)).await
}

#[allow(dead_code)]
pub fn config_for(port: u16, backends: &[&str]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.port = port;
    config.backends = backends
        .iter()
        .map(|address| tcp_balancer::config::BackendConfig {
            address: address.to_string(),
        })
        .collect();
    config
}

#[allow(dead_code)]
pub async fn spawn_balancer_with_config(config: BalancerConfig) -> Arc<LoadBalancer> {
    let mut lb = LoadBalancer::new(&config).unwrap();
    lb.load(config.backend_addresses()).unwrap();

    let lb = Arc::new(lb);
    let listen_lb = Arc::clone(&lb);
    tokio::spawn(async move { listen_lb.listen().await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    lb
}
